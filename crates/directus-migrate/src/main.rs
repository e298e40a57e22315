//! Directus Migration CLI
//!
//! CLI tool for copying collection items from Directus v8 to Directus v9.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use directus_migrate::{CollectionOutcome, MigrationConfig, MigrationReport, Pipeline};

#[derive(Parser)]
#[command(name = "directus-migrate")]
#[command(version)]
#[command(about = "Migrate collection items from Directus v8 to Directus v9", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Don't draw progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Settings that take precedence over the config file.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Dry run mode (read and transform, don't write to destination)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Comma-separated insertion order, replacing the dependency heuristic
    #[arg(
        long,
        env = "COLLECTION_ORDER",
        value_delimiter = ',',
        global = true,
        value_name = "NAMES"
    )]
    collection_order: Option<Vec<String>>,

    /// Access token for the source instance
    #[arg(long, env = "SOURCE_TOKEN", hide_env_values = true, global = true)]
    source_token: Option<String>,

    /// Access token for the destination instance
    #[arg(long, env = "DESTINATION_TOKEN", hide_env_values = true, global = true)]
    destination_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migration from config file
    Run,

    /// Validate configuration and inputs
    Validate,

    /// Print the insertion order and the references that will be remapped
    Plan,

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = "migration.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging (RUST_LOG wins over --verbose)
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let show_progress = !cli.no_progress && std::io::stderr().is_terminal();

    match cli.command {
        Some(Commands::Init { output }) => generate_config(&output),
        Some(Commands::Validate) => validate_config(&require_config(&cli.config)?, &cli.overrides),
        Some(Commands::Plan) => show_plan(&require_config(&cli.config)?, &cli.overrides),
        Some(Commands::Run) | None => {
            let config = require_config(&cli.config)?;
            run_migration(&config, &cli.overrides, show_progress).await
        }
    }
}

fn require_config(config: &Option<PathBuf>) -> anyhow::Result<PathBuf> {
    config.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "no configuration given. Usage: directus-migrate --config <FILE> [run|validate|plan]"
        )
    })
}

fn load_config(config_path: &Path, overrides: &Overrides) -> anyhow::Result<MigrationConfig> {
    info!("Loading configuration from {:?}", config_path);

    let mut config = MigrationConfig::from_file(config_path)?;
    apply_overrides(&mut config, overrides);
    config.validate()?;

    Ok(config)
}

fn apply_overrides(config: &mut MigrationConfig, overrides: &Overrides) {
    if overrides.dry_run {
        config.options.dry_run = true;
    }
    if let Some(order) = &overrides.collection_order {
        let order: Vec<String> = order
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        // An empty list means "no order", not "order nothing"
        config.options.collection_order = (!order.is_empty()).then_some(order);
    }
    if let Some(token) = &overrides.source_token {
        config.source.token = Some(token.clone());
    }
    if let Some(token) = &overrides.destination_token {
        config.destination.token = Some(token.clone());
    }
}

async fn run_migration(
    config_path: &Path,
    overrides: &Overrides,
    show_progress: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path, overrides)?;
    let dry_run = config.options.dry_run;

    info!("Starting migration...");

    let mut pipeline = Pipeline::new(config)?.with_progress(show_progress);
    let report = pipeline.run().await?;

    print_report(&report, dry_run);

    let failed = report.failed().count();
    if failed > 0 {
        anyhow::bail!(
            "{} of {} collections failed; re-run after fixing the cause",
            failed,
            report.collections.len()
        );
    }

    Ok(())
}

fn print_report(report: &MigrationReport, dry_run: bool) {
    println!();
    if dry_run {
        println!("Dry run complete (nothing was written)");
    } else if report.is_success() {
        println!("Migration complete");
    } else {
        println!("Migration finished with errors");
    }

    for c in &report.collections {
        let status = match &c.outcome {
            CollectionOutcome::Completed => "ok".to_string(),
            CollectionOutcome::Failed(_) => format!("FAILED at page {}", c.pages_done),
        };
        println!(
            "   {:<32} {:>6} read {:>6} written {:>5} dropped  {}",
            c.collection, c.read, c.written, c.dropped, status
        );
    }

    println!("   Read:       {}", report.read());
    println!("   Written:    {}", report.written());
    println!("   Dropped:    {}", report.dropped());
    println!("   Duration:   {:.2}s", report.duration_secs);
    println!("   Throughput: {:.0} items/sec", report.throughput());

    for c in report.failed() {
        if let CollectionOutcome::Failed(e) = &c.outcome {
            eprintln!("\n{}: {}", c.collection, e);
        }
    }
}

fn validate_config(config_path: &Path, overrides: &Overrides) -> anyhow::Result<()> {
    let config = load_config(config_path, overrides)?;
    let inputs = directus_migrate::MigrationInputs::from_file(&config.inputs)?;

    println!("Configuration is valid");
    println!("   Source:      {}", config.source.url);
    println!("   Destination: {}", config.destination.url);
    println!("   Collections: {}", inputs.collections.len());
    println!("   Relations:   {}", inputs.relations.len());
    println!("   Users:       {} mapped", inputs.users.len());
    println!("   Files:       {} mapped", inputs.files.len());

    if let Some(order) = &config.options.collection_order {
        let unknown: Vec<_> = order
            .iter()
            .filter(|name| !inputs.collections.iter().any(|c| &c.collection == *name))
            .collect();
        if !unknown.is_empty() {
            println!("   Warning: collection_order names unknown collections: {:?}", unknown);
        }
    }

    Ok(())
}

fn show_plan(config_path: &Path, overrides: &Overrides) -> anyhow::Result<()> {
    let mut config = load_config(config_path, overrides)?;
    // Planning never writes
    config.options.dry_run = true;

    let mode = if config
        .options
        .collection_order
        .as_ref()
        .is_some_and(|order| !order.is_empty())
    {
        "explicit"
    } else {
        "heuristic"
    };
    let pipeline = Pipeline::new(config)?;
    println!(
        "Insertion order ({}, {} collections):",
        mode,
        pipeline.inputs().collections.len()
    );

    for (i, c) in pipeline.plan().iter().enumerate() {
        let mut tags = Vec::new();
        if c.single {
            tags.push("singleton");
        }
        if c.is_junction() {
            tags.push("junction");
        }
        if c.has_many_to_one() {
            tags.push("many-to-one");
        }
        println!("  {:>3}. {} {}", i + 1, c.collection, tags.join(", "));

        for relation in pipeline.remapper().system_relations_for(&c.collection) {
            println!(
                "         {} -> {}",
                relation.many_field, relation.one_collection
            );
        }
    }

    Ok(())
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{:?} already exists", output);
    }

    std::fs::write(output, CONFIG_TEMPLATE)?;
    println!("Generated configuration: {:?}", output);
    println!(
        "   Edit the file and run: directus-migrate run --config {:?}",
        output
    );

    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# Directus v8 -> v9 data migration
source:
  url: https://old.example.com/_   # v8 base URL including the project
  # token: set SOURCE_TOKEN instead of storing it here

destination:
  url: https://new.example.com
  # token: set DESTINATION_TOKEN instead of storing it here

# Collections, relations and user/file ID maps (JSON)
inputs: ./inputs.json

options:
  # Leave unset to order collections automatically
  # collection_order: [authors, posts, posts_tags]
  count_concurrency: 1
  request_timeout_secs: 30
  dry_run: false
  retry:
    max_retries: 1
    initial_delay_ms: 500
    max_delay_ms: 500
    backoff_multiplier: 1.0
    add_jitter: false
  # Defaults to the project allow-list when omitted
  # filters:
  #   - prefix: projects_
  #     field: projects_id
  #     allowed: [110, 111]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_with_order() {
        let cli = Cli::try_parse_from([
            "directus-migrate",
            "run",
            "--config",
            "migration.yaml",
            "--collection-order",
            "authors,posts",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Run)));
        assert_eq!(cli.config, Some(PathBuf::from("migration.yaml")));
        assert_eq!(
            cli.overrides.collection_order,
            Some(vec!["authors".to_string(), "posts".to_string()])
        );
    }

    #[test]
    fn test_template_is_valid_config() {
        let config: MigrationConfig = serde_yaml::from_str(CONFIG_TEMPLATE).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.options.collection_order.is_none());
    }

    #[test]
    fn test_overrides_applied() {
        let mut config: MigrationConfig = serde_yaml::from_str(CONFIG_TEMPLATE).unwrap();
        let overrides = Overrides {
            dry_run: true,
            collection_order: Some(vec![" posts ".to_string(), "".to_string()]),
            source_token: Some("old".to_string()),
            destination_token: None,
        };

        apply_overrides(&mut config, &overrides);

        assert!(config.options.dry_run);
        assert_eq!(config.options.collection_order, Some(vec!["posts".to_string()]));
        assert_eq!(config.source.token.as_deref(), Some("old"));
        assert!(config.destination.token.is_none());
    }

    #[test]
    fn test_blank_collection_order_keeps_heuristic() {
        let mut config: MigrationConfig = serde_yaml::from_str(CONFIG_TEMPLATE).unwrap();
        config.options.collection_order = Some(vec!["posts".to_string()]);
        let overrides = Overrides {
            collection_order: Some(vec![" ".to_string(), "".to_string()]),
            ..Overrides::default()
        };

        apply_overrides(&mut config, &overrides);

        assert!(config.options.collection_order.is_none());
    }
}
