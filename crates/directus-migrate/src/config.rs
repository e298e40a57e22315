//! Configuration types for directus-migrate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::connectors::common::{validate_url, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::transform::filters::AllowListFilterConfig;

/// Main migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Instance the items are read from (v8).
    pub source: ApiConfig,
    /// Instance the items are written to (v9).
    pub destination: ApiConfig,
    /// JSON document holding collections, relations and ID remap tables.
    pub inputs: PathBuf,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Connection settings for one Directus instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, including the project segment for v8 (e.g. `https://cms.example.com/_`).
    pub url: String,
    /// Static access token sent as a bearer token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Explicit insertion order. When set, the dependency heuristic is skipped.
    #[serde(default)]
    pub collection_order: Option<Vec<String>>,
    /// How many count requests may be in flight at once.
    #[serde(default = "default_count_concurrency")]
    pub count_concurrency: usize,
    /// Per-request deadline.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Dry run mode (read and transform, but don't write to destination).
    #[serde(default)]
    pub dry_run: bool,
    /// Retry policy for page reads.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-collection allow-list filters.
    #[serde(default = "default_filters")]
    pub filters: Vec<AllowListFilterConfig>,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            collection_order: None,
            count_concurrency: default_count_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            dry_run: false,
            retry: RetryConfig::default(),
            filters: default_filters(),
        }
    }
}

fn default_count_concurrency() -> usize {
    1
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_filters() -> Vec<AllowListFilterConfig> {
    vec![AllowListFilterConfig::known_projects()]
}

impl MigrationConfig {
    /// Load configuration from a YAML file.
    ///
    /// A relative `inputs` path is resolved against the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        if config.inputs.is_relative() {
            if let Some(dir) = path.parent() {
                config.inputs = dir.join(&config.inputs);
            }
        }
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.source.url)?;
        validate_url(&self.destination.url)?;

        if self.options.count_concurrency == 0 {
            return Err(Error::Config(
                "count_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.options.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if let Some(order) = &self.options.collection_order {
            let mut seen = HashSet::new();
            for name in order {
                if name.is_empty() {
                    return Err(Error::Config(
                        "collection_order contains an empty name".to_string(),
                    ));
                }
                if !seen.insert(name) {
                    return Err(Error::Config(format!(
                        "collection '{}' appears twice in collection_order",
                        name
                    )));
                }
            }
        }
        for filter in &self.options.filters {
            if filter.prefix.is_empty() || filter.field.is_empty() {
                return Err(Error::Config(
                    "filter prefix and field cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
