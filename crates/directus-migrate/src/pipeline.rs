//! Migration pipeline orchestration.
//!
//! Counts every collection, orders them, then copies each one page by page.
//! Collections and pages are processed strictly one after another so writes
//! land on the destination in a predictable order.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{MigrationConfig, MigrationOptions};
use crate::connectors::{create_destination, create_source, DestinationApi, SourceApi};
use crate::counts::{resolve_counts, CountTable};
use crate::error::{Error, Result};
use crate::model::{CollectionDescriptor, Item, MigrationInputs, PAGE_SIZE};
use crate::retry::{with_retry, RetryConfig};
use crate::sequencer::{sequence_collections, SequenceMode};
use crate::transform::{FilterRegistry, RelationRemapper, SystemRemaps, Transformer};

/// How a collection's migration ended.
#[derive(Debug)]
pub enum CollectionOutcome {
    /// Every page was read and written.
    Completed,
    /// Migration stopped at some page. Pages written before it remain.
    Failed(Error),
}

/// Per-collection migration statistics.
#[derive(Debug)]
pub struct CollectionReport {
    /// Collection name.
    pub collection: String,
    /// Item count on the source.
    pub count: u64,
    /// Pages planned.
    pub pages: u64,
    /// Pages fully read and written.
    pub pages_done: u64,
    /// Items read from the source.
    pub read: u64,
    /// Items accepted by the destination.
    pub written: u64,
    /// Items dropped by filters or singleton truncation.
    pub dropped: u64,
    /// How it ended.
    pub outcome: CollectionOutcome,
}

impl CollectionReport {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            count: 0,
            pages: 0,
            pages_done: 0,
            read: 0,
            written: 0,
            dropped: 0,
            outcome: CollectionOutcome::Completed,
        }
    }

    /// Whether the collection migrated completely.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, CollectionOutcome::Completed)
    }
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// One entry per collection, in insertion order.
    pub collections: Vec<CollectionReport>,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl MigrationReport {
    /// Collections that did not complete.
    pub fn failed(&self) -> impl Iterator<Item = &CollectionReport> {
        self.collections.iter().filter(|c| !c.is_completed())
    }

    /// Whether every collection completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Total items read.
    #[must_use]
    pub fn read(&self) -> u64 {
        self.collections.iter().map(|c| c.read).sum()
    }

    /// Total items written.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.collections.iter().map(|c| c.written).sum()
    }

    /// Total items dropped.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.collections.iter().map(|c| c.dropped).sum()
    }

    /// Written items per second.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.written() as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Copies collections page by page from source to destination.
pub struct BatchMigrator<'a> {
    source: &'a dyn SourceApi,
    destination: &'a dyn DestinationApi,
    transformer: &'a Transformer,
    retry: &'a RetryConfig,
    show_progress: bool,
}

impl<'a> BatchMigrator<'a> {
    /// Create a migrator over the given endpoints.
    pub fn new(
        source: &'a dyn SourceApi,
        destination: &'a dyn DestinationApi,
        transformer: &'a Transformer,
        retry: &'a RetryConfig,
    ) -> Self {
        Self {
            source,
            destination,
            transformer,
            retry,
            show_progress: false,
        }
    }

    /// Draw a progress bar per collection.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Migrates collections in the given order.
    ///
    /// A failed collection is reported and the next one starts regardless.
    pub async fn migrate_all(
        &self,
        collections: &[CollectionDescriptor],
        counts: &CountTable,
    ) -> Vec<CollectionReport> {
        let mut reports = Vec::with_capacity(collections.len());
        for collection in collections {
            reports.push(self.migrate_collection(collection, counts).await);
        }
        reports
    }

    /// Migrates a single collection.
    pub async fn migrate_collection(
        &self,
        collection: &CollectionDescriptor,
        counts: &CountTable,
    ) -> CollectionReport {
        let mut report = CollectionReport::new(&collection.collection);

        let result = self.copy_pages(collection, counts, &mut report).await;

        match result {
            Ok(()) => info!(
                "{}: {} items read, {} written, {} dropped",
                report.collection, report.read, report.written, report.dropped
            ),
            Err(e) => {
                error!(
                    "{}: migration stopped after {}/{} pages: {}",
                    report.collection, report.pages_done, report.pages, e
                );
                report.outcome = CollectionOutcome::Failed(e);
            }
        }

        report
    }

    async fn copy_pages(
        &self,
        collection: &CollectionDescriptor,
        counts: &CountTable,
        report: &mut CollectionReport,
    ) -> Result<()> {
        let name = collection.collection.as_str();
        report.count = counts.get(name)?;
        report.pages = counts.pages(name)?;

        let progress = self.progress_bar(name, report.count);

        for page in 0..report.pages {
            let offset = page * PAGE_SIZE;
            progress.set_message(format!(
                "Inserting items {}-{}/{}",
                offset + 1,
                (offset + PAGE_SIZE).min(report.count),
                report.count
            ));

            let result = self.copy_page(collection, page, report).await;
            if let Err(e) = result {
                progress.abandon_with_message(format!("failed at page {}", page));
                return Err(e);
            }

            report.pages_done += 1;
            progress.set_position(report.read);
        }

        progress.finish_with_message("done");
        Ok(())
    }

    async fn copy_page(
        &self,
        collection: &CollectionDescriptor,
        page: u64,
        report: &mut CollectionReport,
    ) -> Result<()> {
        let name = collection.collection.as_str();
        let offset = page * PAGE_SIZE;

        let source = self.source;
        let operation = format!("{} page {}", name, page);
        let mut items = with_retry(self.retry, &operation, || async move {
            source
                .fetch(name, offset, PAGE_SIZE)
                .await
                .map_err(|e| Error::page_fetch(name, page, e))
        })
        .await
        .map_err(|exhausted| Error::PageFetchFatal {
            collection: name.to_string(),
            page,
            attempts: exhausted.attempts,
            reason: match exhausted.last_error {
                Error::PageFetchFailed { source, .. } => source.to_string(),
                other => other.to_string(),
            },
        })?;

        report.read += items.len() as u64;

        let stats = self.transformer.transform_page(name, &mut items);
        report.dropped += stats.dropped as u64;
        debug!("{} page {}: {:?}", name, page, stats);

        if items.is_empty() {
            debug!("{} page {}: nothing left to write", name, page);
            return Ok(());
        }

        if collection.single {
            self.write_singleton(name, items, report).await
        } else {
            self.destination
                .bulk_create(name, &items)
                .await
                .map_err(|e| Error::write_failed(name, e, &items))?;
            report.written += items.len() as u64;
            Ok(())
        }
    }

    async fn write_singleton(
        &self,
        name: &str,
        items: Vec<Item>,
        report: &mut CollectionReport,
    ) -> Result<()> {
        if items.len() > 1 {
            warn!(
                "{} is a singleton but returned {} items; only the first is written",
                name,
                items.len()
            );
            report.dropped += items.len() as u64 - 1;
        }

        let Some(item) = items.into_iter().next() else {
            return Ok(());
        };

        self.destination
            .update(name, &item)
            .await
            .map_err(|e| Error::write_failed(name, e, &item))?;
        report.written += 1;
        Ok(())
    }

    fn progress_bar(&self, name: &str, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_prefix(name.to_string());
        pb
    }
}

/// Migration pipeline.
pub struct Pipeline {
    options: MigrationOptions,
    inputs: MigrationInputs,
    source: Box<dyn SourceApi>,
    destination: Box<dyn DestinationApi>,
    transformer: Transformer,
    show_progress: bool,
}

impl Pipeline {
    /// Create a new migration pipeline from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs document cannot be loaded.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        let inputs = MigrationInputs::from_file(&config.inputs)?;
        let source = create_source(&config);
        let destination = create_destination(&config);

        Ok(Self::with_clients(config.options, inputs, source, destination))
    }

    /// Create a pipeline over already-built clients.
    pub fn with_clients(
        options: MigrationOptions,
        mut inputs: MigrationInputs,
        source: Box<dyn SourceApi>,
        destination: Box<dyn DestinationApi>,
    ) -> Self {
        inputs.resolve_kinds();

        let remapper = RelationRemapper::new(
            inputs.relations.clone(),
            SystemRemaps {
                users: inputs.users.clone(),
                files: inputs.files.clone(),
            },
        );
        let filters = FilterRegistry::from_configs(&options.filters);

        Self {
            options,
            inputs,
            source,
            destination,
            transformer: Transformer::new(remapper, filters),
            show_progress: false,
        }
    }

    /// Draw progress bars while running.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Register an extra filter for collections starting with `prefix`.
    pub fn register_filter(
        &mut self,
        prefix: impl Into<String>,
        filter: Box<dyn crate::transform::ItemFilter>,
    ) {
        self.transformer.filters_mut().register(prefix, filter);
    }

    /// The insertion order the run will use.
    #[must_use]
    pub fn plan(&self) -> Vec<CollectionDescriptor> {
        let mode = SequenceMode::from_order(self.options.collection_order.clone());
        sequence_collections(
            self.inputs.collections.clone(),
            &self.inputs.relations,
            &mode,
        )
    }

    /// The loaded inputs.
    pub fn inputs(&self) -> &MigrationInputs {
        &self.inputs
    }

    /// The system foreign key remapper built from the inputs.
    pub fn remapper(&self) -> &RelationRemapper {
        self.transformer.remapper()
    }

    /// Run the migration pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error only if counting fails. Collection failures are
    /// reported in the returned [`MigrationReport`].
    pub async fn run(&mut self) -> Result<MigrationReport> {
        let start = Instant::now();

        info!(
            "Starting migration of {} collections",
            self.inputs.collections.len()
        );

        let counts = resolve_counts(
            self.source.as_ref(),
            &self.inputs.collections,
            self.options.count_concurrency,
        )
        .await?;
        info!("{} items to migrate", counts.total());

        let ordered = self.plan();

        let migrator = BatchMigrator::new(
            self.source.as_ref(),
            self.destination.as_ref(),
            &self.transformer,
            &self.options.retry,
        )
        .with_progress(self.show_progress);

        let collections = migrator.migrate_all(&ordered, &counts).await;

        let report = MigrationReport {
            collections,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            "Migration finished: {} read, {} written, {} dropped, {} failed collections in {:.2}s",
            report.read(),
            report.written(),
            report.dropped(),
            report.failed().count(),
            report.duration_secs
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(collection: &str, written: u64, outcome: CollectionOutcome) -> CollectionReport {
        CollectionReport {
            written,
            read: written,
            outcome,
            ..CollectionReport::new(collection)
        }
    }

    #[test]
    fn test_migration_report_totals() {
        let report = MigrationReport {
            collections: vec![
                report("authors", 10, CollectionOutcome::Completed),
                report(
                    "posts",
                    40,
                    CollectionOutcome::Failed(Error::MissingCount("posts".into())),
                ),
            ],
            duration_secs: 2.0,
        };

        assert_eq!(report.written(), 50);
        assert!(!report.is_success());
        assert_eq!(report.failed().count(), 1);
        assert!((report.throughput() - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_migration_report_zero_duration() {
        let report = MigrationReport::default();
        assert!(report.is_success());
        assert_eq!(report.throughput(), 0.0);
    }
}
