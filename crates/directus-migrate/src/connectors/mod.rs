//! Connectors to the source and destination Directus instances.

pub mod common;
pub mod directus;
pub mod dry_run;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::model::Item;

pub use directus::DirectusClient;
pub use dry_run::DryRunDestination;

/// Read side of a migration.
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Total number of items in a collection.
    async fn count(&self, collection: &str) -> Result<u64>;

    /// Reads up to `limit` items starting at `offset`.
    async fn fetch(&self, collection: &str, offset: u64, limit: u64) -> Result<Vec<Item>>;
}

/// Write side of a migration.
#[async_trait]
pub trait DestinationApi: Send + Sync {
    /// Creates all items in one request.
    async fn bulk_create(&self, collection: &str, items: &[Item]) -> Result<()>;

    /// Replaces the record of a singleton collection.
    async fn update(&self, collection: &str, item: &Item) -> Result<()>;
}

/// Create the source client from configuration.
pub fn create_source(config: &MigrationConfig) -> Box<dyn SourceApi> {
    Box::new(DirectusClient::new(
        &config.source,
        "source",
        Duration::from_secs(config.options.request_timeout_secs),
    ))
}

/// Create the destination client from configuration.
///
/// Dry runs get a destination that only records what would have been written.
pub fn create_destination(config: &MigrationConfig) -> Box<dyn DestinationApi> {
    if config.options.dry_run {
        Box::new(DryRunDestination::default())
    } else {
        Box::new(DirectusClient::new(
            &config.destination,
            "destination",
            Duration::from_secs(config.options.request_timeout_secs),
        ))
    }
}
