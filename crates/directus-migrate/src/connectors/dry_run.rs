//! Destination that records writes instead of sending them.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::connectors::DestinationApi;
use crate::error::Result;
use crate::model::Item;

/// Destination used by `--dry-run`.
#[derive(Debug, Default)]
pub struct DryRunDestination {
    items: AtomicU64,
    requests: AtomicU64,
}

impl DryRunDestination {
    /// Items that would have been written.
    pub fn items(&self) -> u64 {
        self.items.load(Ordering::Relaxed)
    }

    /// Requests that would have been sent.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DestinationApi for DryRunDestination {
    async fn bulk_create(&self, collection: &str, items: &[Item]) -> Result<()> {
        info!("[dry run] would create {} items in {}", items.len(), collection);
        self.items.fetch_add(items.len() as u64, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn update(&self, collection: &str, _item: &Item) -> Result<()> {
        info!("[dry run] would update singleton {}", collection);
        self.items.fetch_add(1, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_counts_writes() {
        let dest = DryRunDestination::default();
        dest.bulk_create("posts", &[Item::new(), Item::new()])
            .await
            .unwrap();
        dest.update("settings", &Item::new()).await.unwrap();

        assert_eq!(dest.items(), 3);
        assert_eq!(dest.requests(), 2);
    }
}
