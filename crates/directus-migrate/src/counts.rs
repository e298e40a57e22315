//! Source item counts and the page plan derived from them.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::connectors::SourceApi;
use crate::error::{Error, Result};
use crate::model::{CollectionDescriptor, PAGE_SIZE};

/// Number of pages needed to read `count` items.
#[must_use]
pub fn page_count(count: u64) -> u64 {
    count.div_ceil(PAGE_SIZE)
}

/// Total item count of every collection on the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable(HashMap<String, u64>);

impl CountTable {
    /// Count for a collection.
    ///
    /// # Errors
    ///
    /// Returns `MissingCount` if the collection was never counted.
    pub fn get(&self, collection: &str) -> Result<u64> {
        self.0
            .get(collection)
            .copied()
            .ok_or_else(|| Error::MissingCount(collection.to_string()))
    }

    /// Pages to read for a collection.
    ///
    /// # Errors
    ///
    /// Returns `MissingCount` if the collection was never counted.
    pub fn pages(&self, collection: &str) -> Result<u64> {
        self.get(collection).map(page_count)
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of counted collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u64)> for CountTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Asks the source for the item count of every collection.
///
/// Up to `concurrency` requests run at once; the first failure aborts with
/// `CountFetchFailed`, since without counts there is no page plan.
///
/// # Errors
///
/// Returns `CountFetchFailed` naming the first collection whose count failed.
pub async fn resolve_counts(
    source: &dyn SourceApi,
    collections: &[CollectionDescriptor],
    concurrency: usize,
) -> Result<CountTable> {
    info!("Getting counts for {} collections", collections.len());

    let counts: Vec<(String, u64)> = stream::iter(collections)
        .map(|c| async move {
            let count = source
                .count(&c.collection)
                .await
                .map_err(|e| Error::count_fetch(&c.collection, e))?;
            debug!("{}: {} items", c.collection, count);
            Ok::<_, Error>((c.collection.clone(), count))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(counts.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticCounts {
        counts: HashMap<&'static str, u64>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SourceApi for StaticCounts {
        async fn count(&self, collection: &str) -> Result<u64> {
            self.calls.lock().unwrap().push(collection.to_string());
            self.counts.get(collection).copied().ok_or(Error::Api {
                status: 503,
                body: "unavailable".to_string(),
            })
        }

        async fn fetch(&self, _: &str, _: u64, _: u64) -> Result<Vec<Item>> {
            Ok(Vec::new())
        }
    }

    fn source() -> StaticCounts {
        StaticCounts {
            counts: HashMap::from([("posts", 45), ("authors", 3), ("settings", 1)]),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(40), 1);
        assert_eq!(page_count(41), 2);
        assert_eq!(page_count(45), 2);
        assert_eq!(page_count(80), 2);
    }

    #[test]
    fn test_count_table_missing_entry() {
        let table: CountTable = [("posts".to_string(), 45)].into_iter().collect();
        assert_eq!(table.pages("posts").unwrap(), 2);
        assert!(matches!(table.get("authors"), Err(Error::MissingCount(_))));
    }

    #[tokio::test]
    async fn test_resolve_counts_in_input_order() {
        let source = source();
        let collections = vec![
            CollectionDescriptor::new("settings"),
            CollectionDescriptor::new("posts"),
            CollectionDescriptor::new("authors"),
        ];

        let table = resolve_counts(&source, &collections, 1).await.unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("posts").unwrap(), 45);
        assert_eq!(table.total(), 49);
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["settings", "posts", "authors"]
        );
    }

    #[tokio::test]
    async fn test_resolve_counts_concurrent() {
        let source = source();
        let collections = vec![
            CollectionDescriptor::new("posts"),
            CollectionDescriptor::new("authors"),
        ];

        let table = resolve_counts(&source, &collections, 4).await.unwrap();
        assert_eq!(table.get("authors").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_resolve_counts_failure_names_collection() {
        let source = source();
        let collections = vec![
            CollectionDescriptor::new("posts"),
            CollectionDescriptor::new("comments"),
        ];

        let err = resolve_counts(&source, &collections, 1).await.unwrap_err();

        match err {
            Error::CountFetchFailed { collection, reason } => {
                assert_eq!(collection, "comments");
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
