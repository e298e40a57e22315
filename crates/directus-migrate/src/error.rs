//! Error types for directus-migrate.

use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while migrating collection data.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (invalid YAML, bad URL, conflicting options).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source refused to report a collection's item count. Aborts the run.
    #[error("Failed to fetch item count for collection '{collection}': {reason}")]
    CountFetchFailed {
        /// Collection being counted.
        collection: String,
        /// Underlying failure.
        reason: String,
    },

    /// No count was resolved for a collection before migrating it.
    #[error("No item count resolved for collection '{0}'")]
    MissingCount(String),

    /// A page read failed; may be retried according to the retry policy.
    #[error("Failed to fetch page {page} of collection '{collection}': {source}")]
    PageFetchFailed {
        /// Collection being read.
        collection: String,
        /// Zero-based page index.
        page: u64,
        /// Underlying failure.
        source: Box<Error>,
    },

    /// A page read kept failing after all retries. Aborts the collection.
    #[error("Giving up on page {page} of collection '{collection}' after {attempts} attempts: {reason}")]
    PageFetchFatal {
        /// Collection being read.
        collection: String,
        /// Zero-based page index.
        page: u64,
        /// Number of attempts made.
        attempts: u32,
        /// Last underlying failure.
        reason: String,
    },

    /// The destination rejected a write. Aborts the collection.
    #[error("Data migration failed for collection '{collection}': {reason}. Payload: {payload}")]
    WriteFailed {
        /// Collection being written.
        collection: String,
        /// Underlying failure.
        reason: String,
        /// JSON serialization of the rejected items, for manual reconciliation.
        payload: String,
    },

    /// Authentication rejected by one of the APIs.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limited by one of the APIs (seconds to wait).
    #[error("Rate limited, retry after {0} seconds")]
    RateLimit(u64),

    /// Non-success HTTP status from one of the APIs.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the server.
        body: String,
    },

    /// Transport-level HTTP failure (connect, timeout, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error (config and inputs files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a `CountFetchFailed` error.
    pub fn count_fetch(collection: impl Into<String>, reason: impl ToString) -> Self {
        Error::CountFetchFailed {
            collection: collection.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a `PageFetchFailed` error.
    pub fn page_fetch(collection: impl Into<String>, page: u64, source: Error) -> Self {
        Error::PageFetchFailed {
            collection: collection.into(),
            page,
            source: Box::new(source),
        }
    }

    /// Create a `WriteFailed` error, serializing the rejected payload.
    pub fn write_failed<T: serde::Serialize + ?Sized>(
        collection: impl Into<String>,
        reason: impl ToString,
        payload: &T,
    ) -> Self {
        Error::WriteFailed {
            collection: collection.into(),
            reason: reason.to_string(),
            payload: serde_json::to_string(payload)
                .unwrap_or_else(|e| format!("<unserializable payload: {e}>")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failed_includes_payload() {
        let items = vec![serde_json::json!({"id": 1, "title": "Hello"})];
        let err = Error::write_failed("posts", "HTTP 400", &items);

        let msg = err.to_string();
        assert!(msg.contains("posts"));
        assert!(msg.contains("HTTP 400"));
        assert!(msg.contains(r#""title":"Hello""#));
    }
}
