//! Repair of timestamps stored without a date/time separator.
//!
//! v8 hands back `created_on` / `modified_on` as `YYYY-MM-DD HH:MM:SS`, which
//! v9 rejects. The first space becomes a `T`; anything else is left alone.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::model::Item;

/// Fields checked for malformed timestamps.
pub const TIMESTAMP_FIELDS: [&str; 2] = ["created_on", "modified_on"];

static NAIVE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}").expect("valid timestamp regex")
});

/// Whether the value contains a space-separated `YYYY-MM-DD HH:MM:SS` timestamp.
#[must_use]
pub fn contains_naive_timestamp(value: &str) -> bool {
    NAIVE_TIMESTAMP.is_match(value)
}

/// Returns the repaired value, or `None` when no repair applies.
#[must_use]
pub fn repair_timestamp(value: &str) -> Option<String> {
    contains_naive_timestamp(value).then(|| value.replacen(' ', "T", 1))
}

/// Repairs the timestamp fields of an item in place. Returns how many changed.
pub fn repair_timestamps(item: &mut Item) -> usize {
    let mut repaired = 0;
    for field in TIMESTAMP_FIELDS {
        if let Some(Value::String(current)) = item.get_mut(field) {
            if let Some(fixed) = repair_timestamp(current) {
                debug!("Repairing {}: {} -> {}", field, current, fixed);
                *current = fixed;
                repaired += 1;
            }
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repair_space_separated() {
        assert_eq!(
            repair_timestamp("2020-01-02 03:04:05").as_deref(),
            Some("2020-01-02T03:04:05")
        );
    }

    #[test]
    fn test_already_iso_unchanged() {
        assert_eq!(repair_timestamp("2020-01-02T03:04:05"), None);
        assert_eq!(repair_timestamp("2020-01-02T03:04:05+02:00"), None);
    }

    #[test]
    fn test_garbage_unchanged() {
        assert_eq!(repair_timestamp("not a date"), None);
        assert_eq!(repair_timestamp(""), None);
        assert_eq!(repair_timestamp("2020-1-2 3:4:5"), None);
    }

    #[test]
    fn test_timestamp_embedded_in_text() {
        assert!(contains_naive_timestamp("at 2020-01-02 03:04:05"));
        assert!(!contains_naive_timestamp("2020-01-02  03:04:05"));
        assert!(!contains_naive_timestamp("٢٠٢٠-٠١-٠٢ ٠٣:٠٤:٠٥"));
        assert_eq!(
            repair_timestamp("at 2020-01-02 03:04:05").as_deref(),
            Some("atT2020-01-02 03:04:05")
        );
    }

    #[test]
    fn test_only_first_space_replaced() {
        assert_eq!(
            repair_timestamp("2020-01-02 03:04:05 UTC").as_deref(),
            Some("2020-01-02T03:04:05 UTC")
        );
    }

    #[test]
    fn test_repair_timestamps_on_item() {
        let mut item = json!({
            "id": 1,
            "created_on": "2019-06-30 12:00:00",
            "modified_on": "2019-07-01T08:30:00",
            "published_on": "2019-06-30 12:00:00"
        })
        .as_object()
        .cloned()
        .unwrap();

        assert_eq!(repair_timestamps(&mut item), 1);
        assert_eq!(item["created_on"], "2019-06-30T12:00:00");
        assert_eq!(item["modified_on"], "2019-07-01T08:30:00");
        // Only the conventional audit fields are touched
        assert_eq!(item["published_on"], "2019-06-30 12:00:00");
    }

    #[test]
    fn test_non_string_timestamps_ignored() {
        let mut item = json!({"created_on": null, "modified_on": 1577934245})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(repair_timestamps(&mut item), 0);
    }
}
