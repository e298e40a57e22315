//! Per-collection item filters.
//!
//! Source datasets carry their own garbage. Filters are registered against a
//! collection name prefix and decide, item by item, what reaches the
//! destination.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::model::Item;

/// Projects known to exist on the destination. Items of project
/// sub-collections pointing anywhere else are orphans.
pub const KNOWN_PROJECT_IDS: &[u64] = &[
    110, 111, 121, 122, 123, 125, 128, 129, 130, 131, 132, 135, 138, 142, 144, 146, 147, 149, 152,
    153, 155, 156, 157, 163, 169, 170, 171, 172, 177, 180, 182, 183, 185, 187, 197, 200, 204, 205,
    207, 208, 213, 230, 232, 234, 235, 237, 238, 239, 240, 241, 244, 245, 247, 248, 249,
];

/// Decides whether an item is migrated.
pub trait ItemFilter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether the item should be kept.
    fn keep(&self, item: &Item) -> bool;
}

/// Keeps items whose `field` holds one of the allowed IDs.
#[derive(Debug, Clone)]
pub struct AllowListFilter {
    name: String,
    field: String,
    allowed: HashSet<String>,
}

impl AllowListFilter {
    /// Creates a filter over `field`.
    pub fn new<I, V>(field: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let field = field.into();
        Self {
            name: format!("allow-list on {field}"),
            field,
            allowed: allowed.into_iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl ItemFilter for AllowListFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn keep(&self, item: &Item) -> bool {
        match item.get(&self.field) {
            Some(Value::Number(n)) => self.allowed.contains(&n.to_string()),
            Some(Value::String(s)) => self.allowed.contains(s),
            _ => false,
        }
    }
}

/// Config file form of an [`AllowListFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowListFilterConfig {
    /// Collections whose name starts with this prefix are filtered.
    pub prefix: String,
    /// Field holding the parent ID.
    pub field: String,
    /// Allowed parent IDs.
    pub allowed: Vec<Value>,
}

impl AllowListFilterConfig {
    /// Drops project sub-collection items that point at unknown projects.
    pub fn known_projects() -> Self {
        Self {
            prefix: "projects_".to_string(),
            field: "projects_id".to_string(),
            allowed: KNOWN_PROJECT_IDS.iter().map(|&id| Value::from(id)).collect(),
        }
    }

    /// Builds the filter.
    pub fn build(&self) -> AllowListFilter {
        AllowListFilter::new(
            self.field.clone(),
            self.allowed.iter().map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        )
    }
}

/// Filters keyed by collection name prefix.
#[derive(Default)]
pub struct FilterRegistry {
    entries: Vec<(String, Box<dyn ItemFilter>)>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from config entries.
    pub fn from_configs(configs: &[AllowListFilterConfig]) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry.register(config.prefix.clone(), Box::new(config.build()));
        }
        registry
    }

    /// Applies `filter` to every collection whose name starts with `prefix`.
    pub fn register(&mut self, prefix: impl Into<String>, filter: Box<dyn ItemFilter>) {
        self.entries.push((prefix.into(), filter));
    }

    /// Filters that apply to a collection.
    pub fn filters_for<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = &'a dyn ItemFilter> + 'a {
        self.entries
            .iter()
            .filter(move |(prefix, _)| collection.starts_with(prefix.as_str()))
            .map(|(_, filter)| filter.as_ref())
    }

    /// Keeps the items every applicable filter accepts. Returns how many were dropped.
    pub fn apply(&self, collection: &str, items: &mut Vec<Item>) -> usize {
        let before = items.len();
        for filter in self.filters_for(collection) {
            items.retain(|item| filter.keep(item));
            tracing::debug!(
                "{}: {} left {} items",
                collection,
                filter.name(),
                items.len()
            );
        }
        before - items.len()
    }

    /// Number of registered filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no filter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(prefix, filter)| (prefix, filter.name())))
            .finish()
    }
}
