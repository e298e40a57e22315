//! Item transformation between fetch and write.
//!
//! Every page goes through the same three steps, in order: system foreign key
//! remap, timestamp repair, then the collection's filters.

pub mod filters;
pub mod relations;
pub mod timestamps;

use crate::model::Item;

pub use filters::{AllowListFilter, FilterRegistry, ItemFilter};
pub use relations::{RelationRemapper, SystemRemaps};

/// Summary of one transformed page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformStats {
    /// Foreign keys rewritten to destination IDs.
    pub remapped: usize,
    /// Foreign keys with no destination ID.
    pub unmapped: usize,
    /// Timestamps repaired.
    pub timestamps_repaired: usize,
    /// Items dropped by filters.
    pub dropped: usize,
}

/// Applies the page transformations for a migration.
#[derive(Debug, Default)]
pub struct Transformer {
    remapper: RelationRemapper,
    filters: FilterRegistry,
}

impl Transformer {
    /// Create a new transformer.
    pub fn new(remapper: RelationRemapper, filters: FilterRegistry) -> Self {
        Self { remapper, filters }
    }

    /// Access to the remapper, e.g. to describe what will be rewritten.
    pub fn remapper(&self) -> &RelationRemapper {
        &self.remapper
    }

    /// Mutable access to the filter registry.
    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// Transform a page of items fetched from `collection`.
    pub fn transform_page(&self, collection: &str, items: &mut Vec<Item>) -> TransformStats {
        let remap = self.remapper.remap(collection, items);

        let timestamps_repaired = items
            .iter_mut()
            .map(timestamps::repair_timestamps)
            .sum();

        let dropped = self.filters.apply(collection, items);

        TransformStats {
            remapped: remap.remapped,
            unmapped: remap.unmapped,
            timestamps_repaired,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IdRemapTable, RelationDescriptor};
    use crate::transform::filters::AllowListFilterConfig;
    use serde_json::json;

    #[test]
    fn test_transform_page_applies_all_steps() {
        let remaps = SystemRemaps {
            users: IdRemapTable::from_iter([(1, json!("u-1"))]),
            files: IdRemapTable::new(),
        };
        let remapper = RelationRemapper::new(
            vec![RelationDescriptor {
                many_collection: "projects_notes".to_string(),
                many_field: "owner".to_string(),
                one_collection: "directus_users".to_string(),
            }],
            remaps,
        );
        let filters = FilterRegistry::from_configs(&[AllowListFilterConfig::known_projects()]);
        let transformer = Transformer::new(remapper, filters);

        let mut items: Vec<Item> = vec![
            json!({"owner": 1, "projects_id": 110, "created_on": "2020-01-02 03:04:05"}),
            json!({"owner": 1, "projects_id": 1, "created_on": "2020-01-02 03:04:05"}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let stats = transformer.transform_page("projects_notes", &mut items);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["owner"], "u-1");
        assert_eq!(items[0]["created_on"], "2020-01-02T03:04:05");
        assert_eq!(
            stats,
            TransformStats {
                remapped: 2,
                unmapped: 0,
                timestamps_repaired: 2,
                dropped: 1,
            }
        );
    }
}
