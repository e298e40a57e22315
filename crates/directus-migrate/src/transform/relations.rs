//! Remapping of foreign keys that point at system collections.

use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{IdRemapTable, Item, RelationDescriptor, FILES_COLLECTION, USERS_COLLECTION};

/// ID remap tables for the system collections the migration knows about.
#[derive(Debug, Clone, Default)]
pub struct SystemRemaps {
    /// `directus_users` IDs.
    pub users: IdRemapTable,
    /// `directus_files` IDs.
    pub files: IdRemapTable,
}

impl SystemRemaps {
    /// Table for a system collection, if one exists.
    #[must_use]
    pub fn table_for(&self, one_collection: &str) -> Option<&IdRemapTable> {
        match one_collection {
            USERS_COLLECTION => Some(&self.users),
            FILES_COLLECTION => Some(&self.files),
            _ => None,
        }
    }
}

/// Rewrites system foreign keys of fetched items.
#[derive(Debug, Clone, Default)]
pub struct RelationRemapper {
    relations: Vec<RelationDescriptor>,
    remaps: SystemRemaps,
}

/// Outcome of remapping one page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RemapStats {
    /// Values replaced by their destination ID.
    pub remapped: usize,
    /// Values with no destination ID, written as `null`.
    pub unmapped: usize,
}

impl RelationRemapper {
    /// Creates a remapper over all relations of the migration.
    pub fn new(relations: Vec<RelationDescriptor>, remaps: SystemRemaps) -> Self {
        Self { relations, remaps }
    }

    /// Relations from `collection` to a system collection.
    pub fn system_relations_for<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = &'a RelationDescriptor> + 'a {
        self.relations
            .iter()
            .filter(move |r| r.many_collection == collection && r.targets_system_collection())
    }

    /// Remaps every system foreign key of `items` in place.
    ///
    /// Relations to system collections other than users and files are left
    /// untouched.
    pub fn remap(&self, collection: &str, items: &mut [Item]) -> RemapStats {
        let mut stats = RemapStats::default();

        for relation in self.system_relations_for(collection) {
            let Some(table) = self.remaps.table_for(&relation.one_collection) else {
                debug!(
                    "{}.{} references {}, which has no ID remap table; leaving as is",
                    collection, relation.many_field, relation.one_collection
                );
                continue;
            };

            for item in items.iter_mut() {
                let Some(value) = item.get_mut(&relation.many_field) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                match table.lookup(value) {
                    Some(mapped) => {
                        *value = mapped.clone();
                        stats.remapped += 1;
                    }
                    None => {
                        warn!(
                            "{}.{}: no {} entry for {}, writing null",
                            collection, relation.many_field, relation.one_collection, value
                        );
                        *value = Value::Null;
                        stats.unmapped += 1;
                    }
                }
            }
        }

        stats
    }
}
