//! Collection, relation and item types consumed by the migration core.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Number of items read and written per page.
pub const PAGE_SIZE: u64 = 40;

/// Prefix shared by all platform-managed collections.
pub const SYSTEM_COLLECTION_PREFIX: &str = "directus_";

/// System collection holding users.
pub const USERS_COLLECTION: &str = "directus_users";

/// System collection holding uploaded files.
pub const FILES_COLLECTION: &str = "directus_files";

/// Interface name marking a many-to-one relation field.
pub const MANY_TO_ONE_INTERFACE: &str = "many-to-one";

/// A single record, as returned by the source and sent to the destination.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Labels the admin app writes into a collection note when it creates a
/// junction collection, one per supported locale.
const JUNCTION_NOTE_LABELS: &[&str] = &[
    "連接點集合",
    "交叉集合",
    "中継コレクション",
    "Узловая Коллекция",
    "Verbindingscollectie",
    "Verbindungssammlung",
    "Збірна колекція",
    "Spojovací kategorie",
    "Junction Collection",
    "Pengumpulan Persimpangan",
    "Kesişim Koleksiyonu",
    "مجموعة تلاقي",
    "Kolekcja Junction",
    "Jução da coleção",
    "Koleksi Persimpangan",
    "Collezione Junction",
    "Colección de empalme",
    "Collection de jonction",
    "Colección de unión",
];

/// Role of a collection in the data model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Regular content collection.
    #[default]
    Normal,
    /// Pivot table linking two other collections.
    Junction,
}

impl CollectionKind {
    /// Infers the kind from a collection note written by the admin app.
    #[must_use]
    pub fn from_note(note: Option<&str>) -> Self {
        match note {
            Some(note) if JUNCTION_NOTE_LABELS.contains(&note) => CollectionKind::Junction,
            _ => CollectionKind::Normal,
        }
    }
}

/// Field metadata. Only the interface is needed to detect relation shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// UI interface name (e.g. `many-to-one`).
    #[serde(default)]
    pub interface: Option<String>,
}

/// Description of a collection to migrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Unique collection name.
    pub collection: String,
    /// Whether the collection holds a single record.
    #[serde(default)]
    pub single: bool,
    /// Fields by name.
    #[serde(default)]
    pub fields: HashMap<String, FieldMeta>,
    /// Free-text note.
    #[serde(default)]
    pub note: Option<String>,
    /// Explicit kind. Derived from `note` when the inputs omit it.
    #[serde(default)]
    pub kind: Option<CollectionKind>,
}

impl CollectionDescriptor {
    /// Creates a plain list collection with no fields.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            single: false,
            fields: HashMap::new(),
            note: None,
            kind: None,
        }
    }

    /// Adds a field with the given interface.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, interface: impl Into<String>) -> Self {
        self.fields.insert(
            name.into(),
            FieldMeta {
                interface: Some(interface.into()),
            },
        );
        self
    }

    /// Sets the collection kind.
    #[must_use]
    pub fn with_kind(mut self, kind: CollectionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Marks the collection as a singleton.
    #[must_use]
    pub fn singleton(mut self) -> Self {
        self.single = true;
        self
    }

    /// Resolved kind of this collection.
    #[must_use]
    pub fn kind(&self) -> CollectionKind {
        self.kind
            .unwrap_or_else(|| CollectionKind::from_note(self.note.as_deref()))
    }

    /// Whether this is a junction collection.
    #[must_use]
    pub fn is_junction(&self) -> bool {
        self.kind() == CollectionKind::Junction
    }

    /// Whether any field holds a many-to-one reference.
    #[must_use]
    pub fn has_many_to_one(&self) -> bool {
        self.fields
            .values()
            .any(|f| f.interface.as_deref() == Some(MANY_TO_ONE_INTERFACE))
    }
}

/// Foreign key from `many_collection.many_field` to `one_collection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Collection holding the foreign key.
    pub many_collection: String,
    /// Field holding the foreign key.
    pub many_field: String,
    /// Referenced collection.
    pub one_collection: String,
}

impl RelationDescriptor {
    /// Whether the referenced collection is platform-managed.
    #[must_use]
    pub fn targets_system_collection(&self) -> bool {
        self.one_collection.starts_with(SYSTEM_COLLECTION_PREFIX)
    }
}

/// Mapping from source system IDs to destination system IDs.
///
/// Keys are the textual form of the source ID, so `7` and `"7"` resolve to
/// the same entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdRemapTable(HashMap<String, serde_json::Value>);

impl IdRemapTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping.
    pub fn insert(&mut self, source: impl ToString, destination: serde_json::Value) {
        self.0.insert(source.to_string(), destination);
    }

    /// Looks up the destination ID for a source ID value.
    #[must_use]
    pub fn lookup(&self, source: &serde_json::Value) -> Option<&serde_json::Value> {
        let key = match source {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        self.0.get(&key)
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: ToString> FromIterator<(K, serde_json::Value)> for IdRemapTable {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Everything the migration needs besides the two APIs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationInputs {
    /// Collections to migrate.
    pub collections: Vec<CollectionDescriptor>,
    /// Relations between collections.
    #[serde(default)]
    pub relations: Vec<RelationDescriptor>,
    /// Source user ID -> destination user ID.
    #[serde(default)]
    pub users: IdRemapTable,
    /// Source file ID -> destination file ID.
    #[serde(default)]
    pub files: IdRemapTable,
}

impl MigrationInputs {
    /// Load inputs from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut inputs: Self = serde_json::from_str(&content)?;
        inputs.resolve_kinds();
        Ok(inputs)
    }

    /// Pins every collection's kind so later stages never look at notes.
    pub fn resolve_kinds(&mut self) {
        for collection in &mut self.collections {
            if collection.kind.is_none() {
                collection.kind = Some(CollectionKind::from_note(collection.note.as_deref()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_note_labels() {
        assert_eq!(
            CollectionKind::from_note(Some("Junction Collection")),
            CollectionKind::Junction
        );
        assert_eq!(
            CollectionKind::from_note(Some("Verbindungssammlung")),
            CollectionKind::Junction
        );
        assert_eq!(
            CollectionKind::from_note(Some("junction collection")),
            CollectionKind::Normal
        );
        assert_eq!(CollectionKind::from_note(None), CollectionKind::Normal);
    }

    #[test]
    fn test_explicit_kind_wins_over_note() {
        let mut c = CollectionDescriptor::new("tags_posts");
        c.note = Some("Junction Collection".to_string());
        c.kind = Some(CollectionKind::Normal);
        assert!(!c.is_junction());
    }

    #[test]
    fn test_has_many_to_one() {
        let c = CollectionDescriptor::new("posts")
            .with_field("title", "text-input")
            .with_field("author", "many-to-one");
        assert!(c.has_many_to_one());
        assert!(!CollectionDescriptor::new("tags").has_many_to_one());
    }

    #[test]
    fn test_remap_lookup_number_and_string_keys() {
        let table: IdRemapTable = [(7, json!(907)), (8, json!("uuid-8"))].into_iter().collect();
        assert_eq!(table.lookup(&json!(7)), Some(&json!(907)));
        assert_eq!(table.lookup(&json!("8")), Some(&json!("uuid-8")));
        assert_eq!(table.lookup(&json!(9)), None);
        assert_eq!(table.lookup(&json!(null)), None);
    }

    #[test]
    fn test_inputs_parse_and_resolve_kinds() {
        let raw = r#"{
            "collections": [
                {"collection": "posts", "fields": {"author": {"interface": "many-to-one"}}},
                {"collection": "posts_tags", "note": "Collection de jonction"},
                {"collection": "settings", "single": true, "kind": "normal"}
            ],
            "relations": [
                {"many_collection": "posts", "many_field": "author", "one_collection": "directus_users"}
            ],
            "users": {"1": "5b1f-uuid"}
        }"#;
        let mut inputs: MigrationInputs = serde_json::from_str(raw).unwrap();
        inputs.resolve_kinds();

        assert_eq!(inputs.collections.len(), 3);
        assert_eq!(inputs.collections[1].kind, Some(CollectionKind::Junction));
        assert_eq!(inputs.collections[0].kind, Some(CollectionKind::Normal));
        assert!(inputs.collections[2].single);
        assert!(inputs.relations[0].targets_system_collection());
        assert_eq!(inputs.users.len(), 1);
        assert!(inputs.files.is_empty());
    }
}
