//! Insertion order of collections.
//!
//! The destination resolves references at write time, so collections that are
//! referenced should be loaded before the ones referencing them. Without a
//! dependency graph this is approximated:
//!
//! 1. collections holding a many-to-one field go after those that don't;
//! 2. junction collections go last.
//!
//! Both are stable sorts, so collections keep their input order otherwise.
//! This is not a topological sort: a chain `a -> b -> c` of many-to-one
//! references can still come out as `b, a, c`. When that happens, operators
//! pass an explicit order instead.

use tracing::debug;

use crate::model::{CollectionDescriptor, RelationDescriptor};

/// How the insertion order is determined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SequenceMode {
    /// Many-to-one and junction heuristic.
    #[default]
    Heuristic,
    /// Operator-supplied order by collection name.
    Explicit(Vec<String>),
}

impl SequenceMode {
    /// Explicit mode if a non-empty order is given, heuristic otherwise.
    #[must_use]
    pub fn from_order(order: Option<Vec<String>>) -> Self {
        match order {
            Some(order) if !order.is_empty() => SequenceMode::Explicit(order),
            _ => SequenceMode::Heuristic,
        }
    }
}

/// Orders collections for insertion.
///
/// The result is a permutation of `collections`. In explicit mode, collections
/// missing from the order keep their relative input order after every listed
/// collection. Relations are accepted for a future dependency-graph ordering
/// and are not consulted yet.
#[must_use]
pub fn sequence_collections(
    mut collections: Vec<CollectionDescriptor>,
    _relations: &[RelationDescriptor],
    mode: &SequenceMode,
) -> Vec<CollectionDescriptor> {
    match mode {
        SequenceMode::Explicit(order) => {
            collections.sort_by_key(|c| {
                order
                    .iter()
                    .position(|name| *name == c.collection)
                    .unwrap_or(usize::MAX)
            });
        }
        SequenceMode::Heuristic => {
            collections.sort_by_key(CollectionDescriptor::has_many_to_one);
            collections.sort_by_key(CollectionDescriptor::is_junction);
        }
    }

    debug!(
        "Insertion order: {:?}",
        collections.iter().map(|c| c.collection.as_str()).collect::<Vec<_>>()
    );

    collections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CollectionKind;

    fn names(collections: &[CollectionDescriptor]) -> Vec<&str> {
        collections.iter().map(|c| c.collection.as_str()).collect()
    }

    fn many_to_one(name: &str) -> CollectionDescriptor {
        CollectionDescriptor::new(name).with_field("parent", "many-to-one")
    }

    fn junction(name: &str) -> CollectionDescriptor {
        CollectionDescriptor::new(name).with_kind(CollectionKind::Junction)
    }

    #[test]
    fn test_many_to_one_moves_back() {
        let input = vec![many_to_one("A"), CollectionDescriptor::new("C")];
        let out = sequence_collections(input, &[], &SequenceMode::Heuristic);
        assert_eq!(names(&out), vec!["C", "A"]);
    }

    #[test]
    fn test_junction_moves_to_end() {
        let input = vec![
            junction("B"),
            CollectionDescriptor::new("C"),
            many_to_one("A"),
        ];
        let out = sequence_collections(input, &[], &SequenceMode::Heuristic);
        assert_eq!(out.last().map(|c| c.collection.as_str()), Some("B"));
    }

    #[test]
    fn test_heuristic_composition() {
        let input = vec![
            many_to_one("A"),
            junction("B"),
            CollectionDescriptor::new("C"),
        ];
        let out = sequence_collections(input, &[], &SequenceMode::Heuristic);
        assert_eq!(names(&out), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_junction_with_many_to_one_fields_still_last() {
        let pivot = junction("posts_tags")
            .with_field("posts_id", "many-to-one")
            .with_field("tags_id", "many-to-one");
        let input = vec![pivot, many_to_one("posts"), CollectionDescriptor::new("tags")];
        let out = sequence_collections(input, &[], &SequenceMode::Heuristic);
        assert_eq!(names(&out), vec!["tags", "posts", "posts_tags"]);
    }

    #[test]
    fn test_heuristic_is_stable() {
        let input = vec![
            CollectionDescriptor::new("c1"),
            many_to_one("m1"),
            CollectionDescriptor::new("c2"),
            many_to_one("m2"),
        ];
        let out = sequence_collections(input, &[], &SequenceMode::Heuristic);
        assert_eq!(names(&out), vec!["c1", "c2", "m1", "m2"]);
    }

    #[test]
    fn test_heuristic_misorders_deep_chains() {
        // comments -> posts -> authors; both referencing collections look alike
        let input = vec![
            many_to_one("comments"),
            many_to_one("posts"),
            CollectionDescriptor::new("authors"),
        ];
        let out = sequence_collections(input, &[], &SequenceMode::Heuristic);
        assert_eq!(names(&out), vec!["authors", "comments", "posts"]);
    }

    #[test]
    fn test_explicit_order() {
        let input = vec![
            CollectionDescriptor::new("A"),
            CollectionDescriptor::new("B"),
            CollectionDescriptor::new("C"),
        ];
        let mode = SequenceMode::Explicit(vec!["B".into(), "A".into(), "C".into()]);
        let out = sequence_collections(input, &[], &mode);
        assert_eq!(names(&out), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_explicit_order_ignores_heuristic() {
        let input = vec![junction("J"), many_to_one("M")];
        let mode = SequenceMode::Explicit(vec!["J".into(), "M".into()]);
        let out = sequence_collections(input, &[], &mode);
        assert_eq!(names(&out), vec!["J", "M"]);
    }

    #[test]
    fn test_explicit_order_unlisted_go_last_in_input_order() {
        let input = vec![
            CollectionDescriptor::new("x"),
            CollectionDescriptor::new("A"),
            CollectionDescriptor::new("y"),
            CollectionDescriptor::new("B"),
        ];
        let mode = SequenceMode::Explicit(vec!["B".into(), "A".into(), "unknown".into()]);
        let out = sequence_collections(input, &[], &mode);
        assert_eq!(names(&out), vec!["B", "A", "x", "y"]);
    }

    #[test]
    fn test_mode_from_order() {
        assert_eq!(SequenceMode::from_order(None), SequenceMode::Heuristic);
        assert_eq!(
            SequenceMode::from_order(Some(vec!["a".into()])),
            SequenceMode::Explicit(vec!["a".into()])
        );
        assert_eq!(SequenceMode::from_order(Some(vec![])), SequenceMode::Heuristic);
    }
}
