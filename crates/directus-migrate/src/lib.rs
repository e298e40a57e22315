// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # Directus Migration Tool
//!
//! `directus-migrate` copies collection items from a Directus v8 instance into
//! a Directus v9 instance during a platform upgrade.
//!
//! It is run once, after the v9 schema, users and files exist. For every
//! collection it reads the source page by page, rewrites references to users
//! and files to their new IDs, fixes timestamps v9 rejects, drops orphaned
//! rows, and writes the result to the destination.
//!
//! ## Quick Start
//!
//! ```bash
//! directus-migrate run --config migration.yaml
//!
//! # Preview the insertion order without touching either API
//! directus-migrate plan --config migration.yaml
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   url: https://old.example.com/_
//!   token: v8-static-token
//!
//! destination:
//!   url: https://new.example.com
//!   token: v9-static-token
//!
//! inputs: ./inputs.json
//!
//! options:
//!   collection_order: [authors, posts, posts_tags]
//! ```
//!
//! ## Known gaps
//!
//! - Insertion order is a heuristic, not a dependency graph.
//! - Only `directus_users` and `directus_files` references are remapped.
//! - Singleton collections only receive the first item of a page.

#![warn(missing_docs)]

pub mod config;
pub mod connectors;
pub mod counts;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod retry;
pub mod sequencer;
pub mod transform;

pub use config::{ApiConfig, MigrationConfig, MigrationOptions};
pub use connectors::{DestinationApi, SourceApi};
pub use counts::{page_count, resolve_counts, CountTable};
pub use error::{Error, Result};
pub use model::{
    CollectionDescriptor, CollectionKind, IdRemapTable, Item, MigrationInputs,
    RelationDescriptor, PAGE_SIZE,
};
pub use pipeline::{BatchMigrator, CollectionOutcome, CollectionReport, MigrationReport, Pipeline};
pub use retry::RetryConfig;
pub use sequencer::{sequence_collections, SequenceMode};
pub use transform::Transformer;
