#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Offline index builder: streaming catalog decode and artifact publishing.
pub mod builder;
/// Lazy source cache with in-flight load de-duplication.
pub mod cache;
/// Catalog payload types and artifact codecs.
pub mod catalog;
/// Engine configuration and strategy selection.
pub mod config;
/// Centralized constants used across builder, engine, and preferences.
pub mod constants;
/// Online selection engine: cached loads, tag filtering, random picks.
pub mod engine;
/// Selected-tag persistence helpers.
pub mod prefs;
/// Fetch collaborator traits and built-in fetchers.
pub mod source;
/// Tag frequency statistics used by build reports.
pub mod stats;
/// Shared type aliases.
pub mod types;

mod errors;

pub use builder::{build, BuildSummary, CatalogFormat, IndexAccumulator, IndexArtifacts};
pub use cache::SourceCache;
pub use catalog::{parse_id_lines, TagIndex, TagSet};
pub use config::{EngineConfig, Strategy};
pub use engine::SelectionEngine;
pub use errors::PickerError;
pub use prefs::{parse_tag_list, FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use source::{discover_batch_sources, FetchSource, FileFetcher, InMemoryFetcher};
pub use stats::{top_tags, TagCount};
pub use types::{ItemId, SelectedTags, SourceId, TagName};
