use crate::types::ItemId;

/// Constants naming the published index artifacts.
pub mod artifacts {
    /// Filename of the tag→ids inverted index artifact.
    pub const TAGS_INDEX_FILE: &str = "tags_index.json";
    /// Filename of the sorted tag vocabulary artifact.
    pub const AVAILABLE_TAGS_FILE: &str = "available_tags.json";
    /// Filename of the sorted id universe artifact.
    pub const RELEASED_IDS_FILE: &str = "released_appids.csv";
}

/// Constants used by the index builder.
pub mod builder {
    /// Items processed between progress lines on stderr.
    pub const PROGRESS_INTERVAL: u64 = 10_000;
    /// Number of most-common tags included in the build summary.
    pub const TOP_TAG_REPORT_LIMIT: usize = 20;
}

/// Constants used by the selection engine.
pub mod engine {
    use super::ItemId;

    /// Default source identifier for the full catalog snapshot.
    pub const DEFAULT_CATALOG_SOURCE: &str = "data/released_appids.csv";
    /// Default source identifier for the published tag index.
    pub const DEFAULT_TAGS_INDEX_SOURCE: &str = "data/tags_index.json";
    /// Filename prefix that marks a batch partition file.
    pub const BATCH_FILE_PREFIX: &str = "Batch_";
    /// Filename extension of batch partition files.
    pub const BATCH_FILE_EXTENSION: &str = "csv";
    /// Last-resort item id applied by callers when every selection path
    /// yields no candidates. Never applied inside the engine.
    pub const DEFAULT_FALLBACK_ID: ItemId = 570;
}

/// Constants used by selected-tag persistence.
pub mod prefs {
    /// Default filename for the persisted selected-tag set.
    pub const SELECTED_TAGS_FILE: &str = "selected_tags.json";
}
