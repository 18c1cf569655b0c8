use crate::constants::engine::{DEFAULT_CATALOG_SOURCE, DEFAULT_TAGS_INDEX_SOURCE};
use crate::errors::PickerError;
use crate::types::SourceId;

/// Random-selection strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Weight every catalog item equally.
    Uniform,
    /// Pick a batch uniformly first, then an item within it uniformly.
    Stratified,
}

/// Top-level selection engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Source identifier of the full catalog snapshot.
    pub catalog_source: SourceId,
    /// Source identifier of the published tag index.
    pub tags_index_source: SourceId,
    /// Batch partition sources used by the stratified strategy; empty means
    /// stratified selection delegates to uniform.
    pub batch_sources: Vec<SourceId>,
    /// RNG seed for reproducible picks; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_source: DEFAULT_CATALOG_SOURCE.to_string(),
            tags_index_source: DEFAULT_TAGS_INDEX_SOURCE.to_string(),
            batch_sources: Vec::new(),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Validate that every configured source identifier is non-empty.
    pub fn validated(self) -> Result<Self, PickerError> {
        if self.catalog_source.is_empty() || self.tags_index_source.is_empty() {
            return Err(PickerError::Configuration(
                "catalog and tag index sources must be non-empty".to_string(),
            ));
        }
        if self.batch_sources.iter().any(String::is_empty) {
            return Err(PickerError::Configuration(
                "batch sources must be non-empty".to_string(),
            ));
        }
        Ok(self)
    }
}
