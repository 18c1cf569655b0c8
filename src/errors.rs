use std::io;

use thiserror::Error;

use crate::types::SourceId;

/// Error type for catalog decoding, source fetches, and persistence failures.
#[derive(Debug, Error)]
pub enum PickerError {
    #[error("catalog decode failed at {context}: {reason}")]
    Decode { context: String, reason: String },
    #[error("artifact encode failed at {context}: {reason}")]
    Encode { context: String, reason: String },
    #[error("data source '{source_id}' is unavailable: {reason}")]
    Fetch { source_id: SourceId, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("preference store failure: {0}")]
    PrefStore(String),
}
