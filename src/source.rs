//! Fetch collaborator interface and built-in fetchers.
//!
//! The engine never touches the filesystem or network directly; it asks a
//! `FetchSource` for raw text by source identifier and decodes from there.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use walkdir::WalkDir;

use crate::constants::engine::{BATCH_FILE_EXTENSION, BATCH_FILE_PREFIX};
use crate::errors::PickerError;
use crate::types::SourceId;

/// Raw-text fetch primitive consumed by the selection engine.
///
/// Implementations resolve a source identifier (relative path, URL, or any
/// opaque key) to its full text content, or fail with a `Fetch` error.
pub trait FetchSource: Send + Sync {
    /// Stable identifier for this fetcher, used in logs.
    fn id(&self) -> &str;
    /// Fetch the raw text behind `source`.
    fn fetch(&self, source: &str) -> Result<String, PickerError>;
}

/// Filesystem fetcher resolving source identifiers under a root directory.
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    /// Create a fetcher rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FetchSource for FileFetcher {
    fn id(&self) -> &str {
        "file"
    }

    fn fetch(&self, source: &str) -> Result<String, PickerError> {
        fs::read_to_string(self.root.join(source)).map_err(|err| PickerError::Fetch {
            source_id: source.to_string(),
            reason: err.to_string(),
        })
    }
}

/// In-memory fetcher for tests and small embedded datasets.
///
/// Counts fetches so callers can assert cache and de-duplication behavior.
#[derive(Default)]
pub struct InMemoryFetcher {
    texts: RwLock<HashMap<SourceId, String>>,
    fetches: AtomicUsize,
}

impl InMemoryFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `text` under `source`, replacing any previous content.
    pub fn insert(&self, source: impl Into<SourceId>, text: impl Into<String>) {
        let mut texts = self.texts.write().expect("fetcher texts poisoned");
        texts.insert(source.into(), text.into());
    }

    /// Remove `source` so later fetches fail.
    pub fn remove(&self, source: &str) {
        let mut texts = self.texts.write().expect("fetcher texts poisoned");
        texts.remove(source);
    }

    /// Total number of fetch calls observed.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl FetchSource for InMemoryFetcher {
    fn id(&self) -> &str {
        "memory"
    }

    fn fetch(&self, source: &str) -> Result<String, PickerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let texts = self.texts.read().expect("fetcher texts poisoned");
        texts
            .get(source)
            .cloned()
            .ok_or_else(|| PickerError::Fetch {
                source_id: source.to_string(),
                reason: "no such source registered".to_string(),
            })
    }
}

/// Discover batch partition files under `root/dir`.
///
/// Matches `Batch_*.csv` filenames one level deep and returns their source
/// identifiers (`dir/<name>`) in sorted order. The partitioning itself is
/// externally defined; this only finds the files.
pub fn discover_batch_sources(root: &Path, dir: &str) -> Vec<SourceId> {
    let mut sources: Vec<SourceId> = WalkDir::new(root.join(dir))
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let is_batch = name.starts_with(BATCH_FILE_PREFIX)
                && Path::new(name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case(BATCH_FILE_EXTENSION))
                    .unwrap_or(false);
            is_batch.then(|| format!("{dir}/{name}"))
        })
        .collect();
    sources.sort();
    sources
}
