//! Selected-tag persistence.
//!
//! The engine never stores the selection itself; callers persist it through
//! a `PreferenceStore` and hand the restored set back per query.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::RwLock;

use tempfile::NamedTempFile;

use crate::errors::PickerError;
use crate::types::{SelectedTags, TagName};

/// Durable storage for the user's selected tag set.
pub trait PreferenceStore: Send + Sync {
    /// Restore the persisted selection; empty when nothing was stored.
    fn load_selected_tags(&self) -> Result<SelectedTags, PickerError>;
    /// Persist `tags`, replacing any previous selection.
    fn store_selected_tags(&self, tags: &SelectedTags) -> Result<(), PickerError>;
}

/// File-backed preference store holding a JSON array of tag names.
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Create a store persisting to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load_selected_tags(&self) -> Result<SelectedTags, PickerError> {
        if !self.path.exists() {
            return Ok(SelectedTags::new());
        }
        let text = fs::read_to_string(&self.path)?;
        let names: Vec<TagName> = serde_json::from_str(&text).map_err(|err| {
            PickerError::PrefStore(format!("failed to decode selected tags: {err}"))
        })?;
        Ok(names.into_iter().collect())
    }

    fn store_selected_tags(&self, tags: &SelectedTags) -> Result<(), PickerError> {
        let names: Vec<&TagName> = tags.iter().collect();
        let json = serde_json::to_string(&names).map_err(|err| {
            PickerError::PrefStore(format!("failed to encode selected tags: {err}"))
        })?;
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)?;
        let mut staged = NamedTempFile::new_in(&dir)?;
        staged.write_all(json.as_bytes())?;
        staged
            .persist(&self.path)
            .map_err(|err| PickerError::Io(err.error))?;
        Ok(())
    }
}

/// In-memory preference store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    tags: RwLock<SelectedTags>,
}

impl MemoryPreferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load_selected_tags(&self) -> Result<SelectedTags, PickerError> {
        self.tags
            .read()
            .map_err(|_| PickerError::PrefStore("lock poisoned".into()))
            .map(|guard| guard.clone())
    }

    fn store_selected_tags(&self, tags: &SelectedTags) -> Result<(), PickerError> {
        *self
            .tags
            .write()
            .map_err(|_| PickerError::PrefStore("lock poisoned".into()))? = tags.clone();
        Ok(())
    }
}

/// Parse a comma-separated tag input into a selection set.
///
/// Trims each entry and drops empties, so `"Action, RPG,,"` selects
/// `{Action, RPG}`.
pub fn parse_tag_list(input: &str) -> SelectedTags {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(TagName::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_selection() {
        let temp = tempdir().unwrap();
        let store = FilePreferenceStore::new(temp.path().join("prefs/selected_tags.json"));

        assert!(store.load_selected_tags().unwrap().is_empty());

        let tags = parse_tag_list("RPG, Action");
        store.store_selected_tags(&tags).unwrap();
        assert_eq!(store.load_selected_tags().unwrap(), tags);
    }

    #[test]
    fn file_store_reports_corrupt_payloads() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("selected_tags.json");
        fs::write(&path, "{broken").unwrap();

        let store = FilePreferenceStore::new(&path);
        assert!(matches!(
            store.load_selected_tags(),
            Err(PickerError::PrefStore(_))
        ));
    }

    #[test]
    fn memory_store_round_trips_selection() {
        let store = MemoryPreferenceStore::new();
        let tags = parse_tag_list("Indie");
        store.store_selected_tags(&tags).unwrap();
        assert_eq!(store.load_selected_tags().unwrap(), tags);
    }

    #[test]
    fn parse_tag_list_trims_and_drops_empties() {
        let tags = parse_tag_list(" Action ,RPG,, ,Indie");
        let names: Vec<&str> = tags.iter().map(String::as_str).collect();
        assert_eq!(names, ["Action", "Indie", "RPG"]);
    }
}
