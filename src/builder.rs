//! Offline index builder.
//!
//! Consumes a raw catalog as a stream of (id, tags) pairs, so the catalog
//! is never materialized as a parsed tree, and publishes the three index
//! artifacts only after the stream is exhausted. Each artifact is written
//! to a temp file and renamed into place, so a failed build leaves no
//! partial data behind.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeSeed, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Instant;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::catalog::{TagIndex, TagSet};
use crate::constants::artifacts::{AVAILABLE_TAGS_FILE, RELEASED_IDS_FILE, TAGS_INDEX_FILE};
use crate::constants::builder::{PROGRESS_INTERVAL, TOP_TAG_REPORT_LIMIT};
use crate::errors::PickerError;
use crate::stats::{top_tags, TagCount};
use crate::types::{ItemId, TagName};

/// Raw catalog encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogFormat {
    /// One JSON object keyed by item id, streamed entry by entry.
    KeyedObject,
    /// One `{"id":..,"tags":..}` JSON object per line.
    JsonLines,
}

impl CatalogFormat {
    /// Infer the format from a file extension; `.jsonl`/`.ndjson` mean
    /// line-delimited, everything else is treated as a keyed object.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") => Self::JsonLines,
            Some(ext) if ext.eq_ignore_ascii_case("ndjson") => Self::JsonLines,
            _ => Self::KeyedObject,
        }
    }
}

/// Streaming accumulator for the inverted index and the id universe.
///
/// Observes one (id, tags) pair at a time; per-tag id order and first-seen
/// tag order are preserved until `finish` sorts the published views.
#[derive(Default)]
pub struct IndexAccumulator {
    index: TagIndex,
    ids: Vec<ItemId>,
    observed: u64,
}

impl IndexAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one catalog item.
    ///
    /// Duplicate ids are indexed independently; an untagged item only
    /// contributes to the id universe.
    pub fn observe(&mut self, id: ItemId, tags: TagSet) {
        self.ids.push(id);
        for tag in tags {
            self.index.add(tag, id);
        }
        self.observed += 1;
        if self.observed % PROGRESS_INTERVAL == 0 {
            eprintln!("[tagpick:build] processed {} items", self.observed);
        }
    }

    /// Number of items observed so far.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Seal the accumulator into publishable artifacts.
    pub fn finish(self) -> IndexArtifacts {
        let available_tags = self.index.sorted_tags();
        let mut ids = self.ids;
        ids.sort_unstable();
        IndexArtifacts {
            tag_index: self.index,
            available_tags,
            ids,
        }
    }
}

/// The three publishable index artifacts.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexArtifacts {
    /// Tag→ids inverted index, first-seen tag order, per-tag insertion order.
    pub tag_index: TagIndex,
    /// Distinct tag names, lexicographically sorted.
    pub available_tags: Vec<TagName>,
    /// Every observed id, ascending (duplicates preserved).
    pub ids: Vec<ItemId>,
}

impl IndexArtifacts {
    /// Write all artifacts into `out_dir`, creating the directory if needed.
    ///
    /// Each file is staged in a temp file inside `out_dir` and renamed into
    /// place once fully written.
    pub fn write_to(&self, out_dir: &Path) -> Result<(), PickerError> {
        fs::create_dir_all(out_dir)?;
        let index_json = serde_json::to_string(&self.tag_index).map_err(|err| {
            PickerError::Encode {
                context: TAGS_INDEX_FILE.to_string(),
                reason: err.to_string(),
            }
        })?;
        write_atomic(out_dir, TAGS_INDEX_FILE, index_json.as_bytes())?;

        let tags_json =
            serde_json::to_string(&self.available_tags).map_err(|err| PickerError::Encode {
                context: AVAILABLE_TAGS_FILE.to_string(),
                reason: err.to_string(),
            })?;
        write_atomic(out_dir, AVAILABLE_TAGS_FILE, tags_json.as_bytes())?;

        let ids_csv = self
            .ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        write_atomic(out_dir, RELEASED_IDS_FILE, ids_csv.as_bytes())?;
        Ok(())
    }
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), PickerError> {
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged
        .persist(dir.join(name))
        .map_err(|err| PickerError::Io(err.error))?;
    debug!(artifact = name, bytes = bytes.len(), "artifact published");
    Ok(())
}

/// Outcome report for a completed build.
#[derive(Clone, Debug)]
pub struct BuildSummary {
    /// Items observed in the catalog stream.
    pub items: u64,
    /// Distinct tags observed.
    pub distinct_tags: usize,
    /// Most common tags, count-descending.
    pub top_tags: Vec<TagCount>,
    /// Wall-clock time when the build started.
    pub started_at: DateTime<Utc>,
    /// Stream + publish duration in milliseconds.
    pub elapsed_ms: u128,
}

/// Build the index artifacts from `catalog_path` into `out_dir`.
///
/// Streams the catalog in `format`, then publishes the three artifacts.
/// Any decode error aborts the build before anything is written.
pub fn build(
    catalog_path: &Path,
    out_dir: &Path,
    format: CatalogFormat,
) -> Result<BuildSummary, PickerError> {
    let started_at = Utc::now();
    let timer = Instant::now();
    let reader = BufReader::new(File::open(catalog_path)?);

    let mut accumulator = IndexAccumulator::new();
    match format {
        CatalogFormat::KeyedObject => stream_keyed_object(reader, &mut accumulator)?,
        CatalogFormat::JsonLines => stream_json_lines(reader, &mut accumulator)?,
    }

    let items = accumulator.observed();
    let artifacts = accumulator.finish();
    artifacts.write_to(out_dir)?;

    Ok(BuildSummary {
        items,
        distinct_tags: artifacts.available_tags.len(),
        top_tags: top_tags(&artifacts.tag_index, TOP_TAG_REPORT_LIMIT),
        started_at,
        elapsed_ms: timer.elapsed().as_millis(),
    })
}

/// Per-item payload as it appears in raw catalogs; unknown fields ignored.
#[derive(Deserialize)]
struct RawCatalogItem {
    #[serde(default)]
    tags: TagSet,
}

/// One line of a line-delimited catalog.
#[derive(Deserialize)]
struct RawCatalogLine {
    id: ItemId,
    #[serde(default)]
    tags: TagSet,
}

/// Stream a keyed catalog object entry-by-entry into `accumulator`.
///
/// Decoding happens through a map visitor, so each entry is handed to the
/// accumulator and dropped before the next one is parsed.
pub fn stream_keyed_object<R: BufRead>(
    reader: R,
    accumulator: &mut IndexAccumulator,
) -> Result<(), PickerError> {
    struct CatalogSeed<'a> {
        accumulator: &'a mut IndexAccumulator,
    }

    impl<'de, 'a> DeserializeSeed<'de> for CatalogSeed<'a> {
        type Value = ();

        fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_map(CatalogVisitor {
                accumulator: self.accumulator,
            })
        }
    }

    struct CatalogVisitor<'a> {
        accumulator: &'a mut IndexAccumulator,
    }

    impl<'de, 'a> Visitor<'de> for CatalogVisitor<'a> {
        type Value = ();

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a catalog object keyed by numeric item id")
        }

        fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
        where
            A: MapAccess<'de>,
        {
            while let Some(key) = map.next_key::<String>()? {
                let id: ItemId = key.trim().parse().map_err(|_| {
                    serde::de::Error::custom(format!("invalid item id key '{key}'"))
                })?;
                let item: RawCatalogItem = map.next_value()?;
                self.accumulator.observe(id, item.tags);
            }
            Ok(())
        }
    }

    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    CatalogSeed { accumulator }
        .deserialize(&mut deserializer)
        .map_err(|err| PickerError::Decode {
            context: "catalog stream".to_string(),
            reason: err.to_string(),
        })?;
    deserializer.end().map_err(|err| PickerError::Decode {
        context: "catalog stream".to_string(),
        reason: err.to_string(),
    })
}

/// Stream a line-delimited catalog into `accumulator`.
pub fn stream_json_lines<R: BufRead>(
    reader: R,
    accumulator: &mut IndexAccumulator,
) -> Result<(), PickerError> {
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: RawCatalogLine =
            serde_json::from_str(&line).map_err(|err| PickerError::Decode {
                context: format!("catalog line {}", line_idx + 1),
                reason: err.to_string(),
            })?;
        accumulator.observe(entry.id, entry.tags);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn accumulator_preserves_duplicates_and_untagged_items() {
        let mut accumulator = IndexAccumulator::new();
        accumulator.observe(30, TagSet::from_names(vec!["B".to_string()]));
        accumulator.observe(10, TagSet::default());
        accumulator.observe(30, TagSet::from_names(vec!["B".to_string()]));

        let artifacts = accumulator.finish();
        assert_eq!(artifacts.ids, [10, 30, 30]);
        assert_eq!(artifacts.tag_index.ids_for("B"), [30, 30]);
        assert_eq!(artifacts.available_tags, ["B"]);
    }

    #[test]
    fn keyed_object_streams_entries_in_order() {
        let raw = r#"{"20":{"name":"x","tags":{"Action":12,"Indie":3}},"7":{"tags":["Action"]},"9":{}}"#;
        let mut accumulator = IndexAccumulator::new();
        stream_keyed_object(Cursor::new(raw), &mut accumulator).unwrap();

        let artifacts = accumulator.finish();
        assert_eq!(artifacts.ids, [7, 9, 20]);
        assert_eq!(artifacts.tag_index.ids_for("Action"), [20, 7]);
        assert_eq!(artifacts.tag_index.ids_for("Indie"), [20]);
    }

    #[test]
    fn keyed_object_rejects_non_numeric_keys() {
        let raw = r#"{"not-an-id":{"tags":[]}}"#;
        let mut accumulator = IndexAccumulator::new();
        let result = stream_keyed_object(Cursor::new(raw), &mut accumulator);
        assert!(matches!(result, Err(PickerError::Decode { .. })));
    }

    #[test]
    fn json_lines_skips_blanks_and_reports_bad_lines() {
        let raw = "{\"id\":1,\"tags\":[\"A\"]}\n\n{\"id\":2}\n";
        let mut accumulator = IndexAccumulator::new();
        stream_json_lines(Cursor::new(raw), &mut accumulator).unwrap();
        assert_eq!(accumulator.observed(), 2);

        let bad = "{\"id\":1}\nnot json\n";
        let mut accumulator = IndexAccumulator::new();
        let result = stream_json_lines(Cursor::new(bad), &mut accumulator);
        assert!(matches!(result, Err(PickerError::Decode { context, .. }) if context.contains("line 2")));
    }

    #[test]
    fn format_detection_prefers_extension() {
        assert_eq!(
            CatalogFormat::detect(Path::new("catalog.jsonl")),
            CatalogFormat::JsonLines
        );
        assert_eq!(
            CatalogFormat::detect(Path::new("catalog.NDJSON")),
            CatalogFormat::JsonLines
        );
        assert_eq!(
            CatalogFormat::detect(Path::new("games.json")),
            CatalogFormat::KeyedObject
        );
    }
}
