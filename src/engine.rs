//! Online selection engine.
//!
//! Ownership model:
//! - the engine owns its caches; two engine instances share nothing.
//! - the `FetchSource` collaborator is injected and shared via `Arc`.
//! - the caller owns the selected-tag set and passes it per query.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::cache::SourceCache;
use crate::catalog::{parse_id_lines, TagIndex};
use crate::config::{EngineConfig, Strategy};
use crate::errors::PickerError;
use crate::source::FetchSource;
use crate::types::{ItemId, SelectedTags};

/// Tag-filtered random item selection over pre-built index artifacts.
///
/// Every operation degrades instead of failing: an unreachable source loads
/// as empty, an over-restrictive filter falls back along the documented
/// chain, and only an empty unfiltered catalog produces `None`.
pub struct SelectionEngine {
    fetcher: Arc<dyn FetchSource>,
    config: EngineConfig,
    id_lists: SourceCache<Vec<ItemId>>,
    tag_index: SourceCache<TagIndex>,
    rng: Mutex<StdRng>,
}

impl SelectionEngine {
    /// Create an engine over `fetcher` with `config`.
    pub fn new(fetcher: Arc<dyn FetchSource>, config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        debug!(
            fetcher = fetcher.id(),
            catalog = %config.catalog_source,
            batches = config.batch_sources.len(),
            "selection engine created"
        );
        Self {
            fetcher,
            config,
            id_lists: SourceCache::new(),
            tag_index: SourceCache::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Active engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cached decoded id sequence for `source`.
    ///
    /// Fetches and decodes at most once per source; concurrent callers join
    /// the same in-flight load. A failed load logs a warning and yields an
    /// empty sequence without caching, so the next call retries.
    pub fn load_ids(&self, source: &str) -> Arc<Vec<ItemId>> {
        let fetcher = Arc::clone(&self.fetcher);
        match self.id_lists.get_or_load(source, || {
            let text = fetcher.fetch(source)?;
            Ok(parse_id_lines(&text))
        }) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(source, error = %err, "id list load failed, treating as empty");
                Arc::new(Vec::new())
            }
        }
    }

    /// Cached tag→ids index.
    ///
    /// A failed load logs a warning and yields an empty index (every tag
    /// lookup then matches nothing) without caching the failure.
    pub fn load_tag_index(&self) -> Arc<TagIndex> {
        let fetcher = Arc::clone(&self.fetcher);
        let source = self.config.tags_index_source.as_str();
        match self.tag_index.get_or_load(source, || {
            let text = fetcher.fetch(source)?;
            serde_json::from_str::<TagIndex>(&text).map_err(|err| PickerError::Decode {
                context: source.to_string(),
                reason: err.to_string(),
            })
        }) {
            Ok(index) => index,
            Err(err) => {
                warn!(source, error = %err, "tag index load failed, treating as empty");
                Arc::new(TagIndex::new())
            }
        }
    }

    /// Restrict `ids` to items bearing every tag in `selected`.
    ///
    /// An empty selection is the identity and never touches the tag index.
    /// Unknown tags resolve to the empty set, so any unknown tag empties
    /// the result. Output preserves the order of `ids`.
    pub fn filter_by_tags(&self, ids: &[ItemId], selected: &SelectedTags) -> Vec<ItemId> {
        if selected.is_empty() {
            return ids.to_vec();
        }
        let index = self.load_tag_index();
        let tag_sets: Vec<HashSet<ItemId>> = selected
            .iter()
            .map(|tag| index.ids_for(tag).iter().copied().collect())
            .collect();
        let filtered: Vec<ItemId> = ids
            .iter()
            .copied()
            .filter(|id| tag_sets.iter().all(|set| set.contains(id)))
            .collect();
        debug!(
            input = ids.len(),
            matched = filtered.len(),
            tags = ?selected,
            "applied tag filter"
        );
        filtered
    }

    /// Uniform pick from `ids`, or `None` for an empty sequence.
    pub fn pick_random(&self, ids: &[ItemId]) -> Option<ItemId> {
        let mut rng = self.rng.lock().expect("engine rng poisoned");
        ids.choose(&mut *rng).copied()
    }

    /// Uniform strategy: filtered pick over the full catalog snapshot.
    ///
    /// When the filter eliminates every candidate, falls back to an
    /// unfiltered pick; returns `None` only when the catalog itself is
    /// empty or unreachable.
    pub fn select_uniform(&self, selected: &SelectedTags) -> Option<ItemId> {
        let ids = self.load_ids(&self.config.catalog_source);
        let filtered = self.filter_by_tags(&ids, selected);
        if filtered.is_empty() {
            if !selected.is_empty() {
                warn!(tags = ?selected, "no catalog items match selection, picking unfiltered");
            }
            return self.pick_random(&ids);
        }
        self.pick_random(&filtered)
    }

    /// Stratified strategy: pick a batch uniformly, then an item within it.
    ///
    /// With no batches configured this is exactly `select_uniform`. An empty
    /// or fully filtered-out batch falls back to `select_uniform` with the
    /// same selection still applied; the filter is only dropped inside that
    /// nested call's own fallback.
    pub fn select_stratified(&self, selected: &SelectedTags) -> Option<ItemId> {
        let batch = {
            let mut rng = self.rng.lock().expect("engine rng poisoned");
            self.config.batch_sources.choose(&mut *rng).cloned()
        };
        let Some(batch) = batch else {
            return self.select_uniform(selected);
        };
        let ids = self.load_ids(&batch);
        let filtered = self.filter_by_tags(&ids, selected);
        if !filtered.is_empty() {
            debug!(batch = %batch, matched = filtered.len(), "stratified pick from batch");
            return self.pick_random(&filtered);
        }
        debug!(batch = %batch, "batch empty after filtering, falling back to uniform");
        self.select_uniform(selected)
    }

    /// Dispatch to the selection operation for `strategy`.
    ///
    /// A final `None` means the unfiltered catalog is empty or unreachable;
    /// resolving that with a hardcoded default id is the caller's job.
    pub fn select_by_strategy(&self, strategy: Strategy, selected: &SelectedTags) -> Option<ItemId> {
        match strategy {
            Strategy::Uniform => self.select_uniform(selected),
            Strategy::Stratified => self.select_stratified(selected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryFetcher;
    use crate::types::TagName;
    use std::collections::BTreeSet;

    fn engine_with(fetcher: Arc<InMemoryFetcher>, batches: Vec<String>) -> SelectionEngine {
        let config = EngineConfig {
            batch_sources: batches,
            seed: Some(42),
            ..EngineConfig::default()
        };
        SelectionEngine::new(fetcher, config)
    }

    fn tags(names: &[&str]) -> BTreeSet<TagName> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn filter_with_empty_selection_is_identity() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        let engine = engine_with(Arc::clone(&fetcher), Vec::new());

        let ids = vec![3, 1, 2];
        assert_eq!(engine.filter_by_tags(&ids, &tags(&[])), ids);
        // The identity fast path must not reach for the tag index at all.
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[test]
    fn filter_intersects_tag_sets_preserving_order() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        fetcher.insert("data/tags_index.json", r#"{"A":[1,2],"B":[2,3]}"#);
        let engine = engine_with(fetcher, Vec::new());

        assert_eq!(engine.filter_by_tags(&[1, 2, 3], &tags(&["A", "B"])), [2]);
        assert_eq!(engine.filter_by_tags(&[3, 2, 1], &tags(&["A"])), [2, 1]);
        assert!(engine
            .filter_by_tags(&[1, 2, 3], &tags(&["A", "Unknown"]))
            .is_empty());
    }

    #[test]
    fn tag_index_is_fetched_once() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        fetcher.insert("data/tags_index.json", r#"{"A":[1]}"#);
        let engine = engine_with(Arc::clone(&fetcher), Vec::new());

        engine.filter_by_tags(&[1, 2], &tags(&["A"]));
        engine.filter_by_tags(&[1, 2], &tags(&["A"]));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[test]
    fn malformed_tag_index_degrades_to_empty_and_retries() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        fetcher.insert("data/tags_index.json", "{not json");
        let engine = engine_with(Arc::clone(&fetcher), Vec::new());

        assert!(engine.load_tag_index().is_empty());

        fetcher.insert("data/tags_index.json", r#"{"A":[1]}"#);
        let recovered = engine.load_tag_index();
        assert_eq!(recovered.ids_for("A"), [1]);
    }

    #[test]
    fn pick_random_returns_member_or_none() {
        let engine = engine_with(Arc::new(InMemoryFetcher::new()), Vec::new());
        assert_eq!(engine.pick_random(&[]), None);
        let ids = [10, 20, 30];
        for _ in 0..50 {
            let picked = engine.pick_random(&ids).unwrap();
            assert!(ids.contains(&picked));
        }
    }

    #[test]
    fn failed_id_load_is_retried_on_next_call() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        let engine = engine_with(Arc::clone(&fetcher), Vec::new());

        assert!(engine.load_ids("data/ids.csv").is_empty());

        // Register the source after the failed attempt; the cache must not
        // have memoized the failure.
        fetcher.insert("data/ids.csv", "4\n5");
        assert_eq!(*engine.load_ids("data/ids.csv"), vec![4, 5]);
        assert_eq!(fetcher.fetch_count(), 2);
    }
}
