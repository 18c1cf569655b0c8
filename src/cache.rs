//! Process-lifetime source cache with in-flight load de-duplication.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use tracing::debug;

use crate::errors::PickerError;
use crate::types::SourceId;

/// Lazy cache keyed by source identifier.
///
/// A slot holds either the completed value or an in-flight marker. Callers
/// that find the marker wait for the owning load instead of issuing a
/// duplicate fetch, so each source is fetched at most once per lifetime.
/// A failed load removes its marker and is never cached; waiters observe
/// the shared failure and later calls retry from scratch.
pub struct SourceCache<T> {
    slots: Mutex<HashMap<SourceId, Slot<T>>>,
    ready: Condvar,
}

enum Slot<T> {
    InFlight,
    Ready(Arc<T>),
}

impl<T> Default for SourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SourceCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ready: Condvar::new(),
        }
    }

    /// Return the cached value for `key`, loading it with `load` on a miss.
    ///
    /// Exactly one caller runs `load` for a given key at a time; concurrent
    /// callers block until that load settles and share its outcome. Errors
    /// propagate to every caller of the failed load and leave the slot
    /// empty.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<Arc<T>, PickerError>
    where
        F: FnOnce() -> Result<T, PickerError>,
    {
        let mut slots = self.slots.lock().expect("source cache poisoned");
        loop {
            match slots.get(key) {
                Some(Slot::Ready(value)) => return Ok(Arc::clone(value)),
                Some(Slot::InFlight) => {
                    slots = self.ready.wait(slots).expect("source cache poisoned");
                    match slots.get(key) {
                        Some(_) => continue,
                        None => {
                            return Err(PickerError::Fetch {
                                source_id: key.to_string(),
                                reason: "shared in-flight load failed".to_string(),
                            });
                        }
                    }
                }
                None => break,
            }
        }
        slots.insert(key.to_string(), Slot::InFlight);
        drop(slots);

        let outcome = load();

        let mut slots = self.slots.lock().expect("source cache poisoned");
        match outcome {
            Ok(value) => {
                let value = Arc::new(value);
                slots.insert(key.to_string(), Slot::Ready(Arc::clone(&value)));
                self.ready.notify_all();
                debug!(source = key, "source cached");
                Ok(value)
            }
            Err(err) => {
                slots.remove(key);
                self.ready.notify_all();
                Err(err)
            }
        }
    }

    /// Return the cached value for `key` without triggering a load.
    pub fn peek(&self, key: &str) -> Option<Arc<T>> {
        let slots = self.slots.lock().expect("source cache poisoned");
        match slots.get(key) {
            Some(Slot::Ready(value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Number of fully loaded entries.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().expect("source cache poisoned");
        slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// Returns `true` when no entry has completed loading.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_lookup_reuses_cached_value() {
        let cache: SourceCache<Vec<u64>> = SourceCache::new();
        let loads = AtomicUsize::new(0);

        let first = cache
            .get_or_load("a", || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            })
            .unwrap();
        let second = cache
            .get_or_load("a", || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(vec![9])
            })
            .unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let cache: SourceCache<Vec<u64>> = SourceCache::new();

        let failed = cache.get_or_load("a", || {
            Err(PickerError::Fetch {
                source_id: "a".to_string(),
                reason: "down".to_string(),
            })
        });
        assert!(failed.is_err());
        assert!(cache.peek("a").is_none());

        let retried = cache.get_or_load("a", || Ok(vec![7])).unwrap();
        assert_eq!(*retried, vec![7]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_lookups_share_one_load() {
        let cache: Arc<SourceCache<Vec<u64>>> = Arc::new(SourceCache::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let loads = Arc::clone(&loads);
            handles.push(thread::spawn(move || {
                cache
                    .get_or_load("shared", move || {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(25));
                        Ok(vec![5, 6])
                    })
                    .unwrap()
            }));
        }

        let results: Vec<Arc<Vec<u64>>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        for result in &results {
            assert!(Arc::ptr_eq(result, &results[0]));
        }
    }
}
