use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::table::Table;

/// Tables returned by one batched read, keyed by worksheet name.
pub type TableSet = HashMap<String, Table>;

struct Entry {
    fetched_at: Instant,
    tables: TableSet,
}

/// Process-wide memo of batched reads.
///
/// Entries are keyed by the exact ordered list of requested tables and expire
/// after `ttl`. The store clears the whole cache after every write. Each
/// clear bumps a generation; a read started under an older generation is not
/// stored, so a fetch that straddles a write cannot repopulate the cache
/// with pre-write data.
pub struct BatchCache {
    ttl: Duration,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    generation: u64,
    entries: HashMap<Vec<String>, Entry>,
}

impl BatchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(State::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Token to take before fetching and hand back to [`put`](Self::put).
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn get(&self, key: &[String]) -> Option<TableSet> {
        let mut state = self.lock();
        match state.entries.get(key) {
            Some(e) if e.fetched_at.elapsed() < self.ttl => Some(e.tables.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `tables` fetched under `generation`. Returns false when the
    /// cache was cleared since then (or caching is off) and nothing was kept.
    pub fn put(&self, key: Vec<String>, tables: TableSet, generation: u64) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.entries.insert(
            key,
            Entry {
                fetched_at: Instant::now(),
                tables,
            },
        );
        true
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn hit_then_clear() {
        let cache = BatchCache::new(Duration::from_secs(60));
        let mut set = TableSet::new();
        set.insert("news".into(), Table::default_for("news"));
        cache.put(key(&["news"]), set, cache.generation());

        assert!(cache.get(&key(&["news"])).is_some());
        // Key is the ordered request, not the set of names.
        assert!(cache.get(&key(&["news", "videos"])).is_none());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key(&["news"])).is_none());
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = BatchCache::new(Duration::from_millis(1));
        cache.put(key(&["news"]), TableSet::new(), cache.generation());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key(&["news"])).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = BatchCache::new(Duration::ZERO);
        cache.put(key(&["news"]), TableSet::new(), cache.generation());
        assert!(cache.is_empty());
    }

    #[test]
    fn reads_started_before_a_clear_are_not_kept() {
        let cache = BatchCache::new(Duration::from_secs(60));
        let started = cache.generation();
        cache.clear();
        assert!(!cache.put(key(&["news"]), TableSet::new(), started));
        assert!(cache.is_empty());

        assert!(cache.put(key(&["news"]), TableSet::new(), cache.generation()));
        assert_eq!(cache.len(), 1);
    }
}
