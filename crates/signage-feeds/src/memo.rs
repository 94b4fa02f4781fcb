use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Small keyed memo with a fixed time-to-live.
pub struct TtlMemo<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlMemo<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|(at, _)| at.elapsed() < self.ttl)
            .map(|(_, v)| v.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (at, _)| at.elapsed() < self.ttl);
        entries.insert(key.into(), (Instant::now(), value));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires() {
        let memo = TtlMemo::new(Duration::from_millis(1));
        memo.put("k", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(memo.get("k"), None);
    }

    #[test]
    fn hit_and_clear() {
        let memo = TtlMemo::new(Duration::from_secs(60));
        memo.put("k", vec![1, 2]);
        assert_eq!(memo.get("k"), Some(vec![1, 2]));
        assert_eq!(memo.get("other"), None);
        memo.clear();
        assert_eq!(memo.get("k"), None);
    }
}
