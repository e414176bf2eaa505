use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use log::debug;

/// Time bounded cache for upstream response bodies. Entries are evicted when read after
/// their time to live has passed.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl ResponseCache {
    /// Returns a new, empty cache
    ///
    /// # Arguments
    ///
    /// * 'ttl' - time to live for each entry
    pub fn new(ttl: Duration) -> ResponseCache {
        ResponseCache { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Returns the cached body for the key if it is still fresh
    ///
    /// # Arguments
    ///
    /// * 'key' - the request key
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let found = entries.get(key).map(|(stored, body)| (stored.elapsed() < self.ttl, body.clone()));
        match found {
            Some((true, body)) => Some(body),
            Some((false, _)) => {
                debug!("cache entry expired: {}", key);
                entries.remove(key);
                None
            },
            None => None,
        }
    }

    /// Stores a body under the key, sweeping out expired entries
    ///
    /// # Arguments
    ///
    /// * 'key' - the request key
    /// * 'body' - the response body
    pub fn put(&self, key: String, body: String) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        if entries.len() < before {
            debug!("swept {} expired cache entries", before - entries.len());
        }
        entries.insert(key, (Instant::now(), body));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_fresh_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.put("a".to_string(), "body".to_string());
        assert_eq!(cache.get("a"), Some("body".to_string()));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.put("a".to_string(), "body".to_string());
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn put_sweeps_expired_entries() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.put("2025-03-01".to_string(), "old".to_string());
        cache.put("2025-03-02".to_string(), "old".to_string());
        std::thread::sleep(Duration::from_millis(30));
        cache.put("2025-03-03".to_string(), "new".to_string());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("2025-03-03"), Some("new".to_string()));
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.put("a".to_string(), "body".to_string());
        assert_eq!(cache.get("a"), None);
    }
}
