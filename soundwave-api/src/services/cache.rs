//! In-memory TTL cache for discovery responses
//!
//! Keeps upstream provider traffic down for repeated queries. Entries
//! expire after a fixed TTL; expired entries are evicted on read.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Thread-safe TTL cache keyed by string
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a fresh entry, evicting it if expired
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((inserted_at, value)) if inserted_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value under the key, resetting its TTL
    pub fn set(&self, key: &str, value: T) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (Instant::now(), value));
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
