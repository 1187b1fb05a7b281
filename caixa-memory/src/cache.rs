use std::collections::HashMap;

use parking_lot::Mutex;

use caixa_core::LocalCache;

/// In-memory process-local cache.
pub struct MemoryLocalCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryLocalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCache for MemoryLocalCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
