use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;

use crate::KeyValueStore;

/// In-process store with the same contract as the SQLite one. Used by tests
/// and by embedders that do not want a file on disk.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|e| anyhow::anyhow!("store lock poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| anyhow::anyhow!("store lock poisoned: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| anyhow::anyhow!("store lock poisoned: {}", e))?;
        entries.remove(key);
        Ok(())
    }
}
