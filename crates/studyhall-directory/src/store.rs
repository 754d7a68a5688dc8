use std::sync::Arc;

use tracing::{debug, warn};

use studyhall_db::KeyValueStore;
use studyhall_types::models::Directory;

use crate::error::DirectoryError;

/// Storage key holding the serialized directory.
pub const STORAGE_KEY: &str = "study_groups";

/// Reads and writes the whole directory as one document.
#[derive(Clone)]
pub struct PersistedStore {
    storage: Arc<dyn KeyValueStore>,
}

impl PersistedStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Absent and malformed documents both load as an empty directory.
    pub fn load(&self) -> Result<Directory, DirectoryError> {
        let Some(raw) = self.storage.get(STORAGE_KEY)? else {
            debug!("No stored directory, starting empty");
            return Ok(Directory::default());
        };

        match serde_json::from_str::<Directory>(&raw) {
            Ok(directory) => {
                debug!("Loaded directory with {} groups", directory.len());
                Ok(directory)
            }
            Err(e) => {
                warn!("Ignoring malformed directory under '{}': {}", STORAGE_KEY, e);
                Ok(Directory::default())
            }
        }
    }

    /// Unconditional overwrite.
    pub fn save(&self, directory: &Directory) -> Result<(), DirectoryError> {
        let json = serde_json::to_string(directory)?;
        self.storage.set(STORAGE_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use studyhall_db::MemoryStore;
    use studyhall_types::models::{Group, Message};
    use uuid::Uuid;

    fn sample_directory() -> Directory {
        Directory::new(vec![Group {
            id: Uuid::new_v4(),
            subject: "Thermodynamics".into(),
            description: "Weekly problem sets".into(),
            creator_id: "ana@example.com".into(),
            members: vec!["ana@example.com".into(), "ben@example.com".into()],
            messages: vec![Message {
                id: Uuid::new_v4(),
                sender_id: "ben@example.com".into(),
                text: "Entropy question on 3b".into(),
                timestamp: Utc::now(),
                important: true,
            }],
        }])
    }

    #[test]
    fn empty_storage_loads_empty_directory() {
        let store = PersistedStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_returns_same_directory() {
        let store = PersistedStore::new(Arc::new(MemoryStore::new()));
        let directory = sample_directory();

        store.save(&directory).unwrap();
        assert_eq!(store.load().unwrap(), directory);
    }

    #[test]
    fn malformed_document_loads_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(STORAGE_KEY, "{not json").unwrap();

        let store = PersistedStore::new(storage);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_overwrites_unconditionally() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = PersistedStore::new(storage.clone());
        let second = PersistedStore::new(storage);

        first.save(&sample_directory()).unwrap();
        second.save(&Directory::default()).unwrap();

        assert!(first.load().unwrap().is_empty());
    }
}
