use std::sync::Arc;

use tracing::{debug, warn};

use studyhall_db::KeyValueStore;
use studyhall_types::models::Profile;

use crate::error::AccountError;

/// Storage key holding the logged-in profile.
pub const STORAGE_KEY: &str = "session";

/// The single remembered login of a local installation.
#[derive(Clone)]
pub struct SessionSlot {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionSlot {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// A malformed session is treated as logged out.
    pub fn restore(&self) -> Result<Option<Profile>, AccountError> {
        let Some(raw) = self.storage.get(STORAGE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("Ignoring malformed session: {}", e);
                Ok(None)
            }
        }
    }

    pub fn persist(&self, profile: &Profile) -> Result<(), AccountError> {
        let json = serde_json::to_string(profile)?;
        self.storage.set(STORAGE_KEY, &json)?;
        debug!("Session stored for {}", profile.username);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AccountError> {
        self.storage.remove(STORAGE_KEY)?;
        debug!("Session cleared");
        Ok(())
    }
}
