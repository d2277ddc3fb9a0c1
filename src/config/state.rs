// Application state module
// One instance per process, shared across all connections

use super::types::Config;
use crate::storage::MediaStore;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub store: MediaStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = MediaStore::new(config.storage.media_root.as_str());
        Self { config, store }
    }

    /// Whether access logging is enabled
    pub fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
