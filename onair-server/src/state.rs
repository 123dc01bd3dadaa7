use onair_core::Clock;
use onair_relay::{MemoryRoleDirectory, MemorySignalStore};
use std::sync::Arc;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemorySignalStore>,
    pub directory: Arc<MemoryRoleDirectory>,
}

impl AppState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(MemorySignalStore::new(clock)),
            directory: Arc::new(MemoryRoleDirectory::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            store: Arc::new(MemorySignalStore::default()),
            directory: Arc::new(MemoryRoleDirectory::new()),
        }
    }
}
