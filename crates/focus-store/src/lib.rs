//! Storage backends implementing [`focus_core::SessionStore`].

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use focus_core::config::{StorageBackend, StorageConfig};
use focus_core::error::Result;
use focus_core::store::SessionStore;
use std::sync::Arc;

/// Open the backend selected by configuration.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn SessionStore>> {
    match config.backend {
        StorageBackend::Sqlite => {
            let path = config.resolved_path();
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
        StorageBackend::Memory => {
            tracing::info!("Using in-memory session store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
