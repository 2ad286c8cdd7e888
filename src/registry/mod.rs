pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryConnectionStore;
pub use sqlite::SqliteConnectionStore;
pub use traits::{ConnectionRecord, ConnectionStore, StoreError};

use crate::config::RegistryConfig;
use std::path::Path;

/// Factory: create the right connection store from config
pub fn create_store(
    config: &RegistryConfig,
    workspace_dir: &Path,
) -> anyhow::Result<Box<dyn ConnectionStore>> {
    match config.backend.trim().to_ascii_lowercase().as_str() {
        "sqlite" => Ok(Box::new(SqliteConnectionStore::new(workspace_dir)?)),
        "memory" => Ok(Box::new(InMemoryConnectionStore::new())),
        other if other.is_empty() => {
            anyhow::bail!("registry.backend cannot be empty. Supported values: sqlite, memory")
        }
        other => anyhow::bail!(
            "Unknown registry backend '{other}'. Supported values: sqlite, memory"
        ),
    }
}
