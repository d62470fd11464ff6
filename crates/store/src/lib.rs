//! Storage backend implementations for taskling.
//!
//! Each backend implements both [`taskling_core::TaskStore`] and
//! [`taskling_core::ConversationStore`] over a single database.
//! [`build_from_config`] selects and initializes the backend named in
//! `[store]` configuration.

use std::sync::Arc;

use taskling_core::error::StoreError;
use taskling_core::store::{ConversationStore, TaskStore};

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Build the configured backend and hand it back as its two trait handles.
///
/// Both handles point at the same instance, so tasks and conversations share
/// one database. Backends compiled out by feature flags fall through to the
/// unsupported-backend error.
pub async fn build_from_config(
    config: &taskling_config::StoreConfig,
) -> Result<(Arc<dyn TaskStore>, Arc<dyn ConversationStore>), StoreError> {
    match config.backend.as_str() {
        "memory" => {
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.resolved_sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            let store = Arc::new(SqliteStore::new(&path.to_string_lossy()).await?);
            Ok((store.clone(), store))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                StoreError::Storage(
                    "store.backend = \"postgres\" requires store.database_url".into(),
                )
            })?;
            let store = PgStore::connect(url).await?;
            store.migrate().await?;
            let store = Arc::new(store);
            Ok((store.clone(), store))
        }
        other => Err(StoreError::Storage(format!(
            "unsupported store backend \"{other}\""
        ))),
    }
}
