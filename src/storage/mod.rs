//! Persistence layer.
//!
//! Journey logs are stored as JSON snapshots under their fingerprint key in
//! any key/value backend implementing `JourneyStore`. Loading never fails:
//! a missing, unreadable or corrupt snapshot yields an empty journey. Save
//! failures are reported to the caller, whose in-memory log is unaffected.

pub mod file;
pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{StorageBackend, StorageConfig};
use crate::journey::{Fingerprint, JourneyLog};
use crate::types::StakeError;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key/value storage for journey snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Fetch the payload stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `payload` under `key`, replacing any previous value.
    async fn set(&self, key: &str, payload: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Load the journey for `fingerprint`, falling back to an empty log.
pub async fn load_journey(store: &dyn JourneyStore, fingerprint: &Fingerprint) -> JourneyLog {
    let key = fingerprint.key();
    let payload = match store.get(&key).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            debug!(key = %key, store = store.name(), "No saved journey, starting fresh");
            return JourneyLog::default();
        }
        Err(e) => {
            warn!(key = %key, store = store.name(), error = %e, "Failed to read journey; starting fresh");
            return JourneyLog::default();
        }
    };

    match serde_json::from_str::<JourneyLog>(&payload) {
        Ok(log) => {
            info!(
                key = %key,
                entries_a = log.book_a.entries.len(),
                entries_b = log.book_b.entries.len(),
                "Journey loaded"
            );
            log
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to parse saved journey; starting fresh");
            JourneyLog::default()
        }
    }
}

/// Persist `log` under `fingerprint`.
pub async fn save_journey(
    store: &dyn JourneyStore,
    fingerprint: &Fingerprint,
    log: &JourneyLog,
) -> Result<(), StakeError> {
    let key = fingerprint.key();
    let payload = serde_json::to_string(log)
        .map_err(|e| StakeError::Storage(format!("Failed to serialise journey {key}: {e}")))?;

    store
        .set(&key, &payload)
        .await
        .map_err(|e| StakeError::Storage(format!("Failed to save journey {key}: {e:#}")))?;

    debug!(key = %key, store = store.name(), bytes = payload.len(), "Journey saved");
    Ok(())
}

/// Reset `log` and drop its snapshot from the store.
///
/// The in-memory log is cleared even when the store delete fails.
pub async fn clear_journey(
    store: &dyn JourneyStore,
    fingerprint: &Fingerprint,
    log: &mut JourneyLog,
) -> Result<(), StakeError> {
    log.clear();
    let key = fingerprint.key();
    store
        .remove(&key)
        .await
        .map_err(|e| StakeError::Storage(format!("Failed to delete journey {key}: {e:#}")))
}

/// Build the backend selected in configuration.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn JourneyStore>> {
    let store: Arc<dyn JourneyStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::default()),
        StorageBackend::File => Arc::new(JsonFileStore::new(&config.path)?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::connect(&config.path).await?),
    };
    info!(store = store.name(), path = %config.path, "Journey store opened");
    Ok(store)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
