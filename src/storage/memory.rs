//! In-memory journey store. Contents vanish with the process.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::JourneyStore;

#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Number of stored snapshots.
    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.map.read().await.is_empty()
    }
}

#[async_trait]
impl JourneyStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, payload: &str) -> Result<()> {
        self.map
            .write()
            .await
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.map.write().await.remove(key);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::default();
        assert!(store.is_empty().await);

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len().await, 1);

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        // Removing again is fine.
        store.remove("k").await.unwrap();
    }
}
