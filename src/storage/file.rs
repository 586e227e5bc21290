//! JSON-file journey store: one `<key>.json` file per journey in a directory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::JourneyStore;

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) the snapshot directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create journey directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl JourneyStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn set(&self, key: &str, payload: &str) -> Result<()> {
        let path = self.path_for(key);
        tokio::fs::write(&path, payload)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Snapshot written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("stakeplan_test_journeys_{}", uuid::Uuid::new_v4()));
        p
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = temp_dir();
        let store = JsonFileStore::new(&dir).unwrap();

        store.set("betting-journey-1.6-2.35-15000", "{}").await.unwrap();
        let loaded = store.get("betting-journey-1.6-2.35-15000").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("{}"));
        assert!(dir.join("betting-journey-1.6-2.35-15000.json").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = temp_dir();
        let store = JsonFileStore::new(&dir).unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = temp_dir();
        let store = JsonFileStore::new(&dir).unwrap();
        store.set("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        store.remove("k").await.unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_path_sanitised() {
        let dir = temp_dir();
        let store = JsonFileStore::new(&dir).unwrap();
        let path = store.path_for("../etc/passwd");
        assert_eq!(path.file_name().unwrap(), ".._etc_passwd.json");
        assert_eq!(path.parent().unwrap(), dir.as_path());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
