//! Directory-backed [`DurableStore`]: one file per key.

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::DurableStore;

const FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "File store initialized");

        Ok(Self { base_path })
    }

    /// Path holding `key`. Keys are escaped so they can never leave the base
    /// directory.
    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let name = format!("{}.{FILE_EXTENSION}", encode_key(key));
        Ok(self.base_path.join(name))
    }
}

/// Escape everything except ASCII alphanumerics, `-` and `_` as `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => {
                debug!(key, size = value.len(), "Read value");
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.key_path(key)?;
        // Write beside the target then rename, so readers never see a torn file.
        let tmp = path.with_extension(format!("{FILE_EXTENSION}.tmp-{}", Uuid::new_v4()));

        fs::write(&tmp, value.as_bytes()).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(key, size = value.len(), "Stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted value");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (FileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _dir) = test_store().await;
        store
            .set("messages:42", r#"{"a":[]}"#.to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get("messages:42").await.unwrap().as_deref(),
            Some(r#"{"a":[]}"#)
        );
    }

    #[tokio::test]
    async fn test_missing() {
        let (store, _dir) = test_store().await;
        assert!(store.get("conversations:nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = test_store().await;
        store.set("user", "{}".to_string()).await.unwrap();
        store.delete("user").await.unwrap();
        assert!(store.get("user").await.unwrap().is_none());
        store.delete("user").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_key_stays_inside() {
        let (store, dir) = test_store().await;
        store.set("../../etc/passwd", "x".to_string()).await.unwrap();

        let path = store.key_path("../../etc/passwd").unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.set("", "x".to_string()).await.is_err());
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("conversations:a_b"), "conversations%3Aa_b");
        assert_eq!(encode_key(".."), "%2E%2E");
    }
}
