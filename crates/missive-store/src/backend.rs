//! Runtime backend selection.

use std::path::Path;

use crate::error::{Result, StoreError};
use crate::{DurableStore, FileStore, MemoryStore, SqliteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
    Sqlite,
}

impl std::str::FromStr for StoreKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" | "files" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(StoreError::UnknownBackend(other.to_string())),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// One of the built-in backends, chosen at startup.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    File(FileStore),
    Sqlite(SqliteStore),
}

impl AnyStore {
    /// Open the backend of `kind` rooted at `data_dir`.
    pub async fn open(kind: StoreKind, data_dir: &Path) -> Result<Self> {
        let store = match kind {
            StoreKind::Memory => Self::Memory(MemoryStore::new()),
            StoreKind::File => Self::File(FileStore::new(data_dir.join("store")).await?),
            StoreKind::Sqlite => {
                tokio::fs::create_dir_all(data_dir).await?;
                let path = data_dir.join("missive.db");
                let store = tokio::task::spawn_blocking(move || SqliteStore::open_at(&path))
                    .await??;
                Self::Sqlite(store)
            }
        };
        Ok(store)
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            Self::Memory(_) => StoreKind::Memory,
            Self::File(_) => StoreKind::File,
            Self::Sqlite(_) => StoreKind::Sqlite,
        }
    }
}

impl DurableStore for AnyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Memory(s) => s.get(key).await,
            Self::File(s) => s.get(key).await,
            Self::Sqlite(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        match self {
            Self::Memory(s) => s.set(key, value).await,
            Self::File(s) => s.set(key, value).await,
            Self::Sqlite(s) => s.set(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::Memory(s) => s.delete(key).await,
            Self::File(s) => s.delete(key).await,
            Self::Sqlite(s) => s.delete(key).await,
        }
    }
}
