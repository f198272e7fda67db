//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client can start with zero
//! configuration.

use std::path::{Path, PathBuf};

use missive_shared::constants::DEFAULT_WRITE_QUEUE_CAPACITY;
use missive_shared::Actor;
use missive_store::{AnyStore, StoreKind};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Durable store backend.
    /// Env: `MISSIVE_STORE` (`memory`, `file`, `sqlite`)
    /// Default: `sqlite`
    pub store_kind: StoreKind,

    /// Directory holding the store's files.
    /// Env: `MISSIVE_DATA_DIR`
    /// Default: the platform data directory, else `./missive-data`.
    pub data_dir: PathBuf,

    /// Capacity of the per-actor write queue.
    /// Env: `MISSIVE_WRITE_QUEUE`
    /// Default: `64`
    pub write_queue_capacity: usize,

    /// JSON file listing the contactable actors.
    /// Env: `MISSIVE_DIRECTORY`
    /// Default: none (built-in sample directory).
    pub directory_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_kind: StoreKind::Sqlite,
            data_dir: missive_store::sqlite::default_data_dir()
                .unwrap_or_else(|_| PathBuf::from("./missive-data")),
            write_queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
            directory_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(kind) = lookup("MISSIVE_STORE") {
            match kind.parse::<StoreKind>() {
                Ok(parsed) => config.store_kind = parsed,
                Err(e) => {
                    tracing::warn!(value = %kind, error = %e, "Invalid MISSIVE_STORE, using default");
                }
            }
        }

        if let Some(dir) = lookup("MISSIVE_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Some(val) = lookup("MISSIVE_WRITE_QUEUE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.write_queue_capacity = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid MISSIVE_WRITE_QUEUE, using default");
                }
            }
        }

        if let Some(path) = lookup("MISSIVE_DIRECTORY") {
            if !path.trim().is_empty() {
                config.directory_path = Some(PathBuf::from(path));
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    /// Open the configured durable store.
    pub async fn open_store(&self) -> Result<AnyStore> {
        let store = AnyStore::open(self.store_kind, &self.data_dir).await?;
        tracing::info!(
            backend = %self.store_kind,
            path = %self.data_dir.display(),
            "Durable store ready"
        );
        Ok(store)
    }

    /// Read the actor directory file, if one is configured.
    pub async fn load_directory(&self) -> Result<Option<Vec<Actor>>> {
        match &self.directory_path {
            Some(path) => read_directory(path).await.map(Some),
            None => Ok(None),
        }
    }
}

async fn read_directory(path: &Path) -> Result<Vec<Actor>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ClientError::Directory {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_str(&raw)?)
}
