use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (file backend, creating directories).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// The key cannot be stored by this backend.
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// The configured backend name is not recognized.
    #[error("Unknown store backend: {0:?}")]
    UnknownBackend(String),

    /// The backend refused the operation (poisoned lock, injected failure).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A blocking worker task panicked or was cancelled.
    #[error("Store worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
