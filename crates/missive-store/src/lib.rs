//! # missive-store
//!
//! Durable key-value storage for the Missive client.
//!
//! The crate exposes the [`DurableStore`] trait (async `get` / `set` /
//! `delete` over string keys and serialized string values) and three
//! backends: an in-process [`MemoryStore`], a directory of files
//! ([`FileStore`]) and a SQLite database ([`SqliteStore`]). [`AnyStore`]
//! picks one at runtime.

pub mod backend;
pub mod file;
pub mod memory;
pub mod migrations;
pub mod sqlite;

mod error;

use std::future::Future;

pub use backend::{AnyStore, StoreKind};
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Asynchronous key-value storage.
///
/// Implementations share their state across clones, so a handle can be moved
/// into a writer task while the caller keeps reading through another.
pub trait DurableStore: Clone + Send + Sync + 'static {
    /// Read the value stored under `key`, or `None` when the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
