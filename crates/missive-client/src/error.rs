use std::path::PathBuf;

use thiserror::Error;

use missive_shared::{ConversationId, ModelError};
use missive_store::StoreError;

/// Errors surfaced by the chat session.
///
/// Store failures during write-through never reach the caller; they are
/// logged by the persistence bridge. `Store` only appears from operations
/// that own their storage call, such as identity sign-in.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("No active actor")]
    NoActiveActor,

    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Image URI is empty")]
    EmptyImageUri,

    #[error("Failed to read actor directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] ModelError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
