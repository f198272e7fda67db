//! # missive-shared
//!
//! Identifiers, domain models and constants shared by every Missive crate.

pub mod constants;
pub mod error;
pub mod models;
pub mod types;

pub use error::ModelError;
pub use models::{Actor, Conversation, LastMessage, Message, ParticipantDetail};
pub use types::{ActorId, ConversationId, MessageId, MessageKind};
