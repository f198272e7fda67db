//! Domain models shared by the store, the client session and the UI layer.
//!
//! Every struct derives `Serialize` and `Deserialize`; the serialized field
//! names (camelCase, `photoURL`, `type`) are the on-disk format, so renaming a
//! field here is a storage migration.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::IMAGE_PLACEHOLDER;
use crate::error::ModelError;
use crate::types::{ActorId, ConversationId, MessageId, MessageKind};

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// A user identity participating in conversations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Stable identifier; the only key used to locate the actor's state.
    pub id: ActorId,
    /// Sign-in address, when the identity provider knows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: display_name.into(),
            photo_url: None,
            is_online: true,
            last_seen: Utc::now(),
        }
    }

    /// The profile snapshot embedded in a conversation.
    pub fn participant_detail(&self) -> ParticipantDetail {
        ParticipantDetail {
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            is_online: self.is_online,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetail {
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub is_online: bool,
}

/// Summary of the most recent message, shown in the conversation list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Empty until the first message is sent.
    pub sender_id: ActorId,
}

impl LastMessage {
    /// Placeholder for a conversation nobody has written in yet.
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            text: String::new(),
            timestamp: at,
            sender_id: ActorId::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A two-party messaging thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Sorted join of the two participant ids.
    pub id: ConversationId,
    /// Initiator first.
    pub participants: [ActorId; 2],
    pub participant_details: BTreeMap<ActorId, ParticipantDetail>,
    pub last_message: LastMessage,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a fresh, never-messaged conversation between two actors.
    pub fn between(current: &Actor, other: &Actor, now: DateTime<Utc>) -> Self {
        let mut participant_details = BTreeMap::new();
        participant_details.insert(current.id.clone(), current.participant_detail());
        participant_details.insert(other.id.clone(), other.participant_detail());

        Self {
            id: ConversationId::between(&current.id, &other.id),
            participants: [current.id.clone(), other.id.clone()],
            participant_details,
            last_message: LastMessage::empty(now),
            created_at: now,
        }
    }

    /// The participant that is not `me`. Falls back to the second slot for
    /// self-conversations.
    pub fn other_participant(&self, me: &ActorId) -> &ActorId {
        if &self.participants[0] == me {
            &self.participants[1]
        } else {
            &self.participants[0]
        }
    }

    pub fn has_messages(&self) -> bool {
        !self.last_message.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender_id: ActorId,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Set for image messages only.
    pub image_url: Option<String>,
}

impl Message {
    pub fn text(sender_id: ActorId, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            sender_id,
            timestamp: at,
            kind: MessageKind::Text,
            image_url: None,
        }
    }

    pub fn image(sender_id: ActorId, image_url: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            text: String::new(),
            sender_id,
            timestamp: at,
            kind: MessageKind::Image,
            image_url: Some(image_url.into()),
        }
    }

    /// Check the kind / image URL pairing.
    pub fn validate(&self) -> Result<(), ModelError> {
        match (self.kind, &self.image_url) {
            (MessageKind::Image, None) => Err(ModelError::MissingImageUrl(self.id.to_string())),
            (MessageKind::Text, Some(_)) => {
                Err(ModelError::UnexpectedImageUrl(self.id.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Text shown in the conversation list for this message.
    pub fn summary(&self) -> &str {
        match self.kind {
            MessageKind::Image => IMAGE_PLACEHOLDER,
            MessageKind::Text => &self.text,
        }
    }
}
