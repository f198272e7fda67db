//! Per-conversation message history, newest message first.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use missive_shared::{ActorId, ConversationId, Message, MessageId, MessageKind};

use crate::error::Result;

pub type MessageMap = BTreeMap<ConversationId, Vec<Message>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLedger {
    entries: MessageMap,
}

impl MessageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: MessageMap) -> Self {
        Self { entries }
    }

    /// Build a message from `sender` and put it at the head of the
    /// conversation's history.
    ///
    /// Text is stored as given; trimming and rejecting blank input is the
    /// caller's concern. A text message never keeps an image URL, and an
    /// image message without one is rejected before anything is stored.
    pub fn append(
        &mut self,
        conversation_id: &ConversationId,
        sender: &ActorId,
        text: &str,
        kind: MessageKind,
        image_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        let message = Message {
            id: MessageId::generate(),
            text: text.to_string(),
            sender_id: sender.clone(),
            timestamp: now,
            kind,
            image_url: match kind {
                MessageKind::Text => None,
                MessageKind::Image => image_url,
            },
        };
        message.validate()?;

        self.entries
            .entry(conversation_id.clone())
            .or_default()
            .insert(0, message.clone());

        Ok(message)
    }

    /// Newest-first history; empty when nothing was sent yet.
    pub fn messages_for(&self, conversation_id: &ConversationId) -> &[Message] {
        self.entries
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn message_count(&self, conversation_id: &ConversationId) -> usize {
        self.messages_for(conversation_id).len()
    }

    pub fn entries(&self) -> &MessageMap {
        &self.entries
    }
}
