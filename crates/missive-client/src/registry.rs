//! The current actor's set of conversations.
//!
//! Conversations are identified by their participant pair, created lazily on
//! first contact, and kept sorted by the timestamp of their last message
//! (newest first). The registry is pure in-memory state; persisting it is the
//! session's job.

use chrono::{DateTime, Utc};

use missive_shared::{Actor, ActorId, Conversation, ConversationId, LastMessage};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationRegistry {
    conversations: Vec<Conversation>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted state. The stored order is kept as-is.
    pub fn from_conversations(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }

    /// Fetch the conversation between `current` and `other`, creating it if
    /// this is their first contact.
    ///
    /// Returns the conversation and whether it was created. An existing
    /// conversation is returned untouched and the order is not changed.
    pub fn create_or_get(
        &mut self,
        current: &Actor,
        other: &Actor,
        now: DateTime<Utc>,
    ) -> (Conversation, bool) {
        let id = ConversationId::between(&current.id, &other.id);

        if let Some(existing) = self.get(&id) {
            return (existing.clone(), false);
        }

        let conversation = Conversation::between(current, other, now);
        self.conversations.push(conversation.clone());
        (conversation, true)
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }

    /// Conversations with at least one message, in sort order.
    pub fn visible_list(&self) -> Vec<&Conversation> {
        self.conversations
            .iter()
            .filter(|c| c.has_messages())
            .collect()
    }

    /// Replace a conversation's last-message summary and re-sort.
    pub fn record_last_message(
        &mut self,
        id: &ConversationId,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        sender_id: ActorId,
    ) -> Result<()> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;

        conversation.last_message = LastMessage {
            text: text.into(),
            timestamp,
            sender_id,
        };

        self.sort();
        Ok(())
    }

    /// Every conversation, hidden placeholders included.
    pub fn all(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    // `sort_by` is stable: equal timestamps keep their relative order.
    fn sort(&mut self) {
        self.conversations
            .sort_by(|a, b| b.last_message.timestamp.cmp(&a.last_message.timestamp));
    }
}
