use tokio::sync::broadcast;

use missive_shared::{ActorId, ConversationId, MessageId};

/// Capacity of the session event channel; slow subscribers see `Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notifications for whatever renders the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Loaded { actor_id: ActorId },
    Unloaded { actor_id: ActorId },
    ConversationCreated { conversation_id: ConversationId },
    MessageAppended {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
}

pub fn emit_event(tx: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    // No subscribers is the normal headless case.
    if tx.send(event).is_err() {
        tracing::trace!("Session event dropped; no subscribers");
    }
}
