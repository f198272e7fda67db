/// Application name
pub const APP_NAME: &str = "Missive";

/// Joins the two sorted participant ids into a conversation id
pub const CONVERSATION_ID_SEPARATOR: &str = "_";

/// Conversation-list summary shown for image messages
pub const IMAGE_PLACEHOLDER: &str = "📷 Photo";

/// Durable store key prefixes, suffixed with the actor id
pub const CONVERSATIONS_KEY_PREFIX: &str = "conversations:";
pub const MESSAGES_KEY_PREFIX: &str = "messages:";

/// Durable store key holding the signed-in actor
pub const CURRENT_ACTOR_KEY: &str = "user";

/// Default capacity of the per-actor write queue
pub const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 64;

pub fn conversations_key(actor_id: &str) -> String {
    format!("{CONVERSATIONS_KEY_PREFIX}{actor_id}")
}

pub fn messages_key(actor_id: &str) -> String {
    format!("{MESSAGES_KEY_PREFIX}{actor_id}")
}
