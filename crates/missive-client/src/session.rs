//! The chat session: one actor's conversations and messages, bound to a
//! durable store.
//!
//! A [`ChatSession`] is either unloaded (nobody signed in, nothing in
//! memory) or loaded for exactly one actor. Loading reads the actor's state
//! from the store and starts that actor's writer; unloading drops the
//! in-memory state and drains the writer. Mutations update memory first and
//! then queue a full-collection write, so reads always reflect the latest
//! call even while the store lags behind.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use missive_shared::constants::DEFAULT_WRITE_QUEUE_CAPACITY;
use missive_shared::{Actor, Conversation, ConversationId, Message, MessageKind};
use missive_store::DurableStore;

use crate::clock::{Clock, SystemClock};
use crate::error::{ClientError, Result};
use crate::events::{emit_event, SessionEvent, EVENT_CHANNEL_CAPACITY};
use crate::identity::IdentityProvider;
use crate::ledger::MessageLedger;
use crate::persistence::{load_state, PersistenceBridge, WriterStats};
use crate::registry::ConversationRegistry;

struct LoadedSession {
    actor: Actor,
    registry: ConversationRegistry,
    ledger: MessageLedger,
    bridge: PersistenceBridge,
}

enum SessionState {
    Unloaded,
    Loaded(LoadedSession),
}

pub struct ChatSession<S: DurableStore> {
    store: S,
    clock: Arc<dyn Clock>,
    write_queue_capacity: usize,
    state: SessionState,
    events: broadcast::Sender<SessionEvent>,
}

impl<S: DurableStore> ChatSession<S> {
    /// Create an unloaded session over `store`.
    pub fn new(store: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            clock: Arc::new(SystemClock),
            write_queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
            state: SessionState::Unloaded,
            events,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SessionState::Loaded(_))
    }

    pub fn current_actor(&self) -> Option<&Actor> {
        self.loaded().map(|l| &l.actor)
    }

    // ------------------------------------------------------------------
    // Actor lifecycle
    // ------------------------------------------------------------------

    /// Bind the session to `actor`, loading their state from the store.
    ///
    /// Signing in as the already-bound actor only refreshes the profile
    /// snapshot. Signing in as someone else unloads the previous actor first.
    pub async fn sign_in(&mut self, actor: Actor) {
        if let SessionState::Loaded(loaded) = &mut self.state {
            if loaded.actor.id == actor.id {
                loaded.actor = actor;
                return;
            }
        }

        self.sign_out().await;

        let loaded_state = load_state(&self.store, &actor.id).await;
        let bridge = PersistenceBridge::spawn(
            self.store.clone(),
            actor.id.clone(),
            self.write_queue_capacity,
        );
        let actor_id = actor.id.clone();

        self.state = SessionState::Loaded(LoadedSession {
            actor,
            registry: ConversationRegistry::from_conversations(loaded_state.conversations),
            ledger: MessageLedger::from_entries(loaded_state.messages),
            bridge,
        });

        info!(actor = %actor_id, "Chat session loaded");
        emit_event(&self.events, SessionEvent::Loaded { actor_id });
    }

    /// Discard in-memory state and wait for queued writes to land.
    ///
    /// Returns the writer's counters, or `None` when nothing was loaded.
    pub async fn sign_out(&mut self) -> Option<WriterStats> {
        let loaded = match std::mem::replace(&mut self.state, SessionState::Unloaded) {
            SessionState::Unloaded => return None,
            SessionState::Loaded(loaded) => loaded,
        };

        let actor_id = loaded.actor.id;
        let stats = loaded.bridge.shutdown().await;

        info!(
            actor = %actor_id,
            applied = stats.applied,
            failed = stats.failed,
            "Chat session unloaded"
        );
        emit_event(&self.events, SessionEvent::Unloaded { actor_id });
        Some(stats)
    }

    /// Follow an identity transition.
    pub async fn apply_identity(&mut self, actor: Option<Actor>) {
        match actor {
            Some(actor) => self.sign_in(actor).await,
            None => {
                self.sign_out().await;
            }
        }
    }

    /// Align the session with the provider's current actor.
    pub async fn sync_with<P: IdentityProvider + ?Sized>(&mut self, provider: &P) {
        self.apply_identity(provider.current_actor()).await;
    }

    /// Wait for the next identity transition and apply it. Returns `false`
    /// once the provider is gone.
    pub async fn follow_next(&mut self, rx: &mut watch::Receiver<Option<Actor>>) -> bool {
        if rx.changed().await.is_err() {
            return false;
        }
        let actor = rx.borrow_and_update().clone();
        self.apply_identity(actor).await;
        true
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Fetch the conversation with `other`, creating it on first contact.
    ///
    /// Only a newly created conversation is written to the store.
    pub async fn create_or_get(&mut self, other: &Actor) -> Result<Conversation> {
        let now = self.clock.now();
        let loaded = loaded_mut(&mut self.state)?;

        let (conversation, created) = loaded.registry.create_or_get(&loaded.actor, other, now);
        if !created {
            return Ok(conversation);
        }

        loaded.bridge.save_conversations(loaded.registry.all()).await;

        info!(
            actor = %loaded.actor.id,
            conversation = %conversation.id,
            "Conversation created"
        );
        emit_event(
            &self.events,
            SessionEvent::ConversationCreated {
                conversation_id: conversation.id.clone(),
            },
        );
        Ok(conversation)
    }

    /// Append a message from the current actor to `conversation_id`.
    ///
    /// The message heads the conversation's history and the conversation's
    /// last-message summary moves it to the top of the list before this
    /// returns. Text is stored verbatim; see [`Self::send_text`] for the
    /// trimming entry point.
    pub async fn send_message(
        &mut self,
        conversation_id: &ConversationId,
        text: &str,
        kind: MessageKind,
        image_url: Option<String>,
    ) -> Result<Message> {
        let now = self.clock.now();
        let loaded = loaded_mut(&mut self.state)?;

        if !loaded.registry.contains(conversation_id) {
            return Err(ClientError::NotFound(conversation_id.clone()));
        }

        let message =
            loaded
                .ledger
                .append(conversation_id, &loaded.actor.id, text, kind, image_url, now)?;
        loaded.registry.record_last_message(
            conversation_id,
            message.summary(),
            now,
            loaded.actor.id.clone(),
        )?;

        loaded.bridge.save_messages(loaded.ledger.entries()).await;
        loaded.bridge.save_conversations(loaded.registry.all()).await;

        debug!(
            conversation = %conversation_id,
            message = %message.id,
            kind = message.kind.as_str(),
            "Message appended"
        );
        emit_event(
            &self.events,
            SessionEvent::MessageAppended {
                conversation_id: conversation_id.clone(),
                message_id: message.id.clone(),
            },
        );
        Ok(message)
    }

    /// Send typed text. Surrounding whitespace is trimmed and blank input is
    /// rejected.
    pub async fn send_text(&mut self, conversation_id: &ConversationId, text: &str) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        self.send_message(conversation_id, text, MessageKind::Text, None)
            .await
    }

    /// Send a picked image by URI.
    pub async fn send_image(&mut self, conversation_id: &ConversationId, uri: &str) -> Result<Message> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ClientError::EmptyImageUri);
        }
        self.send_message(conversation_id, "", MessageKind::Image, Some(uri.to_string()))
            .await
    }

    /// Wait until every write queued so far has reached the store.
    pub async fn flush(&self) {
        if let Some(loaded) = self.loaded() {
            loaded.bridge.flush().await;
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Conversations with at least one message, most recent first.
    pub fn visible_list(&self) -> Vec<&Conversation> {
        self.loaded()
            .map(|l| l.registry.visible_list())
            .unwrap_or_default()
    }

    /// Every conversation, including never-messaged ones.
    pub fn conversations(&self) -> &[Conversation] {
        self.loaded().map(|l| l.registry.all()).unwrap_or(&[])
    }

    pub fn conversation(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.loaded().and_then(|l| l.registry.get(conversation_id))
    }

    /// Newest-first history of a conversation; empty when unknown.
    pub fn messages_for(&self, conversation_id: &ConversationId) -> &[Message] {
        self.loaded()
            .map(|l| l.ledger.messages_for(conversation_id))
            .unwrap_or(&[])
    }

    fn loaded(&self) -> Option<&LoadedSession> {
        match &self.state {
            SessionState::Loaded(loaded) => Some(loaded),
            SessionState::Unloaded => None,
        }
    }
}

fn loaded_mut(state: &mut SessionState) -> Result<&mut LoadedSession> {
    match state {
        SessionState::Loaded(loaded) => Ok(loaded),
        SessionState::Unloaded => Err(ClientError::NoActiveActor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use missive_shared::constants::IMAGE_PLACEHOLDER;
    use missive_store::MemoryStore;

    use crate::clock::ManualClock;

    fn actor(id: &str) -> Actor {
        Actor::new(id, format!("User {id}"))
    }

    fn session(store: MemoryStore) -> (ChatSession<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let session = ChatSession::new(store).with_clock(Arc::new(clock.clone()));
        (session, clock)
    }

    #[tokio::test]
    async fn writes_require_an_actor() {
        let (mut session, _) = session(MemoryStore::new());
        let err = session.create_or_get(&actor("2")).await.unwrap_err();
        assert!(matches!(err, ClientError::NoActiveActor));
        assert!(session.visible_list().is_empty());
        assert!(session.messages_for(&ConversationId::from("1_2")).is_empty());
    }

    #[tokio::test]
    async fn create_writes_once() {
        let store = MemoryStore::new();
        let (mut session, _) = session(store.clone());
        session.sign_in(actor("1")).await;

        session.create_or_get(&actor("2")).await.unwrap();
        session.create_or_get(&actor("2")).await.unwrap();
        session.flush().await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(session.conversations().len(), 1);
    }

    #[tokio::test]
    async fn send_updates_summary_and_history() {
        let (mut session, clock) = session(MemoryStore::new());
        session.sign_in(actor("1")).await;
        let c = session.create_or_get(&actor("2")).await.unwrap();

        clock.advance(Duration::seconds(1));
        let m = session.send_text(&c.id, "  hello ").await.unwrap();
        assert_eq!(m.text, "hello");

        let history = session.messages_for(&c.id);
        assert_eq!(history[0].id, m.id);
        assert_eq!(history[0].sender_id.as_str(), "1");

        let visible = session.visible_list();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].last_message.text, "hello");
        assert_eq!(visible[0].last_message.timestamp, clock.now());
    }

    #[tokio::test]
    async fn image_summary_uses_placeholder() {
        let (mut session, _) = session(MemoryStore::new());
        session.sign_in(actor("1")).await;
        let c = session.create_or_get(&actor("2")).await.unwrap();

        let m = session.send_image(&c.id, "file:///cat.jpg").await.unwrap();
        assert_eq!(m.kind, MessageKind::Image);
        assert_eq!(m.image_url.as_deref(), Some("file:///cat.jpg"));
        assert_eq!(
            session.conversation(&c.id).unwrap().last_message.text,
            IMAGE_PLACEHOLDER
        );
    }

    #[tokio::test]
    async fn blank_text_rejected() {
        let (mut session, _) = session(MemoryStore::new());
        session.sign_in(actor("1")).await;
        let c = session.create_or_get(&actor("2")).await.unwrap();

        let err = session.send_text(&c.id, "   ").await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyMessage));
        assert!(session.messages_for(&c.id).is_empty());
    }

    #[tokio::test]
    async fn blank_image_uri_rejected() {
        let (mut session, _) = session(MemoryStore::new());
        session.sign_in(actor("1")).await;
        let c = session.create_or_get(&actor("2")).await.unwrap();

        let err = session.send_image(&c.id, "  ").await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyImageUri));
        assert_eq!(err.to_string(), "Image URI is empty");
        assert!(session.visible_list().is_empty());
    }

    #[tokio::test]
    async fn send_to_unknown_conversation_fails_cleanly() {
        let (mut session, _) = session(MemoryStore::new());
        session.sign_in(actor("1")).await;

        let ghost = ConversationId::from("1_404");
        let err = session
            .send_message(&ghost, "hi", MessageKind::Text, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert!(session.messages_for(&ghost).is_empty());
    }

    #[tokio::test]
    async fn events_follow_mutations() {
        let (mut session, _) = session(MemoryStore::new());
        let mut rx = session.subscribe();

        session.sign_in(actor("1")).await;
        let c = session.create_or_get(&actor("2")).await.unwrap();
        let m = session.send_text(&c.id, "yo").await.unwrap();
        session.sign_out().await;

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Loaded { actor_id: "1".into() }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::ConversationCreated {
                conversation_id: c.id.clone()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::MessageAppended {
                conversation_id: c.id,
                message_id: m.id
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Unloaded { actor_id: "1".into() }
        );
    }

    #[tokio::test]
    async fn same_actor_sign_in_keeps_state() {
        let (mut session, _) = session(MemoryStore::new());
        session.sign_in(actor("1")).await;
        session.create_or_get(&actor("2")).await.unwrap();

        let mut renamed = actor("1");
        renamed.display_name = "Renamed".to_string();
        session.sign_in(renamed).await;

        assert_eq!(session.conversations().len(), 1);
        assert_eq!(session.current_actor().unwrap().display_name, "Renamed");
    }
}
