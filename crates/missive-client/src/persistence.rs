//! Write-through persistence of an actor's conversations and messages.
//!
//! Loading reads the two actor-scoped keys once. Saving hands a serialized
//! snapshot to a single writer task per actor, which applies writes strictly
//! in the order they were queued. Store failures are logged and absorbed:
//! the in-memory state stays authoritative for the rest of the session.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use missive_shared::constants::{conversations_key, messages_key};
use missive_shared::{ActorId, Conversation};
use missive_store::DurableStore;

use crate::ledger::MessageMap;

/// Actor-scoped state read back from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedState {
    pub conversations: Vec<Conversation>,
    pub messages: MessageMap,
}

/// Read an actor's conversations and messages.
///
/// Never fails: a missing key, an unreadable store and malformed data all
/// yield an empty collection.
pub async fn load_state<S: DurableStore>(store: &S, actor_id: &ActorId) -> LoadedState {
    let conversations: Vec<Conversation> =
        load_key(store, &conversations_key(actor_id.as_str())).await;
    let messages: MessageMap = load_key(store, &messages_key(actor_id.as_str())).await;

    info!(
        actor = %actor_id,
        conversations = conversations.len(),
        threads = messages.len(),
        "Loaded chat state"
    );

    LoadedState {
        conversations,
        messages,
    }
}

async fn load_key<S, T>(store: &S, key: &str) -> T
where
    S: DurableStore,
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            error!(key, error = %e, "Failed to read chat state; starting empty");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Stored chat state is malformed; starting empty");
            T::default()
        }
    }
}

/// Commands processed by the writer task.
#[derive(Debug)]
enum WriteCommand {
    Put { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Outcome counters reported when the writer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub applied: usize,
    pub failed: usize,
}

/// Handle to an actor's writer task.
pub struct PersistenceBridge {
    actor_id: ActorId,
    cmd_tx: mpsc::Sender<WriteCommand>,
    worker: JoinHandle<WriterStats>,
}

impl PersistenceBridge {
    /// Spawn the writer task for `actor_id`. Must be called inside a tokio
    /// runtime.
    pub fn spawn<S: DurableStore>(store: S, actor_id: ActorId, capacity: usize) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(writer_loop(store, actor_id.clone(), cmd_rx));

        debug!(actor = %actor_id, capacity, "Persistence writer started");

        Self {
            actor_id,
            cmd_tx,
            worker,
        }
    }

    pub async fn save_conversations(&self, conversations: &[Conversation]) {
        self.enqueue(conversations_key(self.actor_id.as_str()), conversations)
            .await;
    }

    pub async fn save_messages(&self, messages: &MessageMap) {
        self.enqueue(messages_key(self.actor_id.as_str()), messages)
            .await;
    }

    /// Wait until every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(WriteCommand::Flush(ack_tx)).await.is_err() {
            warn!(actor = %self.actor_id, "Persistence writer is gone; nothing to flush");
            return;
        }
        let _ = ack_rx.await;
    }

    /// Drain queued writes and stop the writer.
    pub async fn shutdown(self) -> WriterStats {
        let Self {
            actor_id,
            cmd_tx,
            worker,
        } = self;
        drop(cmd_tx);

        match worker.await {
            Ok(stats) => {
                debug!(actor = %actor_id, ?stats, "Persistence writer stopped");
                stats
            }
            Err(e) => {
                error!(actor = %actor_id, error = %e, "Persistence writer panicked");
                WriterStats::default()
            }
        }
    }

    async fn enqueue<T: Serialize + ?Sized>(&self, key: String, value: &T) {
        let value = match serde_json::to_string(value) {
            Ok(v) => v,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to serialize chat state");
                return;
            }
        };

        if self
            .cmd_tx
            .send(WriteCommand::Put { key, value })
            .await
            .is_err()
        {
            error!(actor = %self.actor_id, "Persistence writer is gone; write dropped");
        }
    }
}

async fn writer_loop<S: DurableStore>(
    store: S,
    actor_id: ActorId,
    mut cmd_rx: mpsc::Receiver<WriteCommand>,
) -> WriterStats {
    let mut stats = WriterStats::default();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            WriteCommand::Put { key, value } => {
                let size = value.len();
                match store.set(&key, value).await {
                    Ok(()) => {
                        stats.applied += 1;
                        debug!(actor = %actor_id, key = %key, size, "Persisted chat state");
                    }
                    Err(e) => {
                        stats.failed += 1;
                        error!(
                            actor = %actor_id,
                            key = %key,
                            error = %e,
                            "Persisted write failed; continuing from memory"
                        );
                    }
                }
            }
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use missive_shared::{Actor, ConversationId, Message};
    use missive_store::MemoryStore;

    fn sample_conversations() -> Vec<Conversation> {
        vec![Conversation::between(
            &Actor::new("1", "John"),
            &Actor::new("2", "Jane"),
            Utc::now(),
        )]
    }

    #[tokio::test]
    async fn load_missing_keys_is_empty() {
        let store = MemoryStore::new();
        let state = load_state(&store, &ActorId::from("1")).await;
        assert_eq!(state, LoadedState::default());
    }

    #[tokio::test]
    async fn load_malformed_is_empty() {
        let store = MemoryStore::new();
        store
            .set("conversations:1", "{not json".to_string())
            .await
            .unwrap();
        store.set("messages:1", "[]".to_string()).await.unwrap();

        let state = load_state(&store, &ActorId::from("1")).await;
        assert!(state.conversations.is_empty());
        assert!(state.messages.is_empty());
    }

    #[tokio::test]
    async fn load_read_failure_is_empty() {
        let store = MemoryStore::new();
        store.set("conversations:1", "[]".to_string()).await.unwrap();
        store.set_fail_reads(true);

        let state = load_state(&store, &ActorId::from("1")).await;
        assert!(state.conversations.is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemoryStore::new();
        let actor = ActorId::from("1");
        let bridge = PersistenceBridge::spawn(store.clone(), actor.clone(), 8);

        let conversations = sample_conversations();
        let mut messages = MessageMap::new();
        messages.insert(
            ConversationId::from("1_2"),
            vec![Message::text(actor.clone(), "hello", Utc::now())],
        );

        bridge.save_conversations(&conversations).await;
        bridge.save_messages(&messages).await;
        let stats = bridge.shutdown().await;
        assert_eq!(stats, WriterStats { applied: 2, failed: 0 });

        let state = load_state(&store, &actor).await;
        assert_eq!(state.conversations, conversations);
        assert_eq!(state.messages, messages);
    }

    #[tokio::test]
    async fn writes_apply_in_queue_order() {
        let store = MemoryStore::new();
        let actor = ActorId::from("1");
        let bridge = PersistenceBridge::spawn(store.clone(), actor.clone(), 1);

        let mut conversations = sample_conversations();
        bridge.save_conversations(&conversations).await;
        conversations[0].last_message.text = "latest".to_string();
        bridge.save_conversations(&conversations).await;
        bridge.flush().await;

        let state = load_state(&store, &actor).await;
        assert_eq!(state.conversations[0].last_message.text, "latest");
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn failed_writes_are_counted_not_raised() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let bridge = PersistenceBridge::spawn(store.clone(), ActorId::from("1"), 4);

        bridge.save_conversations(&sample_conversations()).await;
        let stats = bridge.shutdown().await;
        assert_eq!(stats, WriterStats { applied: 0, failed: 1 });
    }
}
