//! Identity provider seam and a local, store-backed implementation.
//!
//! The chat core only needs to know who the current actor is, who else can
//! be contacted, and when the current actor changes. [`LocalIdentity`] keeps
//! the signed-in actor under the `user` key so a restart resumes the same
//! session.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use missive_shared::constants::CURRENT_ACTOR_KEY;
use missive_shared::{Actor, ActorId};
use missive_store::DurableStore;

use crate::error::{ClientError, Result};

pub trait IdentityProvider: Send + Sync {
    /// The signed-in actor, if any.
    fn current_actor(&self) -> Option<Actor>;

    /// Every known actor except the current one.
    fn other_actors(&self) -> Vec<Actor>;

    /// Transitions between "no actor" and "actor present".
    fn subscribe(&self) -> watch::Receiver<Option<Actor>>;
}

/// Profile fields an actor may change about themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    /// `Some(None)` clears the photo.
    pub photo_url: Option<Option<String>>,
}

pub struct LocalIdentity<S: DurableStore> {
    store: S,
    directory: Vec<Actor>,
    current: watch::Sender<Option<Actor>>,
}

impl<S: DurableStore> LocalIdentity<S> {
    /// `directory` is the population of contactable actors.
    pub fn new(store: S, directory: Vec<Actor>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            store,
            directory,
            current,
        }
    }

    pub fn directory(&self) -> &[Actor] {
        &self.directory
    }

    /// Resume the actor saved by a previous sign-in.
    pub async fn restore(&self) -> Option<Actor> {
        let raw = match self.store.get(CURRENT_ACTOR_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!(error = %e, "Error checking auth state");
                return None;
            }
        };

        match serde_json::from_str::<Actor>(&raw) {
            Ok(actor) => {
                info!(actor = %actor.id, "Restored signed-in actor");
                self.current.send_replace(Some(actor.clone()));
                Some(actor)
            }
            Err(e) => {
                warn!(error = %e, "Saved actor is malformed; ignoring");
                None
            }
        }
    }

    /// Sign in by email. A directory entry with the same email keeps its
    /// identity; otherwise a new actor is minted.
    pub async fn sign_in(&self, email: &str) -> Result<Actor> {
        let email = email.trim();
        let actor = match self.find_by_email(email) {
            Some(known) => Actor {
                is_online: true,
                last_seen: Utc::now(),
                ..known.clone()
            },
            None => mint_actor(email, default_display_name(email)),
        };
        self.activate(actor).await
    }

    pub async fn sign_up(&self, email: &str, display_name: &str) -> Result<Actor> {
        let email = email.trim();
        let display_name = display_name.trim();
        let display_name = if display_name.is_empty() {
            default_display_name(email)
        } else {
            display_name.to_string()
        };
        self.activate(mint_actor(email, display_name)).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.store.delete(CURRENT_ACTOR_KEY).await?;
        if let Some(previous) = self.current.send_replace(None) {
            info!(actor = %previous.id, "Signed out");
        }
        Ok(())
    }

    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Actor> {
        let mut actor = self.current_actor().ok_or(ClientError::NoActiveActor)?;

        if let Some(name) = patch.display_name {
            let name = name.trim();
            if !name.is_empty() {
                actor.display_name = name.to_string();
            }
        }
        if let Some(photo) = patch.photo_url {
            actor.photo_url = photo;
        }

        self.activate(actor).await
    }

    async fn activate(&self, actor: Actor) -> Result<Actor> {
        let raw = serde_json::to_string(&actor)?;
        self.store.set(CURRENT_ACTOR_KEY, raw).await?;

        info!(actor = %actor.id, name = %actor.display_name, "Actor active");
        self.current.send_replace(Some(actor.clone()));
        Ok(actor)
    }

    fn find_by_email(&self, email: &str) -> Option<&Actor> {
        self.directory.iter().find(|a| {
            a.email
                .as_deref()
                .is_some_and(|known| known.eq_ignore_ascii_case(email))
        })
    }
}

impl<S: DurableStore> IdentityProvider for LocalIdentity<S> {
    fn current_actor(&self) -> Option<Actor> {
        self.current.borrow().clone()
    }

    fn other_actors(&self) -> Vec<Actor> {
        let current_id: Option<ActorId> = self.current.borrow().as_ref().map(|a| a.id.clone());
        self.directory
            .iter()
            .filter(|a| Some(&a.id) != current_id.as_ref())
            .cloned()
            .collect()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Actor>> {
        self.current.subscribe()
    }
}

fn mint_actor(email: &str, display_name: String) -> Actor {
    Actor {
        id: ActorId::generate(),
        email: (!email.is_empty()).then(|| email.to_string()),
        display_name,
        photo_url: None,
        is_online: true,
        last_seen: Utc::now(),
    }
}

/// The part of an email before `@`.
fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use missive_store::MemoryStore;

    fn directory() -> Vec<Actor> {
        let mut john = Actor::new("1", "John Doe");
        john.email = Some("john@example.com".to_string());
        let mut jane = Actor::new("2", "Jane Smith");
        jane.email = Some("jane@example.com".to_string());
        jane.is_online = false;
        vec![john, jane]
    }

    #[tokio::test]
    async fn sign_in_unknown_email_mints_actor() {
        let identity = LocalIdentity::new(MemoryStore::new(), directory());
        let actor = identity.sign_in("carol@example.com").await.unwrap();

        assert_eq!(actor.display_name, "carol");
        assert_eq!(actor.email.as_deref(), Some("carol@example.com"));
        assert_eq!(identity.current_actor(), Some(actor));
        assert_eq!(identity.other_actors().len(), 2);
    }

    #[tokio::test]
    async fn sign_in_known_email_reuses_identity() {
        let identity = LocalIdentity::new(MemoryStore::new(), directory());
        let actor = identity.sign_in("JANE@example.com").await.unwrap();

        assert_eq!(actor.id.as_str(), "2");
        assert!(actor.is_online);
        let others: Vec<String> = identity
            .other_actors()
            .into_iter()
            .map(|a| a.id.0)
            .collect();
        assert_eq!(others, vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn restore_after_restart() {
        let store = MemoryStore::new();
        let first = LocalIdentity::new(store.clone(), directory());
        let actor = first.sign_up("dave@example.com", "Dave").await.unwrap();

        let second = LocalIdentity::new(store, directory());
        assert_eq!(second.restore().await, Some(actor.clone()));
        assert_eq!(second.current_actor(), Some(actor));
    }

    #[tokio::test]
    async fn sign_out_clears_saved_actor() {
        let store = MemoryStore::new();
        let identity = LocalIdentity::new(store.clone(), directory());
        let mut rx = identity.subscribe();

        identity.sign_in("john@example.com").await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        identity.sign_out().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        assert!(store.snapshot(CURRENT_ACTOR_KEY).is_none());
    }

    #[tokio::test]
    async fn update_profile_merges_fields() {
        let identity = LocalIdentity::new(MemoryStore::new(), directory());
        identity.sign_up("eve@example.com", "").await.unwrap();

        let updated = identity
            .update_profile(ProfilePatch {
                display_name: Some("  Eve  ".to_string()),
                photo_url: Some(Some("file:///eve.png".to_string())),
            })
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Eve");
        assert_eq!(updated.photo_url.as_deref(), Some("file:///eve.png"));
    }

    #[tokio::test]
    async fn update_profile_requires_actor() {
        let identity = LocalIdentity::new(MemoryStore::new(), directory());
        let err = identity
            .update_profile(ProfilePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoActiveActor));
    }

    #[tokio::test]
    async fn malformed_saved_actor_is_ignored() {
        let store = MemoryStore::new();
        store
            .set(CURRENT_ACTOR_KEY, "not json".to_string())
            .await
            .unwrap();
        let identity = LocalIdentity::new(store, directory());
        assert!(identity.restore().await.is_none());
    }
}
