//! # missive-client
//!
//! Client-side chat state: the current actor's conversations and messages,
//! persisted to a local durable store and exposed as ordered views.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod persistence;
pub mod registry;
pub mod session;

use tracing_subscriber::{fmt, EnvFilter};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::SessionEvent;
pub use identity::{IdentityProvider, LocalIdentity, ProfilePatch};
pub use ledger::MessageLedger;
pub use registry::ConversationRegistry;
pub use session::ChatSession;

/// Install the global tracing subscriber. Output goes to stderr so it never
/// mixes with CLI output. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("missive_client=debug,missive_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init();
}
