//! # missive
//!
//! Line-oriented front end for a local Missive chat session. Reads commands
//! from stdin, drives the identity provider and the chat session, and prints
//! the resulting views.

use chrono::{Duration, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use missive_client::{
    init_tracing, ChatSession, ClientConfig, ClientError, IdentityProvider, LocalIdentity,
    ProfilePatch,
};
use missive_shared::constants::APP_NAME;
use missive_shared::{Actor, ConversationId, MessageKind};
use missive_store::AnyStore;

const HELP: &str = "\
commands:
  login <email>                 sign in
  signup <email> [name...]      create an account
  logout                        sign out
  profile <name...>             change display name
  users                         list people you can message
  open <user-id>                start or resume a conversation
  send <conversation-id> <text> send a text message
  photo <conversation-id> <uri> send an image
  chats                         list conversations, most recent first
  show <conversation-id>        print a conversation, newest first
  help | quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login(String),
    Signup { email: String, name: String },
    Logout,
    Profile(String),
    Users,
    Open(String),
    Send { conversation: String, text: String },
    Photo { conversation: String, uri: String },
    Chats,
    Show(String),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let required = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("{verb}: missing {what}"))
        } else {
            Ok(rest.to_string())
        }
    };
    let pair = |what: &str| -> Result<(String, String), String> {
        match rest.split_once(char::is_whitespace) {
            Some((head, tail)) if !tail.trim().is_empty() => {
                Ok((head.to_string(), tail.trim().to_string()))
            }
            _ => Err(format!("{verb}: expected <conversation-id> <{what}>")),
        }
    };

    match verb {
        "login" => Ok(Command::Login(required("email")?)),
        "signup" => {
            let args = required("email")?;
            let (email, name) = match args.split_once(char::is_whitespace) {
                Some((email, name)) => (email.to_string(), name.trim().to_string()),
                None => (args.clone(), String::new()),
            };
            Ok(Command::Signup { email, name })
        }
        "logout" => Ok(Command::Logout),
        "profile" => Ok(Command::Profile(required("display name")?)),
        "users" => Ok(Command::Users),
        "open" => Ok(Command::Open(required("user id")?)),
        "send" => {
            let (conversation, text) = pair("text")?;
            Ok(Command::Send { conversation, text })
        }
        "photo" => {
            let (conversation, uri) = pair("uri")?;
            Ok(Command::Photo { conversation, uri })
        }
        "chats" => Ok(Command::Chats),
        "show" => Ok(Command::Show(required("conversation id")?)),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other} (try `help`)")),
    }
}

/// Sample population used when no directory file is configured.
fn sample_directory() -> Vec<Actor> {
    let now = Utc::now();
    [
        ("1", "john@example.com", "John Doe", true, 0),
        ("2", "jane@example.com", "Jane Smith", false, 30),
        ("3", "bob@example.com", "Bob Johnson", true, 0),
        ("4", "alice@example.com", "Alice Brown", false, 120),
    ]
    .into_iter()
    .map(|(id, email, name, online, minutes_ago)| Actor {
        email: Some(email.to_string()),
        is_online: online,
        last_seen: now - Duration::minutes(minutes_ago),
        ..Actor::new(id, name)
    })
    .collect()
}

struct App {
    identity: LocalIdentity<AnyStore>,
    session: ChatSession<AnyStore>,
}

impl App {
    /// Execute one command. Returns `false` on quit.
    async fn run(&mut self, command: Command) -> Result<bool, ClientError> {
        match command {
            Command::Login(email) => {
                let actor = self.identity.sign_in(&email).await?;
                self.session.sync_with(&self.identity).await;
                println!("signed in as {} ({})", actor.display_name, actor.id);
            }
            Command::Signup { email, name } => {
                let actor = self.identity.sign_up(&email, &name).await?;
                self.session.sync_with(&self.identity).await;
                println!("welcome, {} ({})", actor.display_name, actor.id);
            }
            Command::Logout => {
                self.identity.sign_out().await?;
                self.session.sync_with(&self.identity).await;
                println!("signed out");
            }
            Command::Profile(name) => {
                let actor = self
                    .identity
                    .update_profile(ProfilePatch {
                        display_name: Some(name),
                        photo_url: None,
                    })
                    .await?;
                self.session.sync_with(&self.identity).await;
                println!("display name is now {}", actor.display_name);
            }
            Command::Users => {
                for actor in self.identity.other_actors() {
                    let status = if actor.is_online { "online" } else { "offline" };
                    println!("{:>6}  {:<16} {}", actor.id, actor.display_name, status);
                }
            }
            Command::Open(user_id) => {
                let other = self
                    .identity
                    .other_actors()
                    .into_iter()
                    .find(|a| a.id.as_str() == user_id);
                match other {
                    Some(other) => {
                        let conversation = self.session.create_or_get(&other).await?;
                        println!("conversation {} with {}", conversation.id, other.display_name);
                    }
                    None => println!("no such user: {user_id}"),
                }
            }
            Command::Send { conversation, text } => {
                let id = ConversationId(conversation);
                let message = self.session.send_text(&id, &text).await?;
                println!("sent {}", message.id);
            }
            Command::Photo { conversation, uri } => {
                let id = ConversationId(conversation);
                let message = self.session.send_image(&id, &uri).await?;
                println!("sent image {}", message.id);
            }
            Command::Chats => self.print_chats(),
            Command::Show(conversation) => self.print_conversation(&ConversationId(conversation)),
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn print_chats(&self) {
        let Some(me) = self.session.current_actor() else {
            println!("not signed in");
            return;
        };
        let visible = self.session.visible_list();
        if visible.is_empty() {
            println!("no conversations yet");
        }
        for conversation in visible {
            let other = conversation.other_participant(&me.id);
            let name = conversation
                .participant_details
                .get(other)
                .map(|d| d.display_name.as_str())
                .unwrap_or(other.as_str());
            println!(
                "{:<24} {:<16} {}  {}",
                conversation.id,
                name,
                conversation.last_message.timestamp.format("%Y-%m-%d %H:%M"),
                conversation.last_message.text
            );
        }
    }

    fn print_conversation(&self, id: &ConversationId) {
        for message in self.session.messages_for(id) {
            let body = match message.kind {
                MessageKind::Text => message.text.as_str(),
                MessageKind::Image => message.image_url.as_deref().unwrap_or_default(),
            };
            println!(
                "[{}] {}: {}",
                message.timestamp.format("%H:%M:%S"),
                message.sender_id,
                body
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let store = config.open_store().await?;
    let directory = config
        .load_directory()
        .await?
        .unwrap_or_else(sample_directory);

    let identity = LocalIdentity::new(store.clone(), directory);
    let session = ChatSession::new(store).with_write_queue_capacity(config.write_queue_capacity);
    let mut app = App { identity, session };

    if let Some(actor) = app.identity.restore().await {
        app.session.sync_with(&app.identity).await;
        println!("welcome back, {}", actor.display_name);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Failed to read from stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        match app.run(command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("error: {e}"),
        }
    }

    // Drain queued writes before exit.
    app.session.sign_out().await;
    Ok(())
}
