//! Telegram client port
//!
//! The bridge never talks MTProto itself. Everything remote goes through
//! [`MessengerClient`], which the `grammers` adapter implements for
//! production and the integration tests implement with an in-memory fake.

pub mod grammers;
pub mod manager;
pub mod methods;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::errors::{BridgeError, Result};

pub use manager::{AuthState, ClientManager, ClientStatus};

/// API credentials issued by my.telegram.org plus the account phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
}

/// The authorized account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerKind {
    User,
    Chat,
    Channel,
}

/// A resolved entity the client can address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: i64,
    pub kind: PeerKind,
    /// Group and channel title; users have none.
    pub title: Option<String>,
    pub username: Option<String>,
}

/// Human-readable reference to an entity, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerRef {
    Me,
    Username(String),
    Phone(String),
    Id(i64),
}

impl PeerRef {
    /// Accepts `me`, `@name`, `name`, `t.me/name` links, `+15551234567`
    /// phone numbers and numeric ids (negative for chats and channels).
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();

        if reference.eq_ignore_ascii_case("me") || reference.eq_ignore_ascii_case("self") {
            return PeerRef::Me;
        }

        if let Ok(id) = reference.parse::<i64>() {
            if !reference.starts_with('+') {
                return PeerRef::Id(id);
            }
        }

        if let Some(digits) = reference.strip_prefix('+') {
            let digits: String = digits.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return PeerRef::Phone(digits);
            }
        }

        let username = strip_link_prefix(reference).trim_start_matches('@');
        PeerRef::Username(username.to_string())
    }
}

impl std::fmt::Display for PeerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerRef::Me => write!(f, "me"),
            PeerRef::Username(name) => write!(f, "{}", name),
            PeerRef::Phone(phone) => write!(f, "+{}", phone),
            PeerRef::Id(id) => write!(f, "{}", id),
        }
    }
}

const LINK_PREFIXES: [&str; 6] = [
    "https://t.me/",
    "http://t.me/",
    "https://telegram.me/",
    "http://telegram.me/",
    "t.me/",
    "telegram.me/",
];

/// Drops a leading `t.me` / `telegram.me` URL prefix if present.
pub fn strip_link_prefix(link: &str) -> &str {
    LINK_PREFIXES
        .iter()
        .find_map(|prefix| link.strip_prefix(prefix))
        .unwrap_or(link)
}

/// Rich-text rendering applied to outgoing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Markdown,
    Plain,
}

impl ParseMode {
    /// `None` or an empty string means the caller asked for no formatting.
    pub fn parse(mode: Option<&str>) -> Result<Self> {
        let Some(mode) = mode else {
            return Ok(ParseMode::Plain);
        };

        match mode.trim().to_ascii_lowercase().as_str() {
            "" => Ok(ParseMode::Plain),
            "html" | "htm" => Ok(ParseMode::Html),
            "md" | "markdown" => Ok(ParseMode::Markdown),
            other => Err(BridgeError::Remote(format!("Unknown parse mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Photo,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    pub message_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i32,
    pub text: String,
    pub date: Option<DateTime<Utc>>,
    pub from_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogSummary {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: PeerKind,
}

/// One live (or reconnectable) session with the remote service.
///
/// Implementations keep whatever library state they need between calls
/// (login tokens, resolved peer access hashes). Every method maps library
/// failures into [`BridgeError`]; two-factor prompts must surface as
/// [`BridgeError::PasswordRequired`].
#[async_trait]
pub trait MessengerClient: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    fn is_connected(&self) -> bool;

    /// Returns an opaque token identifying the code request.
    async fn request_login_code(&self, phone: &str) -> Result<String>;
    async fn sign_in(&self, phone: &str, code: &str) -> Result<Identity>;
    async fn sign_in_with_password(&self, code: &str, password: &str) -> Result<Identity>;
    async fn get_me(&self) -> Result<Identity>;

    async fn resolve_peer(&self, reference: &PeerRef) -> Result<Peer>;
    async fn send_text(&self, peer: &Peer, text: &str, mode: ParseMode) -> Result<i32>;
    /// Captions are always rendered as HTML.
    async fn send_file(
        &self,
        peer: &Peer,
        path: &Path,
        caption: &str,
        kind: UploadKind,
    ) -> Result<i32>;
    /// Newest first. `None` fetches everything the service returns.
    async fn get_messages(&self, peer: &Peer, limit: Option<usize>) -> Result<Vec<HistoryEntry>>;
    /// `invite` is the `+`-prefixed token taken from an invite link.
    async fn import_chat_invite(&self, invite: &str) -> Result<()>;
    async fn get_dialogs(&self, limit: Option<usize>) -> Result<Vec<Peer>>;
}

/// Creates the handle the first time the manager connects.
pub trait ClientFactory: Send + Sync {
    fn create(&self, credentials: &Credentials) -> Arc<dyn MessengerClient>;
}
