//! One function per remote operation.
//!
//! Each takes a borrowed handle, makes a single library call (after entity
//! resolution where needed) and reshapes the outcome. Failures are logged and
//! collapsed to [`BridgeError::Remote`] carrying the library's message.

use std::path::Path;
use tracing::{debug, error, info};

use super::{
    strip_link_prefix, DialogSummary, HistoryEntry, MessengerClient, ParseMode, Peer, PeerRef,
    SentMessage, UploadKind,
};
use crate::errors::{BridgeError, Result};

fn failed(operation: &str, err: BridgeError) -> BridgeError {
    error!("{} failed: {}", operation, err);
    match err {
        BridgeError::Remote(message) => BridgeError::Remote(message),
        other => BridgeError::Remote(other.to_string()),
    }
}

/// Resolves a human-readable reference. A digit-only reference that names
/// no known id is retried as a contact's phone number.
pub async fn resolve(client: &dyn MessengerClient, reference: &str) -> Result<Peer> {
    let parsed = PeerRef::parse(reference);
    match (&parsed, client.resolve_peer(&parsed).await) {
        (PeerRef::Id(id), Err(BridgeError::Remote(message))) if *id > 0 => {
            debug!("No entity with id {} ({}), trying it as a phone number", id, message);
            client.resolve_peer(&PeerRef::Phone(id.to_string())).await
        }
        (_, outcome) => outcome,
    }
}

pub async fn send_message(
    client: &dyn MessengerClient,
    receiver: &str,
    message: &str,
    parse_mode: Option<&str>,
) -> Result<SentMessage> {
    let outcome = async {
        let mode = ParseMode::parse(parse_mode)?;
        let peer = resolve(client, receiver).await?;
        let message_id = client.send_text(&peer, message, mode).await?;
        Ok::<_, BridgeError>(SentMessage {
            message_id,
            chat_id: Some(peer.id),
        })
    }
    .await;

    let sent = outcome.map_err(|e| failed("send_message", e))?;
    debug!("Sent message {} to {}", sent.message_id, receiver);
    Ok(sent)
}

/// Same as [`send_message`], but the reply carries only the message id.
pub async fn send_to_channel(
    client: &dyn MessengerClient,
    channel: &str,
    message: &str,
    parse_mode: Option<&str>,
) -> Result<SentMessage> {
    let outcome = async {
        let mode = ParseMode::parse(parse_mode)?;
        let peer = resolve(client, channel).await?;
        client.send_text(&peer, message, mode).await
    }
    .await;

    let message_id = outcome.map_err(|e| failed("send_to_channel", e))?;
    debug!("Posted message {} to channel {}", message_id, channel);
    Ok(SentMessage {
        message_id,
        chat_id: None,
    })
}

/// Uploads `file_path` and sends it with an HTML caption. The file is not
/// checked locally; a missing file fails like any other remote error.
pub async fn send_media(
    client: &dyn MessengerClient,
    receiver: &str,
    caption: &str,
    file_path: &str,
) -> Result<SentMessage> {
    let path = Path::new(file_path);
    let outcome = async {
        let peer = resolve(client, receiver).await?;
        client
            .send_file(&peer, path, caption, upload_kind(path))
            .await
    }
    .await;

    let message_id = outcome.map_err(|e| failed("send_media", e))?;
    debug!("Sent {} to {} as message {}", file_path, receiver, message_id);
    Ok(SentMessage {
        message_id,
        chat_id: None,
    })
}

/// Still images go out as photos; everything else (including GIFs) as a
/// document.
pub fn upload_kind(path: &Path) -> UploadKind {
    match mime_guess::from_path(path).first() {
        Some(mime)
            if mime.type_() == mime_guess::mime::IMAGE
                && matches!(mime.subtype().as_str(), "jpeg" | "png" | "webp" | "bmp") =>
        {
            UploadKind::Photo
        }
        _ => UploadKind::Document,
    }
}

/// Most recent messages first, in the order the service returns them.
pub async fn get_history(
    client: &dyn MessengerClient,
    entity: &str,
    limit: Option<usize>,
) -> Result<Vec<HistoryEntry>> {
    let outcome = async {
        let peer = resolve(client, entity).await?;
        client.get_messages(&peer, limit).await
    }
    .await;

    let mut messages = outcome.map_err(|e| failed("get_history", e))?;
    if let Some(limit) = limit {
        messages.truncate(limit);
    }
    debug!("Fetched {} messages from {}", messages.len(), entity);
    Ok(messages)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// Private invite token, still carrying its leading `+`.
    Invite(String),
    /// Public channel username.
    Public(String),
}

pub fn parse_channel_link(link: &str) -> JoinTarget {
    let rest = strip_link_prefix(link.trim());

    if rest.starts_with('+') {
        return JoinTarget::Invite(rest.to_string());
    }
    if let Some(hash) = rest.strip_prefix("joinchat/") {
        return JoinTarget::Invite(format!("+{}", hash));
    }

    JoinTarget::Public(rest.to_string())
}

/// Invite links are imported. Public usernames are only resolved, which is
/// all the client library does for them; no explicit join request is sent.
pub async fn join_channel(client: &dyn MessengerClient, channel_link: &str) -> Result<()> {
    let outcome = match parse_channel_link(channel_link) {
        JoinTarget::Invite(token) => {
            info!("Importing chat invite {}", token);
            client.import_chat_invite(&token).await
        }
        JoinTarget::Public(username) => {
            info!("Resolving public channel {}", username);
            resolve(client, &username).await.map(|_| ())
        }
    };

    outcome.map_err(|e| failed("join_channel", e))
}

/// Conversation list in the service's order (most recently active first).
pub async fn list_dialogs(
    client: &dyn MessengerClient,
    limit: Option<usize>,
) -> Result<Vec<DialogSummary>> {
    let peers = client
        .get_dialogs(limit)
        .await
        .map_err(|e| failed("list_dialogs", e))?;

    let dialogs: Vec<DialogSummary> = peers
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|peer| DialogSummary {
            id: peer.id,
            title: peer.title.or_else(|| peer.username.clone()),
            username: peer.username,
            kind: peer.kind,
        })
        .collect();

    debug!("Listed {} dialogs", dialogs.len());
    Ok(dialogs)
}
