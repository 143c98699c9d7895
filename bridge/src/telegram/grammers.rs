//! `grammers` implementation of the client port
//!
//! The session is persisted to `<session_dir>/<session_name>.session` after
//! sign-in and on disconnect, so a restarted bridge reuses the same login.

use async_trait::async_trait;
use grammers_client::types::{Chat, LoginToken, PackedChat, PasswordToken, User};
use grammers_client::{Client, Config, InitParams, InputMessage, SignInError};
use grammers_session::Session;
use grammers_tl_types as tl;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{
    ClientFactory, Credentials, HistoryEntry, Identity, MessengerClient, ParseMode, Peer,
    PeerKind, PeerRef, UploadKind,
};
use crate::errors::{BridgeError, Result};

pub struct GrammersFactory {
    session_path: PathBuf,
}

impl GrammersFactory {
    pub fn new(session_dir: impl AsRef<Path>, session_name: &str) -> Self {
        Self {
            session_path: session_dir
                .as_ref()
                .join(format!("{}.session", session_name)),
        }
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }
}

impl ClientFactory for GrammersFactory {
    fn create(&self, credentials: &Credentials) -> Arc<dyn MessengerClient> {
        Arc::new(GrammersClient::new(
            credentials.clone(),
            self.session_path.clone(),
        ))
    }
}

pub struct GrammersClient {
    credentials: Credentials,
    session_path: PathBuf,
    client: RwLock<Option<Client>>,
    connected: AtomicBool,
    login_token: Mutex<Option<LoginToken>>,
    password_token: Mutex<Option<PasswordToken>>,
    // Access hashes of everything resolved so far, keyed by peer id.
    peers: std::sync::Mutex<HashMap<i64, PackedChat>>,
}

impl GrammersClient {
    pub fn new(credentials: Credentials, session_path: PathBuf) -> Self {
        Self {
            credentials,
            session_path,
            client: RwLock::new(None),
            connected: AtomicBool::new(false),
            login_token: Mutex::new(None),
            password_token: Mutex::new(None),
            peers: std::sync::Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self) -> Result<Client> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(BridgeError::NotConnected)
    }

    fn save_session(&self, client: &Client) {
        match client.session().save_to_file(&self.session_path) {
            Ok(()) => debug!("Session saved to {}", self.session_path.display()),
            Err(e) => warn!(
                "Failed to save session to {}: {}",
                self.session_path.display(),
                e
            ),
        }
    }

    fn finish_sign_in(&self, client: &Client, user: User) -> Identity {
        self.save_session(client);
        identity_of(&user)
    }

    fn remember(&self, chat: &Chat) -> Peer {
        if let Ok(mut peers) = self.peers.lock() {
            peers.insert(chat.id(), chat.pack());
        }
        peer_of(chat)
    }

    fn packed(&self, peer: &Peer) -> Result<PackedChat> {
        self.peers
            .lock()
            .ok()
            .and_then(|peers| peers.get(&peer.id).cloned())
            .ok_or_else(|| BridgeError::Remote(format!("Peer {} has not been resolved", peer.id)))
    }

    /// Phone numbers are looked up among the account's contacts first, then
    /// among its dialogs.
    async fn find_by_phone(&self, client: &Client, phone: &str) -> Result<Chat> {
        let contacts = client
            .invoke(&tl::functions::contacts::GetContacts { hash: 0 })
            .await
            .map_err(BridgeError::remote)?;

        if let tl::enums::contacts::Contacts::Contacts(contacts) = contacts {
            let found = contacts
                .users
                .into_iter()
                .map(|user| Chat::User(User::from_raw(user)))
                .find(|chat| phone_matches(chat, phone));
            if let Some(chat) = found {
                return Ok(chat);
            }
        }

        debug!("+{} is not a contact, searching dialogs", phone);
        self.find_in_dialogs(client, &PeerRef::Phone(phone.to_string()))
            .await
    }

    /// Bare ids carry no access hash, so they can only be found among chats
    /// the account already has a dialog with.
    async fn find_in_dialogs(&self, client: &Client, reference: &PeerRef) -> Result<Chat> {
        let mut dialogs = client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(BridgeError::remote)? {
            let chat = dialog.chat();
            let matched = match reference {
                PeerRef::Id(id) => chat.id() == *id || marked_id(chat) == *id,
                PeerRef::Phone(phone) => phone_matches(chat, phone),
                _ => false,
            };
            if matched {
                return Ok(chat.clone());
            }
        }

        Err(BridgeError::Remote(format!(
            "Cannot find any entity corresponding to \"{}\"",
            reference
        )))
    }
}

fn identity_of(user: &User) -> Identity {
    Identity {
        id: user.id(),
        username: user.username().map(str::to_string),
    }
}

fn peer_of(chat: &Chat) -> Peer {
    let (kind, title) = match chat {
        Chat::User(_) => (PeerKind::User, None),
        Chat::Group(group) if group.is_megagroup() => {
            (PeerKind::Channel, Some(chat.name().to_string()))
        }
        Chat::Group(_) => (PeerKind::Chat, Some(chat.name().to_string())),
        Chat::Channel(_) => (PeerKind::Channel, Some(chat.name().to_string())),
    };

    Peer {
        id: chat.id(),
        kind,
        title,
        username: chat.username().map(str::to_string),
    }
}

/// Bot-API style id (`-100…` for channels and supergroups, `-…` for basic
/// groups), which is what most callers copy around.
fn marked_id(chat: &Chat) -> i64 {
    match chat {
        Chat::User(_) => chat.id(),
        Chat::Group(group) if group.is_megagroup() => -1_000_000_000_000 - chat.id(),
        Chat::Group(_) => -chat.id(),
        Chat::Channel(_) => -1_000_000_000_000 - chat.id(),
    }
}

fn phone_matches(chat: &Chat, phone: &str) -> bool {
    match chat {
        Chat::User(user) => user.phone() == Some(phone),
        _ => false,
    }
}

#[async_trait]
impl MessengerClient for GrammersClient {
    async fn connect(&self) -> Result<()> {
        let mut slot = self.client.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let session = Session::load_file_or_create(&self.session_path)?;
        let client = Client::connect(Config {
            session,
            api_id: self.credentials.api_id,
            api_hash: self.credentials.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(BridgeError::remote)?;

        info!(
            "Connected to Telegram with session {}",
            self.session_path.display()
        );
        *slot = Some(client);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let client = self.client.write().await.take();
        self.connected.store(false, Ordering::SeqCst);

        if let Some(client) = client {
            self.save_session(&client);
            drop(client);
            info!("Telegram session closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn request_login_code(&self, phone: &str) -> Result<String> {
        let client = self.client().await?;
        let token = client
            .request_login_code(phone)
            .await
            .map_err(BridgeError::remote)?;

        *self.login_token.lock().await = Some(token);
        *self.password_token.lock().await = None;

        Ok(uuid::Uuid::new_v4().simple().to_string())
    }

    async fn sign_in(&self, _phone: &str, code: &str) -> Result<Identity> {
        let client = self.client().await?;
        let login_token = self.login_token.lock().await;
        let token = login_token
            .as_ref()
            .ok_or_else(|| BridgeError::Remote("No login code has been requested".to_string()))?;

        match client.sign_in(token, code).await {
            Ok(user) => Ok(self.finish_sign_in(&client, user)),
            Err(SignInError::PasswordRequired(password_token)) => {
                *self.password_token.lock().await = Some(password_token);
                Err(BridgeError::PasswordRequired)
            }
            Err(e) => Err(BridgeError::remote(e)),
        }
    }

    async fn sign_in_with_password(&self, code: &str, password: &str) -> Result<Identity> {
        let client = self.client().await?;

        let pending = self.password_token.lock().await.take();
        let password_token = match pending {
            Some(token) => token,
            None => {
                // The code has not been submitted yet; doing so yields the
                // password challenge (or a finished login without 2FA).
                let login_token = self.login_token.lock().await;
                let token = login_token.as_ref().ok_or_else(|| {
                    BridgeError::Remote("No login code has been requested".to_string())
                })?;
                match client.sign_in(token, code).await {
                    Ok(user) => return Ok(self.finish_sign_in(&client, user)),
                    Err(SignInError::PasswordRequired(token)) => token,
                    Err(e) => return Err(BridgeError::remote(e)),
                }
            }
        };

        let user = client
            .check_password(password_token, password)
            .await
            .map_err(BridgeError::remote)?;
        Ok(self.finish_sign_in(&client, user))
    }

    async fn get_me(&self) -> Result<Identity> {
        let client = self.client().await?;
        let user = client.get_me().await.map_err(BridgeError::remote)?;
        Ok(identity_of(&user))
    }

    async fn resolve_peer(&self, reference: &PeerRef) -> Result<Peer> {
        let client = self.client().await?;

        let chat = match reference {
            PeerRef::Me => Chat::User(client.get_me().await.map_err(BridgeError::remote)?),
            PeerRef::Username(username) => client
                .resolve_username(username)
                .await
                .map_err(BridgeError::remote)?
                .ok_or_else(|| {
                    BridgeError::Remote(format!("No user has \"{}\" as username", username))
                })?,
            PeerRef::Phone(phone) => self.find_by_phone(&client, phone).await?,
            PeerRef::Id(_) => self.find_in_dialogs(&client, reference).await?,
        };

        Ok(self.remember(&chat))
    }

    async fn send_text(&self, peer: &Peer, text: &str, mode: ParseMode) -> Result<i32> {
        let client = self.client().await?;
        let packed = self.packed(peer)?;

        let message = match mode {
            ParseMode::Html => InputMessage::html(text),
            ParseMode::Markdown => InputMessage::markdown(text),
            ParseMode::Plain => InputMessage::text(text),
        };

        let sent = client
            .send_message(packed, message)
            .await
            .map_err(BridgeError::remote)?;
        Ok(sent.id())
    }

    async fn send_file(
        &self,
        peer: &Peer,
        path: &Path,
        caption: &str,
        kind: UploadKind,
    ) -> Result<i32> {
        let client = self.client().await?;
        let packed = self.packed(peer)?;

        let uploaded = client.upload_file(path).await?;
        let message = match kind {
            UploadKind::Photo => InputMessage::html(caption).photo(uploaded),
            UploadKind::Document => InputMessage::html(caption).document(uploaded),
        };

        let sent = client
            .send_message(packed, message)
            .await
            .map_err(BridgeError::remote)?;
        Ok(sent.id())
    }

    async fn get_messages(&self, peer: &Peer, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let client = self.client().await?;
        let packed = self.packed(peer)?;

        let mut messages = client.iter_messages(packed);
        if let Some(limit) = limit {
            messages = messages.limit(limit);
        }

        let mut entries = Vec::new();
        while let Some(message) = messages.next().await.map_err(BridgeError::remote)? {
            entries.push(HistoryEntry {
                id: message.id(),
                text: message.text().to_string(),
                date: Some(message.date()),
                from_id: message.sender().map(|sender| sender.id()),
            });
        }
        Ok(entries)
    }

    async fn import_chat_invite(&self, invite: &str) -> Result<()> {
        let client = self.client().await?;
        let hash = invite.trim_start_matches('+').to_string();

        client
            .invoke(&tl::functions::messages::ImportChatInvite { hash })
            .await
            .map_err(BridgeError::remote)?;
        Ok(())
    }

    async fn get_dialogs(&self, limit: Option<usize>) -> Result<Vec<Peer>> {
        let client = self.client().await?;

        let mut dialogs = client.iter_dialogs();
        if let Some(limit) = limit {
            dialogs = dialogs.limit(limit);
        }

        let mut peers = Vec::new();
        while let Some(dialog) = dialogs.next().await.map_err(BridgeError::remote)? {
            peers.push(self.remember(dialog.chat()));
        }
        Ok(peers)
    }
}
