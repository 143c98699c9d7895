//! In-memory Telegram account for testing
//!
//! `FakeTelegram` is the factory handed to `ClientManager`; every client it
//! creates shares one `FakeState`, so tests can inspect what reached the
//! "remote" side after driving the manager or the HTTP router.

use async_trait::async_trait;
use bridge::errors::{BridgeError, Result};
use bridge::telegram::{
    ClientFactory, Credentials, HistoryEntry, Identity, MessengerClient, ParseMode, Peer,
    PeerKind, PeerRef, UploadKind,
};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const VALID_CODE: &str = "12345";
pub const CODE_HASH: &str = "3f1c2a9d";

#[derive(Debug, Clone, PartialEq)]
pub struct SentText {
    pub peer_id: i64,
    pub text: String,
    pub mode: ParseMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentFile {
    pub peer_id: i64,
    pub path: PathBuf,
    pub caption: String,
    pub kind: UploadKind,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub created: usize,
    pub connects: usize,
    pub disconnects: usize,
    pub fail_connect: bool,
    pub two_factor_password: Option<String>,
    pub code_requested: bool,
    pub authorized: bool,
    /// Keyed by username or id.
    pub peers: HashMap<String, Peer>,
    /// Keyed by phone number digits.
    pub contacts: HashMap<String, Peer>,
    pub history: Vec<HistoryEntry>,
    pub dialogs: Vec<Peer>,
    pub resolved: Vec<PeerRef>,
    pub sent_texts: Vec<SentText>,
    pub sent_files: Vec<SentFile>,
    pub imported_invites: Vec<String>,
    pub last_credentials: Option<Credentials>,
    next_message_id: i32,
}

pub fn me() -> Identity {
    Identity {
        id: 1000,
        username: Some("bridge_owner".to_string()),
    }
}

fn user(id: i64, username: Option<&str>) -> Peer {
    Peer {
        id,
        kind: PeerKind::User,
        title: None,
        username: username.map(str::to_string),
    }
}

fn titled(id: i64, kind: PeerKind, title: &str, username: Option<&str>) -> Peer {
    Peer {
        id,
        kind,
        title: Some(title.to_string()),
        username: username.map(str::to_string),
    }
}

/// `count` messages, newest first, every fifth one without a date.
pub fn history(count: usize) -> Vec<HistoryEntry> {
    (0..count)
        .map(|i| {
            let id = (count - i) as i32;
            HistoryEntry {
                id,
                text: format!("message {}", id),
                date: (i % 5 != 4).then(|| {
                    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                        + chrono::Duration::minutes(id as i64)
                }),
                from_id: Some(1),
            }
        })
        .collect()
}

pub struct FakeTelegram {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTelegram {
    pub fn new() -> Arc<Self> {
        let durov = user(1, Some("durov"));
        let channel = titled(
            2,
            PeerKind::Channel,
            "Some Public Channel",
            Some("somepublicchannel"),
        );
        let contact = user(3, None);
        let group = titled(-4, PeerKind::Chat, "Family", None);
        // Saved contact without an open dialog
        let colleague = user(5, None);

        let mut peers = HashMap::new();
        peers.insert("durov".to_string(), durov.clone());
        peers.insert("somepublicchannel".to_string(), channel.clone());
        peers.insert("3".to_string(), contact.clone());
        peers.insert("-4".to_string(), group.clone());

        let mut contacts = HashMap::new();
        contacts.insert("15551234567".to_string(), contact.clone());
        contacts.insert("15559990000".to_string(), colleague);

        let state = FakeState {
            peers,
            contacts,
            history: history(10),
            dialogs: vec![channel, durov, contact, group],
            next_message_id: 500,
            ..FakeState::default()
        };

        Arc::new(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn with_two_factor(self: Arc<Self>, password: &str) -> Arc<Self> {
        self.state().two_factor_password = Some(password.to_string());
        self
    }

    pub fn failing_connect(self: Arc<Self>) -> Arc<Self> {
        self.state().fail_connect = true;
        self
    }

    pub fn with_history(self: Arc<Self>, count: usize) -> Arc<Self> {
        self.state().history = history(count);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// A connected client outside of any manager, for calling operation
    /// functions directly.
    pub async fn connected_client(&self) -> Arc<dyn MessengerClient> {
        let client = self.create(&crate::common::credentials());
        client.connect().await.unwrap();
        client
    }
}

impl ClientFactory for FakeTelegram {
    fn create(&self, credentials: &Credentials) -> Arc<dyn MessengerClient> {
        let mut state = self.state();
        state.created += 1;
        state.last_credentials = Some(credentials.clone());

        Arc::new(FakeClient {
            state: self.state.clone(),
            connected: AtomicBool::new(false),
        })
    }
}

pub struct FakeClient {
    state: Arc<Mutex<FakeState>>,
    connected: AtomicBool,
}

impl FakeClient {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn require_connection(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    fn check_code(state: &FakeState, code: &str) -> Result<()> {
        if !state.code_requested {
            return Err(BridgeError::Remote(
                "No login code has been requested".to_string(),
            ));
        }
        if code != VALID_CODE {
            return Err(BridgeError::Remote(
                "The phone code entered was invalid (PHONE_CODE_INVALID)".to_string(),
            ));
        }
        Ok(())
    }

    fn next_message_id(state: &mut FakeState) -> i32 {
        state.next_message_id += 1;
        state.next_message_id
    }
}

#[async_trait]
impl MessengerClient for FakeClient {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state();
        if state.fail_connect {
            return Err(BridgeError::Remote("Connection refused".to_string()));
        }
        state.connects += 1;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state().disconnects += 1;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn request_login_code(&self, _phone: &str) -> Result<String> {
        self.require_connection()?;
        self.state().code_requested = true;
        Ok(CODE_HASH.to_string())
    }

    async fn sign_in(&self, _phone: &str, code: &str) -> Result<Identity> {
        self.require_connection()?;
        let mut state = self.state();
        Self::check_code(&state, code)?;
        if state.two_factor_password.is_some() {
            return Err(BridgeError::PasswordRequired);
        }
        state.authorized = true;
        Ok(me())
    }

    async fn sign_in_with_password(&self, code: &str, password: &str) -> Result<Identity> {
        self.require_connection()?;
        let mut state = self.state();
        Self::check_code(&state, code)?;
        match state.two_factor_password.as_deref() {
            Some(expected) if expected != password => Err(BridgeError::Remote(
                "The provided password is invalid (PASSWORD_HASH_INVALID)".to_string(),
            )),
            _ => {
                state.authorized = true;
                Ok(me())
            }
        }
    }

    async fn get_me(&self) -> Result<Identity> {
        self.require_connection()?;
        if !self.state().authorized {
            return Err(BridgeError::Remote(
                "The key is not registered in the system (AUTH_KEY_UNREGISTERED)".to_string(),
            ));
        }
        Ok(me())
    }

    async fn resolve_peer(&self, reference: &PeerRef) -> Result<Peer> {
        self.require_connection()?;
        let mut state = self.state();
        state.resolved.push(reference.clone());

        let found = match reference {
            PeerRef::Me => {
                let me = me();
                return Ok(user(me.id, me.username.as_deref()));
            }
            PeerRef::Username(name) => state.peers.get(name),
            PeerRef::Phone(phone) => state.contacts.get(phone),
            PeerRef::Id(id) => state.peers.get(&id.to_string()),
        };

        found.cloned().ok_or_else(|| {
            BridgeError::Remote(format!(
                "Cannot find any entity corresponding to \"{}\"",
                reference
            ))
        })
    }

    async fn send_text(&self, peer: &Peer, text: &str, mode: ParseMode) -> Result<i32> {
        self.require_connection()?;
        let mut state = self.state();
        state.sent_texts.push(SentText {
            peer_id: peer.id,
            text: text.to_string(),
            mode,
        });
        Ok(Self::next_message_id(&mut state))
    }

    async fn send_file(
        &self,
        peer: &Peer,
        path: &Path,
        caption: &str,
        kind: UploadKind,
    ) -> Result<i32> {
        self.require_connection()?;
        std::fs::metadata(path)?;

        let mut state = self.state();
        state.sent_files.push(SentFile {
            peer_id: peer.id,
            path: path.to_path_buf(),
            caption: caption.to_string(),
            kind,
        });
        Ok(Self::next_message_id(&mut state))
    }

    async fn get_messages(&self, _peer: &Peer, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        self.require_connection()?;
        let history = self.state().history.clone();
        Ok(match limit {
            Some(limit) => history.into_iter().take(limit).collect(),
            None => history,
        })
    }

    async fn import_chat_invite(&self, invite: &str) -> Result<()> {
        self.require_connection()?;
        if invite == "+expired" {
            return Err(BridgeError::Remote(
                "The chat the user tried to join has expired (INVITE_HASH_EXPIRED)".to_string(),
            ));
        }
        self.state().imported_invites.push(invite.to_string());
        Ok(())
    }

    async fn get_dialogs(&self, limit: Option<usize>) -> Result<Vec<Peer>> {
        self.require_connection()?;
        let dialogs = self.state().dialogs.clone();
        Ok(dialogs.into_iter().take(limit.unwrap_or(usize::MAX)).collect())
    }
}
