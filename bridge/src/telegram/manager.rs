use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{ClientFactory, Credentials, Identity, MessengerClient};
use crate::errors::{BridgeError, Result};

/// Position on the authentication ladder, system wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthState {
    Unconfigured,
    Configured,
    Connected,
    CodeSent,
    Authorized,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientStatus {
    pub configured: bool,
    pub connected: bool,
    pub authorized: bool,
    pub state: AuthState,
}

/// Owns the credentials and the single client handle of the process.
///
/// The handle is created lazily on the first successful `connect()` and kept
/// for the lifetime of the manager; `disconnect()` only closes its session.
/// Creation and opening run under one async mutex so concurrent requests
/// never build two handles.
pub struct ClientManager {
    factory: Arc<dyn ClientFactory>,
    credentials: RwLock<Option<Credentials>>,
    client: Mutex<Option<Arc<dyn MessengerClient>>>,
    code_requested: AtomicBool,
    disconnected: AtomicBool,
}

impl ClientManager {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            credentials: RwLock::new(None),
            client: Mutex::new(None),
            code_requested: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Stores credentials unconditionally. Correctness is only checked by the
    /// remote service at connect time.
    pub async fn configure(&self, credentials: Credentials) {
        info!(
            "Telegram client configured for api_id {} ({})",
            credentials.api_id, credentials.phone
        );
        *self.credentials.write().await = Some(credentials);
    }

    pub async fn is_configured(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    async fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().await.clone()
    }

    /// Creates the handle if needed and opens its session. Failures are
    /// logged and reported as `false`.
    pub async fn connect(&self) -> bool {
        let Some(credentials) = self.credentials().await else {
            return false;
        };

        let mut slot = self.client.lock().await;
        let client = slot
            .get_or_insert_with(|| {
                info!("Creating Telegram client handle");
                self.factory.create(&credentials)
            })
            .clone();

        if !client.is_connected() {
            debug!("Opening Telegram session");
            if let Err(e) = client.connect().await {
                warn!("Failed to connect Telegram client: {}", e);
                return false;
            }
            self.disconnected.store(false, Ordering::SeqCst);
            info!("Telegram client connected");
        }

        client.is_connected()
    }

    /// Closes the session if one is open. Safe to call any number of times.
    pub async fn disconnect(&self) {
        let slot = self.client.lock().await;
        let Some(client) = slot.as_ref() else {
            return;
        };

        if !client.is_connected() {
            return;
        }

        match client.disconnect().await {
            Ok(()) => {
                self.disconnected.store(true, Ordering::SeqCst);
                info!("Telegram client disconnected");
            }
            Err(e) => warn!("Error while disconnecting Telegram client: {}", e),
        }
    }

    /// The current handle, without trying to connect.
    pub async fn handle(&self) -> Result<Arc<dyn MessengerClient>> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or(BridgeError::NotConnected)
    }

    /// Route guard for every remote operation: credentials first, then an
    /// open session.
    pub async fn ensure_connected(&self) -> Result<Arc<dyn MessengerClient>> {
        if !self.is_configured().await {
            return Err(BridgeError::NotConfigured);
        }
        if !self.connect().await {
            return Err(BridgeError::NotConnected);
        }
        self.handle().await
    }

    /// Asks Telegram to deliver a login code to the configured phone.
    pub async fn send_code_request(&self) -> Result<String> {
        let credentials = self.credentials().await.ok_or(BridgeError::NotConfigured)?;
        let client = self.ensure_connected().await?;

        let code_hash = client.request_login_code(&credentials.phone).await?;
        self.code_requested.store(true, Ordering::SeqCst);
        info!("Login code requested for {}", credentials.phone);

        Ok(code_hash)
    }

    /// Code sign-in, or the two-factor flow when a password is supplied.
    /// An empty password counts as none.
    pub async fn sign_in(&self, code: &str, password: Option<&str>) -> Result<Identity> {
        let client = self.handle().await?;

        let outcome = match password.filter(|p| !p.is_empty()) {
            Some(password) => client.sign_in_with_password(code, password).await,
            None => {
                let credentials = self.credentials().await.ok_or(BridgeError::NotConfigured)?;
                client.sign_in(&credentials.phone, code).await
            }
        };

        let identity = match outcome {
            Err(e) if e.is_password_required() => {
                info!("Account has a cloud password, waiting for it");
                return Err(e);
            }
            other => other?,
        };

        self.code_requested.store(false, Ordering::SeqCst);
        info!(
            "Signed in as {} ({})",
            identity.id,
            identity.username.as_deref().unwrap_or("no username")
        );
        Ok(identity)
    }

    pub async fn current_identity(&self) -> Result<Identity> {
        self.handle().await?.get_me().await
    }

    /// Never fails: any error, including a missing handle, reads as `false`.
    /// The underlying reason is only visible in debug logs.
    pub async fn is_authorized(&self) -> bool {
        match self.current_identity().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Authorization probe failed: {}", e);
                false
            }
        }
    }

    /// Status probe behind `/status`. Connects as a side effect, like every
    /// other route, and never returns an error.
    pub async fn status(&self) -> ClientStatus {
        let configured = self.is_configured().await;
        let connected = self.connect().await;
        let authorized = connected && self.is_authorized().await;

        let state = self.auth_state(configured, connected, authorized);

        ClientStatus {
            configured,
            connected,
            authorized,
            state,
        }
    }

    /// Position on the ladder for one probe result.
    fn auth_state(&self, configured: bool, connected: bool, authorized: bool) -> AuthState {
        if !configured {
            AuthState::Unconfigured
        } else if authorized {
            AuthState::Authorized
        } else if connected && self.code_requested.load(Ordering::SeqCst) {
            AuthState::CodeSent
        } else if connected {
            AuthState::Connected
        } else if self.disconnected.load(Ordering::SeqCst) {
            AuthState::Disconnected
        } else {
            AuthState::Configured
        }
    }
}
