use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::telegram::Credentials;

pub const DEFAULT_CONFIG_PATH: &str = "config/bridge.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_session_name")]
    pub session_name: String,
    #[serde(default = "default_session_dir")]
    pub session_dir: String,
    /// Bearer token required on every route but `/health`. Unset means open.
    pub api_key: Option<String>,
    /// Credentials to configure at startup instead of waiting for `/configure`.
    pub telegram: Option<Credentials>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_session_name() -> String {
    "metamill".to_string()
}

fn default_session_dir() -> String {
    ".".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_name: default_session_name(),
            session_dir: default_session_dir(),
            api_key: None,
            telegram: None,
        }
    }
}

impl Config {
    /// Reads `BRIDGE_CONFIG` (or `config/bridge.toml`) if it exists, then
    /// applies environment overrides.
    pub async fn load() -> Result<Self> {
        let path = std::env::var("BRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config = if Path::new(&path).exists() {
            Self::load_file(&path).await?
        } else {
            debug!("No config file at {}, using defaults", path);
            Self::default()
        };

        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub async fn load_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config {}: {}", path, e))?;

        let config = Self::from_toml_str(&content)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", path, e))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment values win over the file. The three `TELEGRAM_*`
    /// variables only take effect together.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(host) = lookup("BRIDGE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("BRIDGE_PORT") {
            self.port = port
                .parse()
                .map_err(|e| anyhow!("Invalid BRIDGE_PORT '{}': {}", port, e))?;
        }
        if let Some(api_key) = lookup("BRIDGE_API_KEY") {
            self.api_key = Some(api_key).filter(|key| !key.is_empty());
        }
        if let Some(session_name) = lookup("BRIDGE_SESSION_NAME") {
            self.session_name = session_name;
        }
        if let Some(session_dir) = lookup("BRIDGE_SESSION_DIR") {
            self.session_dir = session_dir;
        }

        match (
            lookup("TELEGRAM_API_ID"),
            lookup("TELEGRAM_API_HASH"),
            lookup("TELEGRAM_PHONE"),
        ) {
            (Some(api_id), Some(api_hash), Some(phone)) => {
                let api_id = api_id
                    .parse()
                    .map_err(|e| anyhow!("Invalid TELEGRAM_API_ID '{}': {}", api_id, e))?;
                self.telegram = Some(Credentials {
                    api_id,
                    api_hash,
                    phone,
                });
            }
            (None, None, None) => {}
            _ => warn!(
                "Ignoring partial Telegram credentials; set TELEGRAM_API_ID, TELEGRAM_API_HASH and TELEGRAM_PHONE together"
            ),
        }

        Ok(self)
    }
}
