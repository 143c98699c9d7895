//! Error types for the bridge
//!
//! Every failure reaching the HTTP layer is one of these variants. Library
//! errors are collapsed to their string form at the point they are caught.

use std::fmt;

/// Main error type for the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Credentials have not been supplied yet
    NotConfigured,

    /// No client handle exists, or its session could not be opened
    NotConnected,

    /// The account has a cloud password and the code alone is not enough
    PasswordRequired,

    /// Any other failure reported by the remote service or the client library
    Remote(String),
}

impl BridgeError {
    /// Collapse an arbitrary library error into its display string.
    pub fn remote(err: impl fmt::Display) -> Self {
        BridgeError::Remote(err.to_string())
    }

    pub fn is_password_required(&self) -> bool {
        matches!(self, BridgeError::PasswordRequired)
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::NotConfigured => write!(f, "Client not configured"),
            BridgeError::NotConnected => write!(f, "Client not connected"),
            BridgeError::PasswordRequired => write!(f, "Password required"),
            BridgeError::Remote(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Remote(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
