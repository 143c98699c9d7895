use serde::{Deserialize, Serialize};

use crate::telegram::{DialogSummary, HistoryEntry, Identity, SentMessage};

// === REQUEST STRUCTURES ===

#[derive(Debug, Deserialize)]
pub struct ConfigureRequest {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub code: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// An absent `parse_mode` means HTML; an explicit `null` means plain text.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver: String,
    pub message: String,
    #[serde(default = "default_parse_mode")]
    pub parse_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendChannelRequest {
    pub channel: String,
    pub message: String,
    #[serde(default = "default_parse_mode")]
    pub parse_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMediaRequest {
    pub receiver: String,
    #[serde(default)]
    pub message: Option<String>,
    pub file_path: String,
}

/// `limit: null` asks for the whole history.
#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub entity: String,
    #[serde(default = "default_limit")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct JoinChannelRequest {
    pub channel_link: String,
}

#[derive(Debug, Deserialize)]
pub struct DialogsRequest {
    #[serde(default = "default_limit")]
    pub limit: Option<usize>,
}

fn default_parse_mode() -> Option<String> {
    Some("html".to_string())
}

fn default_limit() -> Option<usize> {
    Some(100)
}

// === RESPONSE STRUCTURES ===

/// Flat reply body shared by every route except `/health` and `/status`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_code_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<HistoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialogs: Option<Vec<DialogSummary>>,
}

impl ApiResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn error(detail: String) -> Self {
        Self {
            success: false,
            detail: Some(detail),
            ..Self::default()
        }
    }

    pub fn success_with_message(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::success()
        }
    }

    pub fn success_with_code_hash(phone_code_hash: String) -> Self {
        Self {
            phone_code_hash: Some(phone_code_hash),
            ..Self::success()
        }
    }

    pub fn success_with_user(user: Identity) -> Self {
        Self {
            user: Some(user),
            ..Self::success()
        }
    }

    pub fn success_with_sent(sent: SentMessage) -> Self {
        Self {
            message_id: Some(sent.message_id),
            chat_id: sent.chat_id,
            ..Self::success()
        }
    }

    pub fn success_with_messages(messages: Vec<HistoryEntry>) -> Self {
        Self {
            messages: Some(messages),
            ..Self::success()
        }
    }

    pub fn success_with_dialogs(dialogs: Vec<DialogSummary>) -> Self {
        Self {
            dialogs: Some(dialogs),
            ..Self::success()
        }
    }
}
