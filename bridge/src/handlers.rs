//! HTTP request handlers for the bridge

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::BridgeError;
use crate::middleware::ApiKeyAuth;
use crate::server::AppState;
use crate::telegram::{methods, ClientStatus, Credentials};
use crate::types::*;

pub type ApiResult = Result<Json<ApiResponse>, (StatusCode, Json<ApiResponse>)>;

fn bad_request(err: BridgeError) -> (StatusCode, Json<ApiResponse>) {
    warn!("Request failed: {}", err);
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(err.to_string())),
    )
}

// === Service handlers ===

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn configure(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<ConfigureRequest>,
) -> Json<ApiResponse> {
    state
        .telegram
        .configure(Credentials {
            api_id: request.api_id,
            api_hash: request.api_hash,
            phone: request.phone,
        })
        .await;

    Json(ApiResponse::success_with_message("Client configured"))
}

/// Never fails; every probe error reads as `false`. Open like `/health`, so
/// supervisors can poll it without the key.
pub async fn status(State(state): State<AppState>) -> Json<ClientStatus> {
    let status = state.telegram.status().await;
    debug!("Status: {:?}", status);
    Json(status)
}

pub async fn disconnect(_auth: ApiKeyAuth, State(state): State<AppState>) -> Json<ApiResponse> {
    state.telegram.disconnect().await;
    Json(ApiResponse::success())
}

// === Authentication handlers ===

pub async fn send_code(_auth: ApiKeyAuth, State(state): State<AppState>) -> ApiResult {
    let phone_code_hash = state
        .telegram
        .send_code_request()
        .await
        .map_err(bad_request)?;

    Ok(Json(ApiResponse::success_with_code_hash(phone_code_hash)))
}

pub async fn sign_in(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult {
    if !state.telegram.is_configured().await {
        return Err(bad_request(BridgeError::NotConfigured));
    }

    state.telegram.connect().await;
    let user = state
        .telegram
        .sign_in(&request.code, request.password.as_deref())
        .await
        .map_err(bad_request)?;

    Ok(Json(ApiResponse::success_with_user(user)))
}

// === Messaging handlers ===

pub async fn send_message(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult {
    let client = state.telegram.ensure_connected().await.map_err(bad_request)?;
    let sent = methods::send_message(
        client.as_ref(),
        &request.receiver,
        &request.message,
        request.parse_mode.as_deref(),
    )
    .await
    .map_err(bad_request)?;

    Ok(Json(ApiResponse::success_with_sent(sent)))
}

pub async fn send_to_channel(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<SendChannelRequest>,
) -> ApiResult {
    let client = state.telegram.ensure_connected().await.map_err(bad_request)?;
    let sent = methods::send_to_channel(
        client.as_ref(),
        &request.channel,
        &request.message,
        request.parse_mode.as_deref(),
    )
    .await
    .map_err(bad_request)?;

    Ok(Json(ApiResponse::success_with_sent(sent)))
}

pub async fn send_media(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<SendMediaRequest>,
) -> ApiResult {
    let client = state.telegram.ensure_connected().await.map_err(bad_request)?;
    let sent = methods::send_media(
        client.as_ref(),
        &request.receiver,
        request.message.as_deref().unwrap_or_default(),
        &request.file_path,
    )
    .await
    .map_err(bad_request)?;

    Ok(Json(ApiResponse::success_with_sent(sent)))
}

// === Read handlers ===

pub async fn get_history(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<HistoryRequest>,
) -> ApiResult {
    let client = state.telegram.ensure_connected().await.map_err(bad_request)?;
    let messages = methods::get_history(client.as_ref(), &request.entity, request.limit)
        .await
        .map_err(bad_request)?;

    Ok(Json(ApiResponse::success_with_messages(messages)))
}

pub async fn join_channel(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<JoinChannelRequest>,
) -> ApiResult {
    let client = state.telegram.ensure_connected().await.map_err(bad_request)?;
    methods::join_channel(client.as_ref(), &request.channel_link)
        .await
        .map_err(bad_request)?;

    Ok(Json(ApiResponse::success()))
}

pub async fn list_dialogs(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Json(request): Json<DialogsRequest>,
) -> ApiResult {
    let client = state.telegram.ensure_connected().await.map_err(bad_request)?;
    let dialogs = methods::list_dialogs(client.as_ref(), request.limit)
        .await
        .map_err(bad_request)?;

    Ok(Json(ApiResponse::success_with_dialogs(dialogs)))
}
