//! Middleware for the bridge server
//!
//! Provides the optional bearer-token check.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::server::AppState;

/// Extractor that validates the API key from the Authorization header.
/// When no key is configured every request passes. `/health` and `/status`
/// do not take it.
///
/// # Example
/// ```ignore
/// async fn my_handler(
///     _auth: ApiKeyAuth,
///     State(state): State<AppState>,
/// ) -> Json<ApiResponse> {
///     // API key is already validated here
/// }
/// ```
pub struct ApiKeyAuth;

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_key.as_deref() else {
            return Ok(ApiKeyAuth);
        };

        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "));

        match token {
            Some(token) if token == expected => Ok(ApiKeyAuth),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
