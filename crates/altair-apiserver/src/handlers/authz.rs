//! Authorization handler: token check against registry records.

use crate::error::{ApiError, Result};
use crate::AppState;
use altair_core::keys::auth_key;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Body of the authorization endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user: String,
}

/// Authorization verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub authorized: bool,
    pub message: String,
}

/// POST /authorize
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AuthorizationRequest>,
) -> Result<Json<AuthorizationResponse>> {
    if request.token.is_empty() || request.user.is_empty() {
        return Err(ApiError::BadRequest(
            "Token and user fields are required".to_string(),
        ));
    }

    let stored = state
        .registry
        .get(&auth_key(&request.user))
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read auth record: {}", e)))?;

    let response = match stored {
        None => AuthorizationResponse {
            authorized: false,
            message: "User not found".to_string(),
        },
        Some(token) if token != request.token => AuthorizationResponse {
            authorized: false,
            message: "Invalid token".to_string(),
        },
        Some(_) => AuthorizationResponse {
            authorized: true,
            message: "Authorization successful".to_string(),
        },
    };

    info!(
        "Authorization for user {}: {}",
        request.user, response.authorized
    );

    Ok(Json(response))
}
