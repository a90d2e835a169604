use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::{issue_token, verify_password};
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid credentials")
}

/// POST /login - Exchange email and password for a signed token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let credentials = json_body(payload)?;

    let Some(user) = state.users.find_by_email(&credentials.email).await? else {
        tracing::debug!("Login for unknown email rejected");
        return Err(invalid_credentials());
    };

    // bcrypt is CPU bound, keep it off the async workers
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&credentials.password, &hash))
        .await
        .map_err(|e| {
            tracing::error!("Password check panicked: {}", e);
            ApiError::internal_server_error("Failed to verify credentials")
        })?;

    if !matches {
        tracing::debug!("Login for user {} rejected: wrong password", user.id);
        return Err(invalid_credentials());
    }

    let token = issue_token(&user.id, &user.role, &state.config.security).map_err(|e| {
        tracing::error!("Token issuance failed: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    tracing::info!("User {} signed in", user.id);
    Ok(ApiResponse::success(LoginResponse { token }))
}
