// handlers/mod.rs - HTTP handlers by security tier
//
// Public (no token) -> Protected (JWT, optionally role-restricted).
// Role allow-lists are attached to route groups in app.rs, not here.

pub mod protected;
pub mod public;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::ApiError;

/// Unwrap a JSON body, reporting malformed input as 400 instead of axum's 422
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))
}
