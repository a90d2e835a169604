use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{bearer_token, validate_token, Claims};
use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Authenticated caller extracted from a verified token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts the caller.
///
/// The caller is attached to the request for handlers and role checks, and to
/// the response so outer layers can attribute the request after it completes.
pub async fn jwt_auth_middleware(
    State(security): State<Arc<SecurityConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let claims = bearer_token(header_value).and_then(|token| validate_token(token, &security))?;

    let auth_user = AuthUser::from(claims);
    request.extensions_mut().insert(auth_user.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(auth_user);
    Ok(response)
}
