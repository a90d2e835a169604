use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::sync::Arc;

use super::AuthUser;
use crate::error::ApiError;

/// Allow-list of roles for a group of routes. Must sit inside the JWT layer.
#[derive(Clone, Debug)]
pub struct RequireRole {
    roles: Arc<HashSet<String>>,
}

impl RequireRole {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: Arc::new(roles.into_iter().map(Into::into).collect()),
        }
    }

    pub fn permits(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Reject callers whose role is not in the allow-list with 403. A request
/// with no authenticated caller is rejected the same way.
pub async fn require_role(
    State(allowed): State<RequireRole>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let permitted = request
        .extensions()
        .get::<AuthUser>()
        .is_some_and(|user| allowed.permits(&user.role));

    if !permitted {
        return Err(ApiError::forbidden("Insufficient role for this resource"));
    }

    Ok(next.run(request).await)
}
