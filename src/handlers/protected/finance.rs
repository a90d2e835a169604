use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::audit::entity_header;
use crate::database::models::{AccountReceivable, Commission, ReceivableStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::workflow;

#[derive(Debug, Deserialize)]
pub struct ReceivableQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommissionQuery {
    #[serde(default)]
    pub pending: bool,
}

/// GET /receivables - List receivables, optionally by status
pub async fn list_receivables(
    State(state): State<AppState>,
    Query(query): Query<ReceivableQuery>,
) -> ApiResult<Vec<AccountReceivable>> {
    let status = query
        .status
        .as_deref()
        .map(|raw| raw.parse::<ReceivableStatus>())
        .transpose()
        .map_err(|e| ApiError::field_error("status", e.to_string()))?;

    let receivables = state.finance.list_receivables(status).await?;
    Ok(ApiResponse::success(receivables))
}

/// PUT /receivables/:id/pay - Mark an open receivable paid
pub async fn pay(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    workflow::mark_paid(state.finance.as_ref(), &id).await?;
    Ok((entity_header("receivables", &id), ApiResponse::no_content()))
}

/// GET /commissions - List commissions, `?pending=true` for unapproved only
pub async fn list_commissions(
    State(state): State<AppState>,
    Query(query): Query<CommissionQuery>,
) -> ApiResult<Vec<Commission>> {
    let commissions = state.finance.list_commissions(query.pending).await?;
    Ok(ApiResponse::success(commissions))
}

/// PUT /commissions/:id/approve - Approve a commission as the caller
pub async fn approve(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    workflow::approve_commission(state.finance.as_ref(), &id, &user.user_id).await?;
    Ok((entity_header("commissions", &id), ApiResponse::no_content()))
}
