use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::audit::entity_header;
use crate::database::models::{Lead, LeadChanges};
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::workflow::{self, lead::LeadStatus};

#[derive(Debug, Deserialize)]
pub struct LeadQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<LeadStatus, ApiError> {
    raw.parse::<LeadStatus>()
        .map_err(|e| ApiError::field_error("status", e.to_string()))
}

/// GET /leads - List live leads, optionally by stage
pub async fn list(State(state): State<AppState>, Query(query): Query<LeadQuery>) -> ApiResult<Vec<Lead>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let leads = state.leads.list(status).await?;
    Ok(ApiResponse::success(leads))
}

/// PUT /leads/:id - Edit lead details (not its stage)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<LeadChanges>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = json_body(payload)?;
    if changes.service_id.trim().is_empty() {
        return Err(ApiError::field_error("service_id", "is required"));
    }

    state.leads.update(&id, &changes).await?;
    Ok((entity_header("leads", &id), ApiResponse::no_content()))
}

/// PUT /leads/:id/status - Advance the lead one stage
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let target = parse_status(&json_body(payload)?.status)?;

    workflow::advance(state.leads.as_ref(), &id, target).await?;
    Ok((entity_header("leads", &id), ApiResponse::no_content()))
}

/// DELETE /leads/:id - Soft-delete a lead
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    state.leads.soft_delete(&id).await?;
    Ok((entity_header("leads", &id), ApiResponse::no_content()))
}
