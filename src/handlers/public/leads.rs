use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::audit::entity_header;
use crate::database::models::Lead;
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct NewLead {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub service_id: String,
    pub promoter_id: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// POST /leads - Capture a lead from the public site
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewLead>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = json_body(payload)?;

    if input.customer_id.trim().is_empty() {
        return Err(ApiError::field_error("customer_id", "is required"));
    }
    if input.service_id.trim().is_empty() {
        return Err(ApiError::field_error("service_id", "is required"));
    }

    let lead = Lead::new(input.customer_id, input.service_id, input.promoter_id, input.notes);
    state.leads.create(&lead).await?;

    tracing::info!("Created lead {}", lead.id);

    let location = [(header::LOCATION, format!("/leads/{}", lead.id))];
    let entity = entity_header("leads", &lead.id);
    Ok((location, entity, ApiResponse::created(lead)))
}
