use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::audit::entity_header;
use crate::database::models::{Contract, ContractChanges, ContractStatus};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewContract {
    pub customer_id: String,
    pub service_id: String,
    pub promoter_id: Option<String>,
    pub value_total: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContractUpdate {
    pub value_total: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
}

fn parse_status(raw: &str) -> Result<ContractStatus, ApiError> {
    raw.parse::<ContractStatus>()
        .map_err(|e| ApiError::field_error("status", e.to_string()))
}

fn check_terms(value_total: Decimal, start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ApiError> {
    if value_total.is_sign_negative() {
        return Err(ApiError::field_error("value_total", "must not be negative"));
    }
    if end.is_some_and(|end| end < start) {
        return Err(ApiError::field_error("end_date", "must not precede start_date"));
    }
    Ok(())
}

/// GET /contracts - List live contracts, optionally by status
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ContractQuery>,
) -> ApiResult<Vec<Contract>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let contracts = state.contracts.list(status).await?;
    Ok(ApiResponse::success(contracts))
}

/// POST /contracts - Create a contract for an existing customer and service
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewContract>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = json_body(payload)?;
    check_terms(input.value_total, input.start_date, input.end_date)?;
    let status = input.status.as_deref().map(parse_status).transpose()?.unwrap_or_default();

    let now = Utc::now();
    let contract = Contract {
        id: Uuid::now_v7().to_string(),
        customer_id: input.customer_id,
        service_id: input.service_id,
        promoter_id: input.promoter_id,
        value_total: input.value_total,
        start_date: input.start_date,
        end_date: input.end_date,
        status,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    // A dangling customer or service is a client error, not a missing contract
    state.contracts.create(&contract).await.map_err(|e| match e {
        DatabaseError::NotFound(msg) => ApiError::bad_request(msg),
        other => other.into(),
    })?;

    tracing::info!("Created contract {}", contract.id);

    let location = [(header::LOCATION, format!("/contracts/{}", contract.id))];
    let entity = entity_header("contracts", &contract.id);
    Ok((location, entity, ApiResponse::created(contract)))
}

/// PUT /contracts/:id - Replace contract terms and status
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ContractUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = json_body(payload)?;
    check_terms(input.value_total, input.start_date, input.end_date)?;

    // Any known status may follow any other
    let changes = ContractChanges {
        value_total: input.value_total,
        start_date: input.start_date,
        end_date: input.end_date,
        status: parse_status(&input.status)?,
    };

    state.contracts.update(&id, &changes).await?;
    Ok((entity_header("contracts", &id), ApiResponse::no_content()))
}

/// DELETE /contracts/:id - Soft-delete a contract
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    state.contracts.soft_delete(&id).await?;
    Ok((entity_header("contracts", &id), ApiResponse::no_content()))
}
