use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::app::AppState;
use crate::audit::{AuditAction, AuditFilter, AuditLog};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub entity: Option<String>,
    #[serde(alias = "user")]
    pub user_id: Option<String>,
    pub action: Option<String>,
    /// RFC 3339
    pub start: Option<String>,
    /// RFC 3339
    pub end: Option<String>,
    pub limit: Option<i64>,
}

fn parse_time(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| ApiError::field_error(field, "must be an RFC 3339 timestamp"))
    })
    .transpose()
}

impl TryFrom<AuditQuery> for AuditFilter {
    type Error = ApiError;

    fn try_from(query: AuditQuery) -> Result<Self, Self::Error> {
        let action = query
            .action
            .as_deref()
            .map(|raw| raw.parse::<AuditAction>())
            .transpose()
            .map_err(|e| ApiError::field_error("action", e))?;

        Ok(AuditFilter {
            start: parse_time("start", query.start.as_deref())?,
            end: parse_time("end", query.end.as_deref())?,
            entity_name: query.entity.filter(|s| !s.is_empty()),
            user_id: query.user_id.filter(|s| !s.is_empty()),
            action,
            limit: query.limit,
        })
    }
}

/// GET /audit-logs - Newest audit entries first
pub async fn list(State(state): State<AppState>, Query(query): Query<AuditQuery>) -> ApiResult<Vec<AuditLog>> {
    let filter = AuditFilter::try_from(query)?;
    let entries = state.audit_logs.list(&filter).await?;
    Ok(ApiResponse::success(entries))
}
