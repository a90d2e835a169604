use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

use super::status_column;
use crate::workflow::lead::LeadStatus;

/// A sales opportunity moving through the lead pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub customer_id: String,
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoter_id: Option<String>,
    pub status: LeadStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// New lead at the start of the pipeline
    pub fn new(customer_id: String, service_id: String, promoter_id: Option<String>, notes: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            customer_id,
            service_id,
            promoter_id,
            status: LeadStatus::Lead,
            notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Editable fields of a lead. Status is only changed through the pipeline guard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeadChanges {
    pub service_id: String,
    pub promoter_id: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl<'r> FromRow<'r, PgRow> for Lead {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            service_id: row.try_get("service_id")?,
            promoter_id: row.try_get("promoter_id")?,
            status: status_column(row, "status")?,
            notes: row.try_get::<Option<String>, _>("notes")?.unwrap_or_default(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}
