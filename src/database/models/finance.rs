use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use std::str::FromStr;

use super::{status_column, UnknownStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceivableStatus {
    Open,
    Paid,
}

impl ReceivableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceivableStatus::Open => "open",
            ReceivableStatus::Paid => "paid",
        }
    }
}

impl FromStr for ReceivableStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ReceivableStatus::Open),
            "paid" => Ok(ReceivableStatus::Paid),
            other => Err(UnknownStatus {
                kind: "receivable",
                value: other.to_string(),
            }),
        }
    }
}

/// Amount due on a contract. `paid_at` is set iff status is paid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountReceivable {
    pub id: String,
    pub contract_id: String,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: ReceivableStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Promoter commission on a contract. `approved_by` and `approved_at` are set
/// together with `approved`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commission {
    pub id: String,
    pub contract_id: String,
    pub promoter_id: String,
    pub amount: Decimal,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AccountReceivable {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            contract_id: row.try_get("contract_id")?,
            due_date: row.try_get("due_date")?,
            amount: row.try_get("amount")?,
            status: status_column(row, "status")?,
            paid_at: row.try_get("paid_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Commission {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            contract_id: row.try_get("contract_id")?,
            promoter_id: row.try_get("promoter_id")?,
            amount: row.try_get("amount")?,
            approved: row.try_get("approved")?,
            approved_by: row.try_get("approved_by")?,
            approved_at: row.try_get("approved_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
