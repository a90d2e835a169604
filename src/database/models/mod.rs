pub mod contract;
pub mod finance;
pub mod lead;
pub mod user;

use sqlx::{postgres::PgRow, Row};
use std::str::FromStr;
use thiserror::Error;

pub use contract::{Contract, ContractChanges, ContractStatus};
pub use finance::{AccountReceivable, Commission, ReceivableStatus};
pub use lead::{Lead, LeadChanges};
pub use user::User;

/// A status string outside an entity's fixed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status '{value}'")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// Decode a text status column into its enum
pub(crate) fn status_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownStatus>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
