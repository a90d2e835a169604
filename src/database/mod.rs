pub mod contracts;
pub mod finance;
pub mod leads;
pub mod models;
pub mod repository;
pub mod users;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

pub use contracts::PgContractRepository;
pub use finance::PgFinanceRepository;
pub use leads::PgLeadRepository;
pub use repository::{ContractRepository, FinanceRepository, LeadRepository, UserRepository};
pub use users::PgUserRepository;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Open the shared PostgreSQL pool
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let url = config
        .url
        .as_deref()
        .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout))
        .connect(url)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    info!("Created database pool (max {} connections)", config.max_connections);
    Ok(pool)
}

/// Map a zero-row write to NotFound
pub(crate) fn expect_affected(rows: u64, what: &str, id: &str) -> Result<(), DatabaseError> {
    if rows == 0 {
        return Err(DatabaseError::NotFound(format!("{} {} not found", what, id)));
    }
    Ok(())
}
