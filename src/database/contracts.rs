use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Contract, ContractChanges, ContractStatus};
use super::repository::ContractRepository;
use super::{expect_affected, DatabaseError};

const CONTRACT_COLUMNS: &str = "id, customer_id, service_id, promoter_id, value_total, start_date, end_date, status, created_at, updated_at, deleted_at";

pub struct PgContractRepository {
    pool: PgPool,
}

impl PgContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn live_row_exists(&self, table: &'static str, id: &str) -> Result<bool, DatabaseError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND deleted_at IS NULL)", table);
        let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(exists)
    }
}

#[async_trait]
impl ContractRepository for PgContractRepository {
    async fn list(&self, status: Option<ContractStatus>) -> Result<Vec<Contract>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM contracts WHERE deleted_at IS NULL AND ($1::text IS NULL OR status = $1) ORDER BY start_date DESC",
            CONTRACT_COLUMNS
        );

        let contracts = sqlx::query_as::<_, Contract>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(contracts)
    }

    async fn create(&self, contract: &Contract) -> Result<(), DatabaseError> {
        if !self.live_row_exists("customers", &contract.customer_id).await? {
            return Err(DatabaseError::NotFound(format!("customer {} not found", contract.customer_id)));
        }
        if !self.live_row_exists("services", &contract.service_id).await? {
            return Err(DatabaseError::NotFound(format!("service {} not found", contract.service_id)));
        }

        sqlx::query(
            r#"
            INSERT INTO contracts (id, customer_id, service_id, promoter_id, value_total, start_date, end_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&contract.id)
        .bind(&contract.customer_id)
        .bind(&contract.service_id)
        .bind(&contract.promoter_id)
        .bind(contract.value_total)
        .bind(contract.start_date)
        .bind(contract.end_date)
        .bind(contract.status.as_str())
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, id: &str, changes: &ContractChanges) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET value_total = $2, start_date = $3, end_date = $4, status = $5, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(changes.value_total)
        .bind(changes.start_date)
        .bind(changes.end_date)
        .bind(changes.status.as_str())
        .execute(&self.pool)
        .await?;

        expect_affected(result.rows_affected(), "contract", id)
    }

    async fn soft_delete(&self, id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE contracts SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_affected(result.rows_affected(), "contract", id)
    }
}
