use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{AccountReceivable, Commission, ReceivableStatus};
use super::repository::FinanceRepository;
use super::DatabaseError;

pub struct PgFinanceRepository {
    pool: PgPool,
}

impl PgFinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FinanceRepository for PgFinanceRepository {
    async fn list_receivables(
        &self,
        status: Option<ReceivableStatus>,
    ) -> Result<Vec<AccountReceivable>, DatabaseError> {
        let receivables = sqlx::query_as::<_, AccountReceivable>(
            r#"
            SELECT id, contract_id, due_date, amount, status, paid_at, created_at, updated_at
            FROM accounts_receivable
            WHERE deleted_at IS NULL AND ($1::text IS NULL OR status = $1)
            ORDER BY due_date
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(receivables)
    }

    async fn pay_if_open(&self, id: &str, paid_at: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts_receivable SET status = 'paid', paid_at = $2, updated_at = now()
            WHERE id = $1 AND status = 'open' AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(paid_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn receivable_status(&self, id: &str) -> Result<Option<ReceivableStatus>, DatabaseError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM accounts_receivable WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        status
            .map(|s| s.parse::<ReceivableStatus>().map_err(|e| DatabaseError::Decode(e.to_string())))
            .transpose()
    }

    async fn list_commissions(&self, only_pending: bool) -> Result<Vec<Commission>, DatabaseError> {
        let commissions = sqlx::query_as::<_, Commission>(
            r#"
            SELECT id, contract_id, promoter_id, amount, approved, approved_by, approved_at, created_at, updated_at
            FROM commissions
            WHERE deleted_at IS NULL AND (NOT $1 OR approved = false)
            ORDER BY created_at
            "#,
        )
        .bind(only_pending)
        .fetch_all(&self.pool)
        .await?;
        Ok(commissions)
    }

    async fn approve_if_pending(
        &self,
        id: &str,
        approver_id: &str,
        approved_at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE commissions SET approved = true, approved_by = $2, approved_at = $3, updated_at = now()
            WHERE id = $1 AND approved = false AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(approver_id)
        .bind(approved_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn commission_approved(&self, id: &str) -> Result<Option<bool>, DatabaseError> {
        let approved: Option<bool> =
            sqlx::query_scalar("SELECT approved FROM commissions WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(approved)
    }
}
