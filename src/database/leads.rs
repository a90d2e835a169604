use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Lead, LeadChanges};
use super::repository::LeadRepository;
use super::{expect_affected, DatabaseError};
use crate::workflow::lead::LeadStatus;

const LEAD_COLUMNS: &str = "id, customer_id, service_id, promoter_id, status, notes, created_at, updated_at, deleted_at";

pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn list(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM leads WHERE deleted_at IS NULL AND ($1::text IS NULL OR status = $1) ORDER BY created_at DESC",
            LEAD_COLUMNS
        );

        let leads = sqlx::query_as::<_, Lead>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(leads)
    }

    async fn create(&self, lead: &Lead) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO leads (id, customer_id, service_id, promoter_id, status, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&lead.id)
        .bind(&lead.customer_id)
        .bind(&lead.service_id)
        .bind(&lead.promoter_id)
        .bind(lead.status.as_str())
        .bind(&lead.notes)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, id: &str, changes: &LeadChanges) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE leads SET service_id = $2, promoter_id = $3, notes = $4, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(&changes.service_id)
        .bind(&changes.promoter_id)
        .bind(&changes.notes)
        .execute(&self.pool)
        .await?;

        expect_affected(result.rows_affected(), "lead", id)
    }

    async fn soft_delete(&self, id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE leads SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_affected(result.rows_affected(), "lead", id)
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: LeadStatus,
        next: LeadStatus,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE leads SET status = $3, updated_at = now()
            WHERE id = $1 AND status = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn status_of(&self, id: &str) -> Result<Option<LeadStatus>, DatabaseError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM leads WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        status
            .map(|s| s.parse::<LeadStatus>().map_err(|e| DatabaseError::Decode(e.to_string())))
            .transpose()
    }
}
