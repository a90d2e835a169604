use async_trait::async_trait;
use serde_json::value::RawValue;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};

use super::{AuditAction, AuditError, AuditFilter, AuditLog, AuditLogQuery, AuditSink, GeoInfo};
use crate::database::DatabaseError;

/// PostgreSQL-backed audit trail
#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditRepository {
    async fn record(&self, entry: &AuditLog) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, user_id, entity_name, entity_id, action, diff, ip_address, user_agent, geo_info, created_at)
            VALUES ($1, $2, $3, $4, $5, $6::json, $7, $8, $9, $10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.entity_name)
        .bind(&entry.entity_id)
        .bind(entry.action.as_str())
        .bind(entry.diff.as_ref().map(|raw| raw.get()))
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(Json(&entry.geo_info))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }
}

#[async_trait]
impl AuditLogQuery for PgAuditRepository {
    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, DatabaseError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, entity_name, entity_id, action, diff::text AS diff,
                   ip_address, user_agent, geo_info, created_at
            FROM audit_logs
            WHERE ($1::text IS NULL OR entity_name = $1)
              AND ($2::text IS NULL OR user_id = $2)
              AND ($3::text IS NULL OR action = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC
            LIMIT $6
            "#,
        )
        .bind(&filter.entity_name)
        .bind(&filter.user_id)
        .bind(filter.action.map(|a| a.as_str()))
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &PgRow) -> Result<AuditLog, DatabaseError> {
    let action: String = row.try_get("action")?;
    let diff: Option<String> = row.try_get("diff")?;
    let geo_info: Option<Json<GeoInfo>> = row.try_get("geo_info")?;

    Ok(AuditLog {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        entity_name: row.try_get("entity_name")?,
        entity_id: row.try_get("entity_id")?,
        action: action.parse::<AuditAction>().map_err(DatabaseError::Decode)?,
        diff: diff
            .map(RawValue::from_string)
            .transpose()
            .map_err(|e| DatabaseError::Decode(e.to_string()))?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        geo_info: geo_info.map(|Json(geo)| geo).unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}
