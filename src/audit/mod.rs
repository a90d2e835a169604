// audit/mod.rs - Audit trail of mutating requests
//
// The recorder middleware (middleware.rs) captures POST/PUT/DELETE requests that
// end in a 2xx status, enriches them with coarse geography (geo.rs) and hands
// the finished entry to an AuditSink (repository.rs for PostgreSQL).

pub mod geo;
pub mod middleware;
pub mod repository;

use async_trait::async_trait;
use axum::http::Method;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

use crate::database::DatabaseError;
pub use geo::{GeoError, GeoInfo, GeoLookup, HttpGeoService};
pub use middleware::{audit_middleware, AuditRecorder};
pub use repository::PgAuditRepository;

/// Response header a handler sets to name the entity it just changed: `<entity>:<id>`
pub const ENTITY_HEADER: &str = "x-entity";

/// Header pair for handlers that want to name the entity in the audit trail
pub fn entity_header(entity: &str, id: &str) -> [(&'static str, String); 1] {
    [(ENTITY_HEADER, format!("{}:{}", entity, id))]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    /// Only mutating verbs are audited
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::POST => Some(AuditAction::Insert),
            Method::PUT => Some(AuditAction::Update),
            Method::DELETE => Some(AuditAction::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Insert => "insert",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(AuditAction::Insert),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            other => Err(format!("unknown audit action '{}'", other)),
        }
    }
}

/// One immutable audit trail entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub id: String,
    pub user_id: String,
    pub entity_name: String,
    pub entity_id: String,
    pub action: AuditAction,
    /// Raw submitted payload, only for updates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Box<RawValue>>,
    pub ip_address: String,
    pub user_agent: String,
    pub geo_info: GeoInfo,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to persist audit entry: {0}")]
    Storage(#[from] DatabaseError),
}

/// Destination for finished audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditLog) -> Result<(), AuditError>;
}

/// Filters for the audit log listing
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub entity_name: Option<String>,
    pub user_id: Option<String>,
    pub action: Option<AuditAction>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl AuditFilter {
    pub const DEFAULT_LIMIT: i64 = 100;

    pub fn effective_limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => Self::DEFAULT_LIMIT,
        }
    }

    pub fn matches(&self, entry: &AuditLog) -> bool {
        self.entity_name.as_deref().map_or(true, |e| e == entry.entity_name)
            && self.user_id.as_deref().map_or(true, |u| u == entry.user_id)
            && self.action.map_or(true, |a| a == entry.action)
            && self.start.map_or(true, |s| entry.created_at >= s)
            && self.end.map_or(true, |e| entry.created_at <= e)
    }
}

/// Read side of the audit trail
#[async_trait]
pub trait AuditLogQuery: Send + Sync {
    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, DatabaseError>;
}
