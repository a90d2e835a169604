// app.rs - Application state and route table
//
// Layer order per request: audit (outermost) -> JWT -> role allow-list -> handler.
// Role checks are attached per route group with `route_layer`, so an unknown
// path still falls through to a plain 404.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::audit::{audit_middleware, AuditLogQuery, AuditRecorder, GeoError, HttpGeoService, PgAuditRepository};
use crate::config::AppConfig;
use crate::database::{
    ContractRepository, FinanceRepository, LeadRepository, PgContractRepository, PgFinanceRepository,
    PgLeadRepository, PgUserRepository, UserRepository,
};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, require_role, RequireRole};

/// Shared per-process state. Holds no mutable domain data.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub contracts: Arc<dyn ContractRepository>,
    pub finance: Arc<dyn FinanceRepository>,
    pub audit_logs: Arc<dyn AuditLogQuery>,
    pub audit: AuditRecorder,
}

impl AppState {
    /// PostgreSQL repositories and the HTTP geo provider
    pub fn postgres(config: AppConfig, pool: PgPool) -> Result<Self, GeoError> {
        let audit_repo = Arc::new(PgAuditRepository::new(pool.clone()));
        let geo = Arc::new(HttpGeoService::new(&config.geo)?);
        let audit = AuditRecorder::new(
            audit_repo.clone(),
            geo,
            config.geo.timeout(),
            config.api.max_request_size_bytes,
        );

        Ok(Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            leads: Arc::new(PgLeadRepository::new(pool.clone())),
            contracts: Arc::new(PgContractRepository::new(pool.clone())),
            finance: Arc::new(PgFinanceRepository::new(pool)),
            audit_logs: audit_repo,
            audit,
            config: Arc::new(config),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let security = Arc::new(state.config.security.clone());

    let public_routes = Router::new()
        .route("/login", post(public::login::login))
        .route("/leads", post(public::leads::create));

    let lead_viewers = Router::new()
        .route("/leads", get(protected::leads::list))
        .route_layer(from_fn_with_state(RequireRole::new(["admin", "promoter"]), require_role))
        .route_layer(from_fn_with_state(security.clone(), jwt_auth_middleware));

    let lead_managers = Router::new()
        .route("/leads/:id/status", put(protected::leads::update_status))
        .route_layer(from_fn_with_state(RequireRole::new(["finance", "admin"]), require_role))
        .route_layer(from_fn_with_state(security.clone(), jwt_auth_middleware));

    let authenticated = Router::new()
        .route(
            "/leads/:id",
            put(protected::leads::update).delete(protected::leads::remove),
        )
        .route(
            "/contracts",
            get(protected::contracts::list).post(protected::contracts::create),
        )
        .route(
            "/contracts/:id",
            put(protected::contracts::update).delete(protected::contracts::remove),
        )
        .route_layer(from_fn_with_state(security.clone(), jwt_auth_middleware));

    let finance = Router::new()
        .route("/receivables", get(protected::finance::list_receivables))
        .route("/receivables/:id/pay", put(protected::finance::pay))
        .route("/commissions", get(protected::finance::list_commissions))
        .route("/commissions/:id/approve", put(protected::finance::approve))
        .route_layer(from_fn_with_state(RequireRole::new(["finance"]), require_role))
        .route_layer(from_fn_with_state(security.clone(), jwt_auth_middleware));

    let admin = Router::new()
        .route("/audit-logs", get(protected::audit_logs::list))
        .route_layer(from_fn_with_state(RequireRole::new(["admin"]), require_role))
        .route_layer(from_fn_with_state(security, jwt_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(lead_viewers)
        .merge(lead_managers)
        .merge(authenticated)
        .merge(finance)
        .merge(admin)
        .layer(from_fn_with_state(state.audit.clone(), audit_middleware))
        .with_state(state)
}
