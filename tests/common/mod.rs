#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use backoffice_api::audit::{
    AuditError, AuditFilter, AuditLog, AuditLogQuery, AuditRecorder, AuditSink, GeoError, GeoInfo, GeoLookup,
};
use backoffice_api::auth::issue_token;
use backoffice_api::config::{AppConfig, Environment};
use backoffice_api::database::models::{
    AccountReceivable, Commission, Contract, ContractChanges, ContractStatus, Lead, LeadChanges, ReceivableStatus,
    User,
};
use backoffice_api::database::{ContractRepository, DatabaseError, FinanceRepository, LeadRepository, UserRepository};
use backoffice_api::workflow::lead::LeadStatus;
use backoffice_api::{router, AppState};

pub const SECRET: &str = "integration-secret";
pub const CLIENT_IP: &str = "203.0.113.9";

fn not_found(what: &str, id: &str) -> DatabaseError {
    DatabaseError::NotFound(format!("{} {} not found", what, id))
}

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryLeads {
    rows: Mutex<HashMap<String, Lead>>,
}

impl MemoryLeads {
    pub fn insert(&self, id: &str, status: LeadStatus) {
        let mut lead = Lead::new("c-1".into(), "s-1".into(), None, String::new());
        lead.id = id.to_string();
        lead.status = status;
        self.rows.lock().unwrap().insert(id.to_string(), lead);
    }

    pub fn get(&self, id: &str) -> Option<Lead> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl LeadRepository for MemoryLeads {
    async fn list(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, DatabaseError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|l| l.deleted_at.is_none() && status.map_or(true, |s| s == l.status))
            .cloned()
            .collect())
    }

    async fn create(&self, lead: &Lead) -> Result<(), DatabaseError> {
        self.rows.lock().unwrap().insert(lead.id.clone(), lead.clone());
        Ok(())
    }

    async fn update(&self, id: &str, changes: &LeadChanges) -> Result<(), DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let lead = rows
            .get_mut(id)
            .filter(|l| l.deleted_at.is_none())
            .ok_or_else(|| not_found("lead", id))?;
        lead.service_id = changes.service_id.clone();
        lead.promoter_id = changes.promoter_id.clone();
        lead.notes = changes.notes.clone();
        lead.updated_at = Utc::now();
        Ok(())
    }

    async fn soft_delete(&self, id: &str) -> Result<(), DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let lead = rows
            .get_mut(id)
            .filter(|l| l.deleted_at.is_none())
            .ok_or_else(|| not_found("lead", id))?;
        lead.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: LeadStatus,
        next: LeadStatus,
    ) -> Result<u64, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(id) {
            Some(lead) if lead.deleted_at.is_none() && lead.status == expected => {
                lead.status = next;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn status_of(&self, id: &str) -> Result<Option<LeadStatus>, DatabaseError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(id).filter(|l| l.deleted_at.is_none()).map(|l| l.status))
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<HashMap<String, User>>,
}

impl MemoryUsers {
    /// Store a user whose password hash is computed at the cheapest bcrypt cost
    pub fn add(&self, id: &str, email: &str, password: &str, role: &str) {
        let user = User {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: bcrypt::hash(password, 4).unwrap(),
            full_name: String::new(),
            role: role.to_string(),
        };
        self.rows.lock().unwrap().insert(email.to_string(), user);
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.rows.lock().unwrap().get(email).cloned())
    }
}

#[derive(Default)]
pub struct MemoryContracts {
    pub customers: Mutex<HashSet<String>>,
    pub services: Mutex<HashSet<String>>,
    rows: Mutex<HashMap<String, Contract>>,
}

impl MemoryContracts {
    pub fn with_references(customer: &str, service: &str) -> Self {
        let contracts = Self::default();
        contracts.customers.lock().unwrap().insert(customer.to_string());
        contracts.services.lock().unwrap().insert(service.to_string());
        contracts
    }

    pub fn get(&self, id: &str) -> Option<Contract> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ContractRepository for MemoryContracts {
    async fn list(&self, status: Option<ContractStatus>) -> Result<Vec<Contract>, DatabaseError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|c| c.deleted_at.is_none() && status.map_or(true, |s| s == c.status))
            .cloned()
            .collect())
    }

    async fn create(&self, contract: &Contract) -> Result<(), DatabaseError> {
        if !self.customers.lock().unwrap().contains(&contract.customer_id) {
            return Err(not_found("customer", &contract.customer_id));
        }
        if !self.services.lock().unwrap().contains(&contract.service_id) {
            return Err(not_found("service", &contract.service_id));
        }
        self.rows.lock().unwrap().insert(contract.id.clone(), contract.clone());
        Ok(())
    }

    async fn update(&self, id: &str, changes: &ContractChanges) -> Result<(), DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let contract = rows
            .get_mut(id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| not_found("contract", id))?;
        contract.value_total = changes.value_total;
        contract.start_date = changes.start_date;
        contract.end_date = changes.end_date;
        contract.status = changes.status;
        Ok(())
    }

    async fn soft_delete(&self, id: &str) -> Result<(), DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let contract = rows
            .get_mut(id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| not_found("contract", id))?;
        contract.deleted_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFinance {
    receivables: Mutex<HashMap<String, AccountReceivable>>,
    commissions: Mutex<HashMap<String, Commission>>,
}

impl MemoryFinance {
    pub fn add_receivable(&self, id: &str) {
        let now = Utc::now();
        self.receivables.lock().unwrap().insert(
            id.to_string(),
            AccountReceivable {
                id: id.to_string(),
                contract_id: "k-1".into(),
                due_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap_or_default(),
                amount: Decimal::new(150_000, 2),
                status: ReceivableStatus::Open,
                paid_at: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn add_commission(&self, id: &str) {
        let now = Utc::now();
        self.commissions.lock().unwrap().insert(
            id.to_string(),
            Commission {
                id: id.to_string(),
                contract_id: "k-1".into(),
                promoter_id: "p-1".into(),
                amount: Decimal::new(7_500, 2),
                approved: false,
                approved_by: None,
                approved_at: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn receivable(&self, id: &str) -> Option<AccountReceivable> {
        self.receivables.lock().unwrap().get(id).cloned()
    }

    pub fn commission(&self, id: &str) -> Option<Commission> {
        self.commissions.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl FinanceRepository for MemoryFinance {
    async fn list_receivables(
        &self,
        status: Option<ReceivableStatus>,
    ) -> Result<Vec<AccountReceivable>, DatabaseError> {
        let rows = self.receivables.lock().unwrap();
        Ok(rows
            .values()
            .filter(|r| status.map_or(true, |s| s == r.status))
            .cloned()
            .collect())
    }

    async fn pay_if_open(&self, id: &str, paid_at: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut rows = self.receivables.lock().unwrap();
        match rows.get_mut(id) {
            Some(r) if r.status == ReceivableStatus::Open => {
                r.status = ReceivableStatus::Paid;
                r.paid_at = Some(paid_at);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn receivable_status(&self, id: &str) -> Result<Option<ReceivableStatus>, DatabaseError> {
        Ok(self.receivables.lock().unwrap().get(id).map(|r| r.status))
    }

    async fn list_commissions(&self, only_pending: bool) -> Result<Vec<Commission>, DatabaseError> {
        let rows = self.commissions.lock().unwrap();
        Ok(rows
            .values()
            .filter(|c| !only_pending || !c.approved)
            .cloned()
            .collect())
    }

    async fn approve_if_pending(
        &self,
        id: &str,
        approver_id: &str,
        approved_at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut rows = self.commissions.lock().unwrap();
        match rows.get_mut(id) {
            Some(c) if !c.approved => {
                c.approved = true;
                c.approved_by = Some(approver_id.to_string());
                c.approved_at = Some(approved_at);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn commission_approved(&self, id: &str) -> Result<Option<bool>, DatabaseError> {
        Ok(self.commissions.lock().unwrap().get(id).map(|c| c.approved))
    }
}

// ---------------------------------------------------------------------------
// Audit sink and geo providers
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAudit {
    entries: Mutex<Vec<AuditLog>>,
    pub fail: bool,
}

impl MemoryAudit {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> Vec<AuditLog> {
        self.entries.lock().unwrap().clone()
    }

    /// Wait for the detached writer to deliver `count` entries
    pub async fn wait_for(&self, count: usize) -> Vec<AuditLog> {
        for _ in 0..200 {
            let entries = self.entries();
            if entries.len() >= count {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.entries()
    }

    /// Give any detached writer time to run, then report what arrived
    pub async fn settle(&self) -> Vec<AuditLog> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.entries()
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record(&self, entry: &AuditLog) -> Result<(), AuditError> {
        if self.fail {
            return Err(AuditError::Storage(DatabaseError::Connection("audit store offline".into())));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditLogQuery for MemoryAudit {
    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, DatabaseError> {
        let mut entries: Vec<_> = self.entries().into_iter().filter(|e| filter.matches(e)).collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(filter.effective_limit() as usize);
        Ok(entries)
    }
}

pub struct StaticGeo(pub GeoInfo);

impl StaticGeo {
    pub fn sao_paulo() -> Self {
        Self(GeoInfo {
            country: "Brazil".into(),
            city: "São Paulo".into(),
            lat: -23.55,
            lon: -46.63,
        })
    }
}

#[async_trait]
impl GeoLookup for StaticGeo {
    async fn lookup(&self, _ip: &str) -> Result<GeoInfo, GeoError> {
        Ok(self.0.clone())
    }
}

/// Never answers within any reasonable timeout
pub struct SlowGeo;

#[async_trait]
impl GeoLookup for SlowGeo {
    async fn lookup(&self, _ip: &str) -> Result<GeoInfo, GeoError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(GeoInfo::default())
    }
}

/// Remembers every address it was asked about
#[derive(Default)]
pub struct RecordingGeo {
    asked: Mutex<Vec<String>>,
}

impl RecordingGeo {
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeoLookup for RecordingGeo {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo, GeoError> {
        self.asked.lock().unwrap().push(ip.to_string());
        Ok(GeoInfo::default())
    }
}

pub struct FailingGeo;

#[async_trait]
impl GeoLookup for FailingGeo {
    async fn lookup(&self, _ip: &str) -> Result<GeoInfo, GeoError> {
        Err(GeoError::Provider("RateLimited".into()))
    }
}

// ---------------------------------------------------------------------------
// App harness
// ---------------------------------------------------------------------------

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::for_environment(Environment::Development);
    config.security.jwt_secret = SECRET.to_string();
    config.api.max_request_size_bytes = 64 * 1024;
    config.geo.timeout_ms = 50;
    config
}

pub struct TestApp {
    pub router: Router,
    pub config: AppConfig,
    pub users: Arc<MemoryUsers>,
    pub leads: Arc<MemoryLeads>,
    pub contracts: Arc<MemoryContracts>,
    pub finance: Arc<MemoryFinance>,
    pub audit: Arc<MemoryAudit>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            geo: Arc::new(StaticGeo::sao_paulo()),
            audit: Arc::new(MemoryAudit::default()),
            contracts: Arc::new(MemoryContracts::with_references("c-1", "s-1")),
        }
    }

    pub fn token(&self, user_id: &str, role: &str) -> String {
        issue_token(user_id, role, &self.config.security).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send and decode the JSON body (Null when empty)
    pub async fn send_json(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }
}

pub struct TestAppBuilder {
    geo: Arc<dyn GeoLookup>,
    audit: Arc<MemoryAudit>,
    contracts: Arc<MemoryContracts>,
}

impl TestAppBuilder {
    pub fn geo(mut self, geo: impl GeoLookup + 'static) -> Self {
        self.geo = Arc::new(geo);
        self
    }

    pub fn shared_geo(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = geo;
        self
    }

    pub fn audit(mut self, audit: MemoryAudit) -> Self {
        self.audit = Arc::new(audit);
        self
    }

    pub fn build(self) -> TestApp {
        let config = test_config();
        let users = Arc::new(MemoryUsers::default());
        let leads = Arc::new(MemoryLeads::default());
        let finance = Arc::new(MemoryFinance::default());

        let recorder = AuditRecorder::new(
            self.audit.clone(),
            self.geo,
            config.geo.timeout(),
            config.api.max_request_size_bytes,
        );

        let state = AppState {
            config: Arc::new(config.clone()),
            users: users.clone(),
            leads: leads.clone(),
            contracts: self.contracts.clone(),
            finance: finance.clone(),
            audit_logs: self.audit.clone(),
            audit: recorder,
        };

        TestApp {
            router: router(state),
            config,
            users,
            leads,
            contracts: self.contracts,
            finance,
            audit: self.audit,
        }
    }
}

/// Request from a fixed client address, optionally authenticated and with a JSON body
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP)
        .header(header::USER_AGENT, "integration-tests/1.0");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let mut request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    request
        .extensions_mut()
        .insert(ConnectInfo("10.1.1.1:40000".parse::<SocketAddr>().unwrap()));
    request
}
