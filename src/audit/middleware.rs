use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, FromRequestParts, RawPathParams, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde_json::value::RawValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::geo::{lookup_with_timeout, GeoInfo, GeoLookup};
use super::{AuditAction, AuditLog, AuditSink, ENTITY_HEADER};
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Shared state of the audit middleware
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    geo: Arc<dyn GeoLookup>,
    geo_timeout: Duration,
    max_body_bytes: usize,
}

impl AuditRecorder {
    pub fn new(
        sink: Arc<dyn AuditSink>,
        geo: Arc<dyn GeoLookup>,
        geo_timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            sink,
            geo,
            geo_timeout,
            max_body_bytes,
        }
    }
}

/// Everything about the request that is known before the handler runs
struct CapturedRequest {
    action: AuditAction,
    path: String,
    entity_id: String,
    ip_address: String,
    user_agent: String,
    body: Bytes,
}

/// Audit middleware. Must be the outermost layer so it sees the raw body and
/// the final status of every mutating request.
pub async fn audit_middleware(
    State(recorder): State<AuditRecorder>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(action) = AuditAction::from_method(request.method()) else {
        return Ok(next.run(request).await);
    };

    let (mut parts, body) = request.into_parts();

    if content_length(&parts.headers).is_some_and(|len| len > recorder.max_body_bytes) {
        return Err(ApiError::payload_too_large("Request body exceeds the configured limit"));
    }

    // The body stream can be read once; keep the bytes and forward a fresh body
    let body = to_bytes(body, recorder.max_body_bytes).await.map_err(|e| {
        tracing::debug!("Failed to buffer request body: {}", e);
        ApiError::bad_request("Failed to read request body")
    })?;

    let captured = CapturedRequest {
        action,
        path: parts.uri.path().to_string(),
        entity_id: route_id(&mut parts).await,
        ip_address: client_ip(&parts),
        user_agent: header_str(&parts.headers, header::USER_AGENT.as_str()).to_string(),
        body: body.clone(),
    };

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;

    if !response.status().is_success() {
        tracing::debug!(
            "Skipping audit for {} {} with status {}",
            captured.action.as_str(),
            captured.path,
            response.status()
        );
        return Ok(response);
    }

    let entity_name = entity_name(response.headers(), &captured.path);
    let user_id = response
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.user_id.clone())
        .unwrap_or_default();

    tokio::spawn(persist(recorder, captured, entity_name, user_id));

    Ok(response)
}

/// Build and store the entry. Geo and storage failures end here.
async fn persist(recorder: AuditRecorder, captured: CapturedRequest, entity_name: String, user_id: String) {
    let geo_info = match lookup_with_timeout(recorder.geo.as_ref(), &captured.ip_address, recorder.geo_timeout).await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Geo lookup for '{}' failed: {}", captured.ip_address, e);
            GeoInfo::default()
        }
    };

    let diff = match captured.action {
        AuditAction::Update => raw_diff(&captured.body),
        AuditAction::Insert | AuditAction::Delete => None,
    };

    let entry = AuditLog {
        id: Uuid::now_v7().to_string(),
        user_id,
        entity_name,
        entity_id: captured.entity_id,
        action: captured.action,
        diff,
        ip_address: captured.ip_address,
        user_agent: captured.user_agent,
        geo_info,
        created_at: Utc::now(),
    };

    match recorder.sink.record(&entry).await {
        Ok(()) => tracing::debug!(
            "Audit entry {} recorded: {} {}:{}",
            entry.id,
            entry.action.as_str(),
            entry.entity_name,
            entry.entity_id
        ),
        Err(e) => tracing::warn!("Audit entry for {} {} dropped: {}", entry.action.as_str(), captured.path, e),
    }
}

/// Submitted payload, stored verbatim when it is JSON
fn raw_diff(body: &Bytes) -> Option<Box<RawValue>> {
    if body.is_empty() {
        return None;
    }

    let text = std::str::from_utf8(body).ok()?;
    match RawValue::from_string(text.to_string()) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::debug!("Update body is not JSON, diff omitted: {}", e);
            None
        }
    }
}

/// The matched `:id` route parameter, or empty
async fn route_id(parts: &mut Parts) -> String {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params
            .iter()
            .find(|(name, _)| *name == "id")
            .map(|(_, value)| value.to_string())
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// `X-Entity: <entity>:<id>` from the handler, else the first path segment
fn entity_name(headers: &HeaderMap, path: &str) -> String {
    let declared = header_str(headers, ENTITY_HEADER);
    let declared = declared.split_once(':').map_or(declared, |(entity, _)| entity).trim();

    if !declared.is_empty() {
        return declared.to_string();
    }

    path.split('/').find(|segment| !segment.is_empty()).unwrap_or_default().to_string()
}

/// `X-Forwarded-For` as sent (every hop), else the peer address without its port
fn client_ip(parts: &Parts) -> String {
    let forwarded = header_str(&parts.headers, "x-forwarded-for").trim();
    if !forwarded.is_empty() {
        return forwarded.to_string();
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    header_str(headers, header::CONTENT_LENGTH.as_str()).parse().ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|value| value.to_str().ok()).unwrap_or("")
}
