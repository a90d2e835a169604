use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::GeoConfig;

/// Coarse geography for a client IP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geo request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geo provider returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("geo provider rejected lookup: {0}")]
    Provider(String),

    #[error("geo lookup timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo, GeoError>;
}

/// Run a lookup, giving up after `timeout` whatever the implementation does
pub async fn lookup_with_timeout(
    geo: &dyn GeoLookup,
    ip: &str,
    timeout: Duration,
) -> Result<GeoInfo, GeoError> {
    match tokio::time::timeout(timeout, geo.lookup(ip)).await {
        Ok(result) => result,
        Err(_) => Err(GeoError::Timeout(timeout)),
    }
}

/// Provider payload, e.g. https://ipapi.co/8.8.8.8/json/
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    country_name: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// GeoLookup backed by an ipapi-compatible HTTP provider
#[derive(Debug, Clone)]
pub struct HttpGeoService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeoService {
    pub fn new(config: &GeoConfig) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, ip: &str) -> String {
        format!("{}/{}/json/", self.base_url, ip)
    }
}

#[async_trait]
impl GeoLookup for HttpGeoService {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo, GeoError> {
        let response = self.client.get(self.url_for(ip)).send().await?;

        if !response.status().is_success() {
            return Err(GeoError::Status(response.status()));
        }

        let body: ProviderResponse = response.json().await?;
        if body.error {
            return Err(GeoError::Provider(body.reason.unwrap_or_else(|| "unknown".to_string())));
        }

        Ok(GeoInfo {
            country: body.country_name.unwrap_or_default(),
            city: body.city.unwrap_or_default(),
            lat: body.latitude.unwrap_or_default(),
            lon: body.longitude.unwrap_or_default(),
        })
    }
}
