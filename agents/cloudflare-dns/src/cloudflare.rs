//! Cloudflare API Client
//!
//! Type-safe wrapper around the v4 `dns_records` endpoints of a single zone.
//! Every call is one request with a bounded timeout; a `success: false`
//! envelope is a failure regardless of the HTTP status.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::provider::{DnsProvider, DnsRecord, DnsRecordRequest, ProviderError};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one Cloudflare zone
#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub api_token: String,
    pub zone_id: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl CloudflareConfig {
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            zone_id: zone_id.into(),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================
// API Response Types
// ============================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// First reported error message, the way the dashboard shows it
    fn failure_reason(&self) -> String {
        self.errors
            .first()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

// ============================================================
// Client Implementation
// ============================================================

/// Cloudflare DNS client bound to one zone
pub struct CloudflareClient {
    http_client: Client,
    config: CloudflareConfig,
}

impl CloudflareClient {
    /// Create a new client from explicit configuration
    pub fn new(config: CloudflareConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ddns-cloudflare-dns/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn zone_id(&self) -> &str {
        &self.config.zone_id
    }

    fn records_url(&self) -> String {
        format!(
            "{}/zones/{}/dns_records",
            self.config.base_url.trim_end_matches('/'),
            self.config.zone_id
        )
    }

    fn record_url(&self, provider_id: &str) -> String {
        format!("{}/{}", self.records_url(), provider_id)
    }

    /// Send one request and unwrap the Cloudflare envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, ProviderError> {
        let response = request
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            warn!(status = %status, error = %e, "Unparsable Cloudflare response");
            ProviderError::new(format!("invalid response from provider (HTTP {})", status))
        })?;

        if !envelope.success {
            let reason = envelope.failure_reason();
            warn!(status = %status, reason = %reason, "Cloudflare rejected request");
            return Err(ProviderError::new(reason));
        }

        Ok(envelope.result)
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::new(format!(
                "request timed out after {}s",
                self.config.timeout.as_secs_f32()
            ))
        } else {
            ProviderError::new(format!("request failed: {}", err))
        }
    }

    /// List records in the zone, optionally filtered by exact name.
    /// Records of types outside A/AAAA/CNAME are skipped.
    ///
    /// Not part of the lifecycle path; the operator CLI uses it to compare
    /// provider state with the local store.
    pub async fn list_records(&self, name: Option<&str>) -> Result<Vec<DnsRecord>, ProviderError> {
        let mut query: Vec<(&str, &str)> = vec![("per_page", "1000")];
        if let Some(name) = name {
            query.push(("name", name));
        }

        let request = self.http_client.get(self.records_url()).query(&query);
        let raw: Option<Vec<serde_json::Value>> = self.execute(request).await?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect())
    }
}

#[async_trait]
impl DnsProvider for CloudflareClient {
    async fn create_record(&self, request: &DnsRecordRequest) -> Result<DnsRecord, ProviderError> {
        debug!(name = %request.name, record_type = %request.record_type, "Creating Cloudflare record");

        let builder = self.http_client.post(self.records_url()).json(request);
        self.execute(builder)
            .await?
            .ok_or_else(|| ProviderError::new("No record in response"))
    }

    async fn update_record(
        &self,
        provider_id: &str,
        request: &DnsRecordRequest,
    ) -> Result<DnsRecord, ProviderError> {
        debug!(provider_id = %provider_id, name = %request.name, "Updating Cloudflare record");

        let builder = self.http_client.put(self.record_url(provider_id)).json(request);
        self.execute(builder)
            .await?
            .ok_or_else(|| ProviderError::new("No record in response"))
    }

    async fn delete_record(&self, provider_id: &str) -> Result<(), ProviderError> {
        debug!(provider_id = %provider_id, "Deleting Cloudflare record");

        let builder = self.http_client.delete(self.record_url(provider_id));
        let _: Option<serde_json::Value> = self.execute(builder).await?;
        Ok(())
    }
}
