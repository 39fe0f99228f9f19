//! DNS Provider Seam
//!
//! The contract the record lifecycle manager depends on. Each call maps to
//! exactly one remote request; retries are the caller's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Record types users may manage in the zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    #[allow(clippy::upper_case_acronyms)]
    AAAA,
    #[allow(clippy::upper_case_acronyms)]
    CNAME,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::CNAME => write!(f, "CNAME"),
        }
    }
}

/// Returned when a record type outside the managed set is requested
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Record type must be A, AAAA, or CNAME")]
pub struct UnsupportedRecordType(pub String);

impl FromStr for RecordType {
    type Err = UnsupportedRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            "CNAME" => Ok(RecordType::CNAME),
            other => Err(UnsupportedRecordType(other.to_string())),
        }
    }
}

/// Payload for creating or replacing a record at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecordRequest {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified name, e.g. "host1.ddns.land"
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

/// A record as reported back by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

/// Failure reported by (or while talking to) the DNS provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cloudflare: {reason}")]
pub struct ProviderError {
    pub reason: String,
}

impl ProviderError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Remote record management for a single zone.
///
/// Implementations never retry; a failure is returned as soon as it is seen.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create a record, returning the provider's copy with its assigned id
    async fn create_record(&self, request: &DnsRecordRequest) -> Result<DnsRecord, ProviderError>;

    /// Replace content/ttl/proxy flag of an existing record
    async fn update_record(
        &self,
        provider_id: &str,
        request: &DnsRecordRequest,
    ) -> Result<DnsRecord, ProviderError>;

    /// Delete a record by its provider id
    async fn delete_record(&self, provider_id: &str) -> Result<(), ProviderError>;
}
