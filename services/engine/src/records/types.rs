//! Record types and the lifecycle error taxonomy

use chrono::{DateTime, Utc};
use cloudflare_dns::ProviderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cloudflare_dns::RecordType;

use crate::store::StoreError;

/// A subdomain record owned by one user and mirrored at the DNS provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    /// Identity assigned by the provider; authoritative for remote calls
    pub provider_record_id: String,
    pub owner_id: String,
    pub record_type: RecordType,
    pub label: String,
    pub fqdn: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request to claim a new subdomain
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    /// Kept as text so unsupported types fail validation with a reason
    pub record_type: String,
    pub label: String,
    pub content: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

/// Mutable part of a record; the type is fixed at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChanges {
    pub content: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

/// Provider "automatic" TTL
pub const AUTO_TTL: u32 = 1;

fn default_ttl() -> u32 {
    AUTO_TTL
}

/// Rejections detected before any remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid subdomain name. Use only letters, numbers, and hyphens.")]
    InvalidLabel,

    #[error("Subdomain name too long (max 63 characters)")]
    LabelTooLong,

    #[error("Record type must be A, AAAA, or CNAME")]
    UnsupportedType(String),

    #[error("Invalid IPv4 address")]
    InvalidIpv4,

    #[error("Invalid IPv6 address")]
    InvalidIpv6,

    #[error("Invalid CNAME target")]
    InvalidCname,

    #[error("Invalid TTL {0}: use 1 (automatic) or 60-86400 seconds")]
    InvalidTtl(u32),

    #[error("Free plan limit reached. Upgrade to create more records.")]
    QuotaExceeded { limit: usize },

    #[error("This subdomain is already taken")]
    NameTaken(String),
}

/// Errors surfaced by the record lifecycle manager
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing, or owned by someone else
    #[error("Record not found")]
    NotFound,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Remote and local state diverged and compensation did not repair it
    #[error("Record {provider_record_id} is out of sync with the DNS provider: {reason}")]
    Consistency {
        provider_record_id: String,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RecordError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::Validation(ValidationError::QuotaExceeded { .. }) => "quota_exceeded",
            RecordError::Validation(ValidationError::NameTaken(_)) => "name_taken",
            RecordError::Validation(_) => "validation",
            RecordError::NotFound => "not_found",
            RecordError::Provider(_) => "provider",
            RecordError::Consistency { .. } => "consistency",
            RecordError::Store(_) => "store",
        }
    }
}
