//! Cloudflare DNS Library
//!
//! Provider seam and Cloudflare v4 client for the DDNS.LAND zone.

pub mod cloudflare;
pub mod provider;

pub use cloudflare::{CloudflareClient, CloudflareConfig};
pub use provider::{
    DnsProvider, DnsRecord, DnsRecordRequest, ProviderError, RecordType, UnsupportedRecordType,
};
