//! DDNS.LAND Engine Library
//!
//! Subdomain record lifecycle, accounts, administration and the HTTP API.

pub mod admin;
pub mod auth;
pub mod config;
pub mod http;
pub mod records;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::AdminService;
pub use auth::AuthService;
pub use config::{Cli, Config};
pub use records::{RecordError, RecordManager};
pub use store::{DatabaseConfig, RecordStore, StoreError, SurrealStore, UserStore};
