//! Durable Store
//!
//! Trait seams for the record and user collections. The production backend is
//! SurrealDB; uniqueness of `record.fqdn` and `user.email` is enforced by the
//! store itself and surfaced as [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::{Plan, User};
use crate::records::{Record, RecordChanges};

#[cfg(test)]
pub(crate) mod memory;
pub mod surreal;

pub use surreal::{DatabaseConfig, SurrealStore};

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("duplicate {field}: {value}")]
    Conflict { field: &'static str, value: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Record collection, keyed by local record id
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record; a taken `fqdn` yields `Conflict { field: "fqdn" }`
    async fn insert(&self, record: &Record) -> Result<(), StoreError>;

    /// Point lookup, optionally restricted to one owner
    async fn find(&self, id: &str, owner_id: Option<&str>) -> Result<Option<Record>, StoreError>;

    async fn find_by_fqdn(&self, fqdn: &str) -> Result<Option<Record>, StoreError>;

    async fn count_for_owner(&self, owner_id: &str) -> Result<usize, StoreError>;

    async fn count_all(&self) -> Result<usize, StoreError>;

    /// Oldest first, at most `limit` entries
    async fn list_for_owner(&self, owner_id: &str, limit: usize)
        -> Result<Vec<Record>, StoreError>;

    /// Overwrite content/ttl/proxied and stamp `updated_at`
    async fn apply_changes(
        &self,
        id: &str,
        changes: &RecordChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Record>, StoreError>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// User collection, keyed by user id
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; a taken email yields `Conflict { field: "email" }`
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Oldest first, at most `limit` entries
    async fn list(&self, limit: usize) -> Result<Vec<User>, StoreError>;

    /// Count users, optionally only those on `plan`
    async fn count(&self, plan: Option<Plan>) -> Result<usize, StoreError>;

    async fn set_plan(&self, id: &str, plan: Plan) -> Result<Option<User>, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
