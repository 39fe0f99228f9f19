//! In-memory store used by unit tests, with switchable write failures

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{RecordStore, StoreError, UserStore};
use crate::auth::{Plan, User};
use crate::records::{Record, RecordChanges};

#[derive(Default)]
pub(crate) struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
    users: RwLock<HashMap<String, User>>,
    pub(crate) fail_inserts: AtomicBool,
    pub(crate) fail_updates: AtomicBool,
    pub(crate) fail_deletes: AtomicBool,
    /// Makes `find_by_fqdn` miss, so only the unique check on insert catches duplicates
    pub(crate) blind_fqdn_lookups: AtomicBool,
}

fn injected() -> StoreError {
    StoreError::Backend("injected failure".to_string())
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// All records sorted by id, for before/after comparisons
    pub(crate) async fn snapshot(&self) -> Vec<Record> {
        let mut all: Vec<Record> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Insert bypassing uniqueness checks and failure injection
    pub(crate) async fn force_insert(&self, record: Record) {
        self.records.write().await.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut records = self.records.write().await;
        if records.values().any(|r| r.fqdn == record.fqdn) {
            return Err(StoreError::Conflict {
                field: "fqdn",
                value: record.fqdn.clone(),
            });
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, id: &str, owner_id: Option<&str>) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(id)
            .filter(|r| owner_id.map_or(true, |owner| r.owner_id == owner))
            .cloned())
    }

    async fn find_by_fqdn(&self, fqdn: &str) -> Result<Option<Record>, StoreError> {
        if self.blind_fqdn_lookups.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.fqdn == fqdn).cloned())
    }

    async fn count_for_owner(&self, owner_id: &str) -> Result<usize, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| r.owner_id == owner_id).count())
    }

    async fn count_all(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().await;
        let mut owned: Vec<Record> = records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn apply_changes(
        &self,
        id: &str,
        changes: &RecordChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Record>, StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut records = self.records.write().await;
        Ok(records.get_mut(id).map(|record| {
            record.content = changes.content.clone();
            record.ttl = changes.ttl;
            record.proxied = changes.proxied;
            record.updated_at = Some(updated_at);
            record.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(self.records.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict {
                field: "email",
                value: user.email.clone(),
            });
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all.truncate(limit);
        Ok(all)
    }

    async fn count(&self, plan: Option<Plan>) -> Result<usize, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| plan.map_or(true, |p| u.plan == p))
            .count())
    }

    async fn set_plan(&self, id: &str, plan: Plan) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            user.plan = plan;
            user.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(id).is_some())
    }
}
