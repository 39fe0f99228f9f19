//! DNS Record Lifecycle
//!
//! Owns every mutation of a user's subdomain records. The provider is always
//! called first and the local store second, so a record is only persisted
//! once it exists remotely. When the local step fails after a successful
//! remote one, the remote change is undone; if that also fails the caller
//! gets [`RecordError::Consistency`] and the divergence is logged with
//! `consistency = true`.

pub mod quota;
mod types;
pub mod validator;

pub use quota::{QuotaPolicy, DEFAULT_FREE_RECORD_LIMIT};
pub use types::{
    NewRecord, Record, RecordChanges, RecordError, RecordType, ValidationError, AUTO_TTL,
};

use chrono::Utc;
use cloudflare_dns::{DnsProvider, DnsRecordRequest};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::User;
use crate::store::{RecordStore, StoreError};

/// Most records returned by a single list call
pub const RECORD_PAGE_LIMIT: usize = 100;

/// A user's current record count against their ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub record_count: usize,
    /// `None` when the plan is unlimited
    pub record_limit: Option<usize>,
}

pub struct RecordManager {
    provider: Arc<dyn DnsProvider>,
    store: Arc<dyn RecordStore>,
    quota: QuotaPolicy,
    /// Parent domain, e.g. "ddns.land"
    domain: String,
    /// Serialises one owner's mutations from lookup through the local write
    owner_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RecordManager {
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        store: Arc<dyn RecordStore>,
        quota: QuotaPolicy,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            quota,
            domain: domain.into(),
            owner_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn quota(&self) -> &QuotaPolicy {
        &self.quota
    }

    fn fqdn(&self, label: &str) -> String {
        format!("{}.{}", label, self.domain)
    }

    async fn owner_lock(&self, owner_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.owner_locks.lock().await;
        // Drop locks nobody is holding or waiting on
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(owner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Records owned by `owner_id`, oldest first, capped at [`RECORD_PAGE_LIMIT`]
    pub async fn list_records(&self, owner_id: &str) -> Result<Vec<Record>, RecordError> {
        Ok(self
            .store
            .list_for_owner(owner_id, RECORD_PAGE_LIMIT)
            .await?)
    }

    pub async fn usage(&self, user: &User) -> Result<Usage, RecordError> {
        Ok(Usage {
            record_count: self.store.count_for_owner(&user.id).await?,
            record_limit: self.quota.limit_for(user.plan),
        })
    }

    pub async fn total_records(&self) -> Result<usize, RecordError> {
        Ok(self.store.count_all().await?)
    }

    /// Claim `label` under the parent domain for `user`
    pub async fn create_record(
        &self,
        user: &User,
        request: NewRecord,
    ) -> Result<Record, RecordError> {
        // 1. Syntax
        let record_type = validator::parse_record_type(&request.record_type)?;
        validator::validate_label(&request.label)?;
        validator::validate_content(record_type, &request.content)?;
        validator::validate_ttl(request.ttl)?;

        let label = request.label.to_ascii_lowercase();
        let fqdn = self.fqdn(&label);

        // 2. Name availability
        if self.store.find_by_fqdn(&fqdn).await?.is_some() {
            return Err(ValidationError::NameTaken(fqdn).into());
        }

        // 3. Quota, held until the record is persisted
        let lock = self.owner_lock(&user.id).await;
        let _guard = lock.lock().await;

        let current = self.store.count_for_owner(&user.id).await?;
        if !self.quota.allowed_to_create(user, current) {
            let limit = self.quota.limit_for(user.plan).unwrap_or(current);
            info!(owner_id = %user.id, current, limit, "Record quota reached");
            return Err(ValidationError::QuotaExceeded { limit }.into());
        }

        // 4. Remote
        let remote = self
            .provider
            .create_record(&DnsRecordRequest {
                record_type,
                name: fqdn.clone(),
                content: request.content.clone(),
                ttl: request.ttl,
                proxied: request.proxied,
            })
            .await?;

        // 5. Local
        let record = Record {
            id: Uuid::new_v4().to_string(),
            provider_record_id: remote.id,
            owner_id: user.id.clone(),
            record_type,
            label,
            fqdn,
            content: request.content,
            ttl: request.ttl,
            proxied: request.proxied,
            created_at: Utc::now(),
            updated_at: None,
        };

        if let Err(store_err) = self.store.insert(&record).await {
            return Err(self.undo_remote_create(&record, store_err).await);
        }

        info!(
            record_id = %record.id,
            provider_record_id = %record.provider_record_id,
            owner_id = %record.owner_id,
            fqdn = %record.fqdn,
            record_type = %record.record_type,
            "Created record"
        );
        Ok(record)
    }

    async fn undo_remote_create(&self, record: &Record, store_err: StoreError) -> RecordError {
        warn!(
            provider_record_id = %record.provider_record_id,
            fqdn = %record.fqdn,
            error = %store_err,
            "Local insert failed after remote create, removing remote record"
        );

        match self.provider.delete_record(&record.provider_record_id).await {
            Ok(()) => match store_err {
                StoreError::Conflict { .. } => ValidationError::NameTaken(record.fqdn.clone()).into(),
                other => RecordError::Store(other),
            },
            Err(provider_err) => {
                error!(
                    consistency = true,
                    provider_record_id = %record.provider_record_id,
                    fqdn = %record.fqdn,
                    owner_id = %record.owner_id,
                    "Remote record exists without a local copy"
                );
                RecordError::Consistency {
                    provider_record_id: record.provider_record_id.clone(),
                    reason: format!(
                        "local insert failed ({}) and remote removal failed ({})",
                        store_err, provider_err
                    ),
                }
            }
        }
    }

    /// Change content, ttl and proxy flag; the type stays what it was created as
    pub async fn update_record(
        &self,
        owner_id: &str,
        record_id: &str,
        changes: RecordChanges,
    ) -> Result<Record, RecordError> {
        let lock = self.owner_lock(owner_id).await;
        let _guard = lock.lock().await;

        let existing = self
            .store
            .find(record_id, Some(owner_id))
            .await?
            .ok_or(RecordError::NotFound)?;

        validator::validate_content(existing.record_type, &changes.content)?;
        validator::validate_ttl(changes.ttl)?;

        self.provider
            .update_record(
                &existing.provider_record_id,
                &DnsRecordRequest {
                    record_type: existing.record_type,
                    name: existing.fqdn.clone(),
                    content: changes.content.clone(),
                    ttl: changes.ttl,
                    proxied: changes.proxied,
                },
            )
            .await?;

        match self.store.apply_changes(record_id, &changes, Utc::now()).await {
            Ok(Some(updated)) => {
                info!(
                    record_id = %updated.id,
                    fqdn = %updated.fqdn,
                    content = %updated.content,
                    "Updated record"
                );
                Ok(updated)
            }
            // Deleted concurrently; the delete removed it remotely as well
            Ok(None) => Err(RecordError::NotFound),
            Err(store_err) => Err(self.undo_remote_update(&existing, store_err).await),
        }
    }

    async fn undo_remote_update(&self, existing: &Record, store_err: StoreError) -> RecordError {
        warn!(
            provider_record_id = %existing.provider_record_id,
            fqdn = %existing.fqdn,
            error = %store_err,
            "Local update failed after remote update, reverting remote record"
        );

        let previous = DnsRecordRequest {
            record_type: existing.record_type,
            name: existing.fqdn.clone(),
            content: existing.content.clone(),
            ttl: existing.ttl,
            proxied: existing.proxied,
        };

        match self
            .provider
            .update_record(&existing.provider_record_id, &previous)
            .await
        {
            Ok(_) => RecordError::Store(store_err),
            Err(provider_err) => {
                error!(
                    consistency = true,
                    provider_record_id = %existing.provider_record_id,
                    fqdn = %existing.fqdn,
                    owner_id = %existing.owner_id,
                    "Remote record holds values the local copy does not"
                );
                RecordError::Consistency {
                    provider_record_id: existing.provider_record_id.clone(),
                    reason: format!(
                        "local update failed ({}) and remote revert failed ({})",
                        store_err, provider_err
                    ),
                }
            }
        }
    }

    pub async fn delete_record(&self, owner_id: &str, record_id: &str) -> Result<(), RecordError> {
        let lock = self.owner_lock(owner_id).await;
        let _guard = lock.lock().await;

        let existing = self
            .store
            .find(record_id, Some(owner_id))
            .await?
            .ok_or(RecordError::NotFound)?;

        self.remove(&existing).await
    }

    /// Remote delete, then local delete
    async fn remove(&self, record: &Record) -> Result<(), RecordError> {
        self.provider
            .delete_record(&record.provider_record_id)
            .await?;

        if let Err(store_err) = self.store.delete(&record.id).await {
            error!(
                consistency = true,
                record_id = %record.id,
                provider_record_id = %record.provider_record_id,
                fqdn = %record.fqdn,
                "Local record outlived its remote record"
            );
            return Err(RecordError::Consistency {
                provider_record_id: record.provider_record_id.clone(),
                reason: format!("remote record deleted but local removal failed ({})", store_err),
            });
        }

        info!(
            record_id = %record.id,
            fqdn = %record.fqdn,
            "Deleted record"
        );
        Ok(())
    }

    /// Any owner's records, for administrators
    pub async fn admin_list_records(&self, owner_id: &str) -> Result<Vec<Record>, RecordError> {
        self.list_records(owner_id).await
    }

    /// Delete a record regardless of owner
    pub async fn admin_delete_record(&self, record_id: &str) -> Result<Record, RecordError> {
        let owner_id = self
            .store
            .find(record_id, None)
            .await?
            .ok_or(RecordError::NotFound)?
            .owner_id;

        let lock = self.owner_lock(&owner_id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock; the owner may have changed it meanwhile
        let existing = self
            .store
            .find(record_id, Some(&owner_id))
            .await?
            .ok_or(RecordError::NotFound)?;

        self.remove(&existing).await?;
        Ok(existing)
    }

    /// Delete every record of `owner_id`, stopping at the first failure.
    /// Returns how many were removed.
    pub async fn purge_owner(&self, owner_id: &str) -> Result<usize, RecordError> {
        let lock = self.owner_lock(owner_id).await;
        let _guard = lock.lock().await;

        let mut removed = 0;
        loop {
            let batch = self
                .store
                .list_for_owner(owner_id, RECORD_PAGE_LIMIT)
                .await?;
            if batch.is_empty() {
                break;
            }
            for record in &batch {
                self.remove(record).await?;
                removed += 1;
            }
        }

        debug!(owner_id, removed, "Purged records");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Plan, Role};
    use crate::store::memory::MemoryStore;
    use crate::testing::FakeProvider;
    use std::sync::atomic::Ordering;

    struct Harness {
        manager: Arc<RecordManager>,
        provider: Arc<FakeProvider>,
        store: Arc<MemoryStore>,
    }

    fn harness() -> Harness {
        let provider = Arc::new(FakeProvider::new());
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(RecordManager::new(
            provider.clone(),
            store.clone(),
            QuotaPolicy::default(),
            "ddns.land",
        ));
        Harness {
            manager,
            provider,
            store,
        }
    }

    fn user(id: &str, plan: Plan) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@gmail.com", id),
            password_hash: String::new(),
            plan,
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    fn new_record(record_type: &str, label: &str, content: &str) -> NewRecord {
        NewRecord {
            record_type: record_type.to_string(),
            label: label.to_string(),
            content: content.to_string(),
            ttl: AUTO_TTL,
            proxied: false,
        }
    }

    fn changes(content: &str) -> RecordChanges {
        RecordChanges {
            content: content.to_string(),
            ttl: 300,
            proxied: true,
        }
    }

    #[tokio::test]
    async fn test_create_goes_remote_then_local() {
        let h = harness();
        let alice = user("alice", Plan::Free);

        let record = h
            .manager
            .create_record(&alice, new_record("A", "Host1", "10.0.0.1"))
            .await
            .unwrap();

        assert_eq!(record.label, "host1");
        assert_eq!(record.fqdn, "host1.ddns.land");
        assert_eq!(record.owner_id, "alice");
        assert_eq!(record.provider_record_id, "cf-1");
        assert_eq!(h.provider.calls().await, vec!["create host1.ddns.land"]);

        let remote = h.provider.remote("cf-1").await.unwrap();
        assert_eq!(remote.content, "10.0.0.1");
        assert_eq!(h.store.snapshot().await, vec![record]);
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_provider() {
        let h = harness();
        let alice = user("alice", Plan::Free);

        let cases = [
            (new_record("MX", "host1", "10.0.0.1"), "validation"),
            (new_record("A", "-bad", "10.0.0.1"), "validation"),
            (new_record("A", &"a".repeat(64), "10.0.0.1"), "validation"),
            (new_record("A", "host1", "256.0.0.1"), "validation"),
            (new_record("AAAA", "host1", "2001:db8::g"), "validation"),
            (new_record("CNAME", "host1", "-x.com"), "validation"),
        ];
        for (request, kind) in cases {
            let err = h.manager.create_record(&alice, request).await.unwrap_err();
            assert_eq!(err.kind(), kind);
        }

        let mut bad_ttl = new_record("A", "host1", "10.0.0.1");
        bad_ttl.ttl = 30;
        assert!(matches!(
            h.manager.create_record(&alice, bad_ttl).await,
            Err(RecordError::Validation(ValidationError::InvalidTtl(30)))
        ));

        assert!(h.provider.calls().await.is_empty());
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_taken_name_checked_before_provider() {
        let h = harness();
        let alice = user("alice", Plan::Free);
        let bob = user("bob", Plan::Free);

        h.manager
            .create_record(&alice, new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();

        let err = h
            .manager
            .create_record(&bob, new_record("CNAME", "HOST1", "example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This subdomain is already taken");
        assert_eq!(err.kind(), "name_taken");
        assert_eq!(h.provider.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_free_quota() {
        let h = harness();
        let alice = user("alice", Plan::Free);

        for label in ["one", "two"] {
            h.manager
                .create_record(&alice, new_record("A", label, "10.0.0.1"))
                .await
                .unwrap();
        }

        let err = h
            .manager
            .create_record(&alice, new_record("A", "three", "10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::Validation(ValidationError::QuotaExceeded { limit: 2 })
        ));
        assert_eq!(h.provider.calls().await.len(), 2);

        let usage = h.manager.usage(&alice).await.unwrap();
        assert_eq!(
            usage,
            Usage {
                record_count: 2,
                record_limit: Some(2)
            }
        );
    }

    #[tokio::test]
    async fn test_premium_unlimited() {
        let h = harness();
        let carol = user("carol", Plan::Premium);

        for i in 0..5 {
            h.manager
                .create_record(&carol, new_record("A", &format!("host{}", i), "10.0.0.1"))
                .await
                .unwrap();
        }
        let usage = h.manager.usage(&carol).await.unwrap();
        assert_eq!(usage.record_count, 5);
        assert_eq!(usage.record_limit, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_respect_quota() {
        let h = harness();
        let alice = Arc::new(user("alice", Plan::Free));

        let mut handles = Vec::new();
        for i in 0..6 {
            let manager = h.manager.clone();
            let alice = alice.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .create_record(&alice, new_record("A", &format!("race{}", i), "10.0.0.1"))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(e.kind(), "quota_exceeded"),
            }
        }

        assert_eq!(created, 2);
        assert_eq!(h.provider.remote_count().await, 2);
        assert_eq!(h.store.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_on_create_stores_nothing() {
        let h = harness();
        h.provider.fail_creates.store(true, Ordering::SeqCst);

        let err = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider");
        assert_eq!(err.to_string(), "Cloudflare: Record quota exceeded for zone");
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_removes_remote_record() {
        let h = harness();
        h.store.fail_inserts.store(true, Ordering::SeqCst);

        let err = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "store");
        assert_eq!(
            h.provider.calls().await,
            vec!["create host1.ddns.land", "delete cf-1"]
        );
        assert_eq!(h.provider.remote_count().await, 0);
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_and_failed_removal_is_consistency() {
        let h = harness();
        h.store.fail_inserts.store(true, Ordering::SeqCst);
        h.provider.fail_deletes.store(true, Ordering::SeqCst);

        let err = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap_err();

        match err {
            RecordError::Consistency {
                provider_record_id, ..
            } => assert_eq!(provider_record_id, "cf-1"),
            other => panic!("expected consistency error, got {:?}", other),
        }
        assert_eq!(h.provider.remote_count().await, 1);
        assert!(h.store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_lost_name_race_reports_taken() {
        let h = harness();
        h.manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();

        // Both claims pass the availability check; the unique index decides
        h.store.blind_fqdn_lookups.store(true, Ordering::SeqCst);
        let err = h
            .manager
            .create_record(&user("bob", Plan::Free), new_record("A", "host1", "10.0.0.2"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "name_taken");
        assert_eq!(h.provider.remote_count().await, 1);
        assert_eq!(h.store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_uses_stored_type_and_name() {
        let h = harness();
        let alice = user("alice", Plan::Free);
        let record = h
            .manager
            .create_record(&alice, new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();

        // A CNAME-looking value is judged against the stored A type
        let err = h
            .manager
            .update_record("alice", &record.id, changes("example.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::Validation(ValidationError::InvalidIpv4)
        ));

        let updated = h
            .manager
            .update_record("alice", &record.id, changes("10.0.0.2"))
            .await
            .unwrap();
        assert_eq!(updated.content, "10.0.0.2");
        assert_eq!(updated.ttl, 300);
        assert!(updated.proxied);
        assert_eq!(updated.record_type, RecordType::A);
        assert_eq!(updated.created_at, record.created_at);
        assert!(updated.updated_at.is_some());

        let remote = h.provider.remote("cf-1").await.unwrap();
        assert_eq!(remote.name, "host1.ddns.land");
        assert_eq!(remote.content, "10.0.0.2");
    }

    #[tokio::test]
    async fn test_update_provider_failure_leaves_local_untouched() {
        let h = harness();
        let record = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();
        h.provider.fail_updates.store(true, Ordering::SeqCst);

        let err = h
            .manager
            .update_record("alice", &record.id, changes("10.0.0.2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider");
        assert_eq!(h.store.snapshot().await, vec![record]);
    }

    #[tokio::test]
    async fn test_failed_local_update_reverts_remote() {
        let h = harness();
        let record = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();
        h.store.fail_updates.store(true, Ordering::SeqCst);

        let err = h
            .manager
            .update_record("alice", &record.id, changes("10.0.0.2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "store");

        let remote = h.provider.remote("cf-1").await.unwrap();
        assert_eq!(remote.content, "10.0.0.1");
        assert_eq!(remote.ttl, AUTO_TTL);
        assert_eq!(h.store.snapshot().await, vec![record]);
    }

    #[tokio::test]
    async fn test_cross_owner_is_not_found() {
        let h = harness();
        let record = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();

        let update = h
            .manager
            .update_record("bob", &record.id, changes("10.0.0.9"))
            .await
            .unwrap_err();
        let delete = h.manager.delete_record("bob", &record.id).await.unwrap_err();
        let missing = h.manager.delete_record("bob", "no-such-id").await.unwrap_err();

        assert_eq!(update.to_string(), "Record not found");
        assert_eq!(delete.to_string(), missing.to_string());
        assert_eq!(h.provider.calls().await.len(), 1);
        assert_eq!(h.store.snapshot().await, vec![record]);
    }

    #[tokio::test]
    async fn test_lifecycle_seen_through_list() {
        let h = harness();
        let alice = user("alice", Plan::Free);

        let created = h
            .manager
            .create_record(&alice, new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();
        let listed = h.manager.list_records("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].fqdn, "host1.ddns.land");
        assert_eq!(listed[0].content, "10.0.0.1");
        assert!(listed[0].updated_at.is_none());

        h.manager
            .update_record("alice", &created.id, changes("10.0.0.2"))
            .await
            .unwrap();
        let listed = h.manager.list_records("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "10.0.0.2");
        assert!(listed[0].updated_at.is_some());

        h.manager.delete_record("alice", &created.id).await.unwrap();
        assert!(h.manager.list_records("alice").await.unwrap().is_empty());
        assert_eq!(h.provider.remote_count().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_updates_keep_remote_and_local_in_step() {
        let h = harness();
        let record = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();
        *h.provider.update_reply_delay.lock().await = Some(std::time::Duration::from_millis(150));

        let (first, second) = tokio::join!(
            h.manager.update_record("alice", &record.id, changes("10.0.0.2")),
            h.manager.update_record("alice", &record.id, changes("10.0.0.3")),
        );
        first.unwrap();
        second.unwrap();

        let remote = h.provider.remote(&record.provider_record_id).await.unwrap();
        let local = h.store.snapshot().await;
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].content, remote.content);
        assert_eq!(
            h.provider.calls().await,
            vec![
                "create host1.ddns.land",
                "update cf-1 10.0.0.2",
                "update cf-1 10.0.0.3"
            ]
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let h = harness();
        let alice = user("alice", Plan::Free);
        let record = h
            .manager
            .create_record(&alice, new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();

        h.manager.delete_record("alice", &record.id).await.unwrap();
        assert_eq!(h.provider.remote_count().await, 0);
        assert!(h.store.snapshot().await.is_empty());

        // The name is free again
        assert!(h
            .manager
            .create_record(&alice, new_record("A", "host1", "10.0.0.1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_delete_provider_failure_keeps_local() {
        let h = harness();
        let record = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();
        h.provider.fail_deletes.store(true, Ordering::SeqCst);

        let err = h.manager.delete_record("alice", &record.id).await.unwrap_err();
        assert_eq!(err.kind(), "provider");
        assert_eq!(h.store.snapshot().await, vec![record]);
    }

    #[tokio::test]
    async fn test_delete_local_failure_is_consistency() {
        let h = harness();
        let record = h
            .manager
            .create_record(&user("alice", Plan::Free), new_record("A", "host1", "10.0.0.1"))
            .await
            .unwrap();
        h.store.fail_deletes.store(true, Ordering::SeqCst);

        let err = h.manager.delete_record("alice", &record.id).await.unwrap_err();
        assert_eq!(err.kind(), "consistency");
        assert_eq!(h.provider.remote_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_capped() {
        let h = harness();
        let base = Utc::now();
        for i in 0..(RECORD_PAGE_LIMIT + 5) {
            h.store
                .force_insert(Record {
                    id: format!("r{:03}", i),
                    provider_record_id: format!("cf-{}", i),
                    owner_id: "alice".to_string(),
                    record_type: RecordType::A,
                    label: format!("host{}", i),
                    fqdn: format!("host{}.ddns.land", i),
                    content: "10.0.0.1".to_string(),
                    ttl: AUTO_TTL,
                    proxied: false,
                    created_at: base + chrono::Duration::seconds(i as i64),
                    updated_at: None,
                })
                .await;
        }

        let listed = h.manager.list_records("alice").await.unwrap();
        assert_eq!(listed.len(), RECORD_PAGE_LIMIT);
        assert_eq!(listed[0].id, "r000");
        assert!(h.manager.list_records("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_delete_and_purge() {
        let h = harness();
        let carol = user("carol", Plan::Premium);
        let mut ids = Vec::new();
        for i in 0..3 {
            let record = h
                .manager
                .create_record(&carol, new_record("A", &format!("host{}", i), "10.0.0.1"))
                .await
                .unwrap();
            ids.push(record.id);
        }

        let removed = h.manager.admin_delete_record(&ids[0]).await.unwrap();
        assert_eq!(removed.fqdn, "host0.ddns.land");
        assert!(matches!(
            h.manager.admin_delete_record(&ids[0]).await,
            Err(RecordError::NotFound)
        ));

        assert_eq!(h.manager.purge_owner("carol").await.unwrap(), 2);
        assert_eq!(h.provider.remote_count().await, 0);
        assert_eq!(h.manager.total_records().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_stops_at_first_failure() {
        let h = harness();
        let carol = user("carol", Plan::Premium);
        for i in 0..3 {
            h.manager
                .create_record(&carol, new_record("A", &format!("host{}", i), "10.0.0.1"))
                .await
                .unwrap();
        }
        h.provider.fail_deletes.store(true, Ordering::SeqCst);

        assert_eq!(h.manager.purge_owner("carol").await.unwrap_err().kind(), "provider");
        assert_eq!(h.store.snapshot().await.len(), 3);
        assert_eq!(h.provider.remote_count().await, 3);
    }
}
