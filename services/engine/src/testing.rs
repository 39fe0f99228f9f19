//! Test doubles shared by the unit tests

use async_trait::async_trait;
use cloudflare_dns::{DnsProvider, DnsRecord, DnsRecordRequest, ProviderError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// In-process provider that records every call it receives
#[derive(Default)]
pub(crate) struct FakeProvider {
    records: Mutex<HashMap<String, DnsRecord>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    pub(crate) fail_creates: AtomicBool,
    pub(crate) fail_updates: AtomicBool,
    pub(crate) fail_deletes: AtomicBool,
    /// Hold back the reply to the next update after it has been applied
    pub(crate) update_reply_delay: Mutex<Option<Duration>>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Calls in arrival order, e.g. `create host1.ddns.land`
    pub(crate) async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn remote(&self, provider_id: &str) -> Option<DnsRecord> {
        self.records.lock().await.get(provider_id).cloned()
    }

    pub(crate) async fn remote_count(&self) -> usize {
        self.records.lock().await.len()
    }

    async fn log(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl DnsProvider for FakeProvider {
    async fn create_record(&self, request: &DnsRecordRequest) -> Result<DnsRecord, ProviderError> {
        self.log(format!("create {}", request.name)).await;
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(ProviderError::new("Record quota exceeded for zone"));
        }

        let id = format!("cf-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = DnsRecord {
            id: id.clone(),
            record_type: request.record_type,
            name: request.name.clone(),
            content: request.content.clone(),
            ttl: request.ttl,
            proxied: request.proxied,
        };
        self.records.lock().await.insert(id, record.clone());
        Ok(record)
    }

    async fn update_record(
        &self,
        provider_id: &str,
        request: &DnsRecordRequest,
    ) -> Result<DnsRecord, ProviderError> {
        self.log(format!("update {} {}", provider_id, request.content))
            .await;

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ProviderError::new("Content for A record is invalid"));
        }

        let updated = {
            let mut records = self.records.lock().await;
            let record = records
                .get_mut(provider_id)
                .ok_or_else(|| ProviderError::new("Record does not exist"))?;
            record.name = request.name.clone();
            record.content = request.content.clone();
            record.ttl = request.ttl;
            record.proxied = request.proxied;
            record.clone()
        };

        let delay = self.update_reply_delay.lock().await.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(updated)
    }

    async fn delete_record(&self, provider_id: &str) -> Result<(), ProviderError> {
        self.log(format!("delete {}", provider_id)).await;

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ProviderError::new("request timed out after 30s"));
        }

        match self.records.lock().await.remove(provider_id) {
            Some(_) => Ok(()),
            None => Err(ProviderError::new("Record does not exist")),
        }
    }
}
