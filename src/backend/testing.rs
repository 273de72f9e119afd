//! Store double for exercising interleavings
//!
//! Wraps a [`MemoryStore`] and can stall a list read, fail profile writes,
//! or let another donor take a request right before an undo lands.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{BackendError, DocumentStore, MemoryStore};
use crate::model::{BloodRequest, DonationClaim, DonorProfile, NewRequest, VersionedRequest};

#[derive(Default)]
pub struct ScriptedStore {
    inner: MemoryStore,
    list_stall: Mutex<Option<Duration>>,
    fail_profile_writes: AtomicBool,
    claim_before_undo: Mutex<Option<DonationClaim>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next list call reads the collection, then waits before returning
    pub async fn stall_next_list(&self, delay: Duration) {
        *self.list_stall.lock().await = Some(delay);
    }

    pub fn fail_profile_writes(&self, fail: bool) {
        self.fail_profile_writes.store(fail, Ordering::SeqCst);
    }

    /// Before the next undo is applied, the request is reverted and then
    /// claimed by `claim`
    pub async fn claim_before_next_undo(&self, claim: DonationClaim) {
        *self.claim_before_undo.lock().await = Some(claim);
    }

    async fn current(&self, id: &str) -> Result<VersionedRequest, BackendError> {
        self.inner
            .get_request(id)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("request {id}")))
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.inner.health_check().await
    }

    async fn create_request(&self, request: NewRequest) -> Result<BloodRequest, BackendError> {
        self.inner.create_request(request).await
    }

    async fn get_request(&self, id: &str) -> Result<Option<VersionedRequest>, BackendError> {
        self.inner.get_request(id).await
    }

    async fn list_requests(&self) -> Result<Vec<BloodRequest>, BackendError> {
        let requests = self.inner.list_requests().await?;
        let stall = self.list_stall.lock().await.take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        Ok(requests)
    }

    async fn list_donations(&self, donor_id: &str) -> Result<Vec<BloodRequest>, BackendError> {
        self.inner.list_donations(donor_id).await
    }

    async fn record_donation(
        &self,
        id: &str,
        claim: &DonationClaim,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError> {
        self.inner.record_donation(id, claim, expected_version).await
    }

    async fn clear_donation(
        &self,
        id: &str,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError> {
        let interleaved = self.claim_before_undo.lock().await.take();
        if let Some(claim) = interleaved {
            let claimed = self.current(id).await?;
            self.inner.clear_donation(id, &claimed.version).await?;
            let reopened = self.current(id).await?;
            self.inner
                .record_donation(id, &claim, &reopened.version)
                .await?;
        }
        self.inner.clear_donation(id, expected_version).await
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<DonorProfile>, BackendError> {
        self.inner.get_profile(uid).await
    }

    async fn put_profile(&self, profile: &DonorProfile) -> Result<(), BackendError> {
        if self.fail_profile_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable);
        }
        self.inner.put_profile(profile).await
    }
}
