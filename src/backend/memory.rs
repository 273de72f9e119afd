//! In-process backend doubles
//!
//! `MemoryStore` and `MemoryIdentity` behave like the managed services for
//! local development (`backend.kind = "memory"`) and for tests. Nothing is
//! persisted.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::error::{AuthError, BackendError};
use super::{AuthSession, AuthUser, DocumentStore, IdentityProvider};
use crate::forms::MIN_PASSWORD_LEN;
use crate::model::{
    sort_newest_first, BloodRequest, Donation, DonationClaim, DonorProfile, NewRequest,
    RequestStatus, VersionedRequest,
};

struct StoredRequest {
    request: BloodRequest,
    version: u64,
}

/// Document store kept in memory
#[derive(Default)]
pub struct MemoryStore {
    requests: RwLock<HashMap<String, StoredRequest>>,
    profiles: RwLock<HashMap<String, DonorProfile>>,
    /// Monotonic version counter shared by all documents
    clock: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn create_request(&self, request: NewRequest) -> Result<BloodRequest, BackendError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let record = request.into_request(id.clone(), Some(Utc::now()));

        let stored = StoredRequest {
            request: record.clone(),
            version: self.next_version(),
        };
        self.requests.write().await.insert(id, stored);
        Ok(record)
    }

    async fn get_request(&self, id: &str) -> Result<Option<VersionedRequest>, BackendError> {
        let requests = self.requests.read().await;
        Ok(requests.get(id).map(|stored| VersionedRequest {
            request: stored.request.clone(),
            version: stored.version.to_string(),
        }))
    }

    async fn list_requests(&self) -> Result<Vec<BloodRequest>, BackendError> {
        let mut list: Vec<BloodRequest> = self
            .requests
            .read()
            .await
            .values()
            .map(|stored| stored.request.clone())
            .collect();
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn list_donations(&self, donor_id: &str) -> Result<Vec<BloodRequest>, BackendError> {
        Ok(self
            .requests
            .read()
            .await
            .values()
            .filter(|stored| stored.request.is_claimed_by(donor_id))
            .map(|stored| stored.request.clone())
            .collect())
    }

    async fn record_donation(
        &self,
        id: &str,
        claim: &DonationClaim,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError> {
        let version = self.next_version();
        let mut requests = self.requests.write().await;
        let stored = requests
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("request {id}")))?;

        if stored.version.to_string() != expected_version {
            return Err(BackendError::Conflict(format!(
                "request {id} changed since version {expected_version}"
            )));
        }

        stored.request.status = RequestStatus::Donated;
        stored.request.donation = Some(Donation {
            donor_email: claim.donor_email.clone(),
            donor_id: claim.donor_id.clone(),
            donor_name: claim.donor_name.clone(),
            donation_timestamp: Some(Utc::now()),
        });
        stored.version = version;
        Ok(stored.request.clone())
    }

    async fn clear_donation(
        &self,
        id: &str,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError> {
        let version = self.next_version();
        let mut requests = self.requests.write().await;
        let stored = requests
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("request {id}")))?;

        if stored.version.to_string() != expected_version {
            return Err(BackendError::Conflict(format!(
                "request {id} changed since version {expected_version}"
            )));
        }

        stored.request.status = RequestStatus::Active;
        stored.request.donation = None;
        stored.version = version;
        Ok(stored.request.clone())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<DonorProfile>, BackendError> {
        Ok(self.profiles.read().await.get(uid).cloned())
    }

    async fn put_profile(&self, profile: &DonorProfile) -> Result<(), BackendError> {
        self.profiles
            .write()
            .await
            .insert(profile.uid.clone(), profile.clone());
        Ok(())
    }
}

struct Account {
    uid: String,
    password: String,
}

/// Identity provider kept in memory, for development and tests only
#[derive(Default)]
pub struct MemoryIdentity {
    /// Accounts keyed by lowercase email
    accounts: RwLock<HashMap<String, Account>>,
    /// Issued id tokens
    tokens: RwLock<HashMap<String, AuthUser>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    async fn issue(&self, user: AuthUser) -> AuthSession {
        let id_token = uuid::Uuid::new_v4().to_string();
        self.tokens
            .write()
            .await
            .insert(id_token.clone(), user.clone());

        AuthSession {
            user,
            id_token,
            refresh_token: uuid::Uuid::new_v4().to_string(),
            expires_in: 3600,
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn name(&self) -> &str {
        "memory"
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let key = email.to_lowercase();
        let uid = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailInUse);
            }
            let uid = uuid::Uuid::new_v4().simple().to_string();
            accounts.insert(
                key.clone(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                },
            );
            uid
        };

        Ok(self.issue(AuthUser { uid, email: key }).await)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let key = email.to_lowercase();
        let uid = {
            let accounts = self.accounts.read().await;
            match accounts.get(&key) {
                Some(account) if account.password == password => account.uid.clone(),
                _ => return Err(AuthError::InvalidCredential),
            }
        };

        Ok(self.issue(AuthUser { uid, email: key }).await)
    }

    async fn verify(&self, id_token: &str) -> Result<AuthUser, AuthError> {
        self.tokens
            .read()
            .await
            .get(id_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    async fn delete_account(&self, id_token: &str) -> Result<(), AuthError> {
        let user = self.verify(id_token).await?;

        self.accounts
            .write()
            .await
            .retain(|_, account| account.uid != user.uid);
        self.tokens
            .write()
            .await
            .retain(|_, issued| issued.uid != user.uid);
        Ok(())
    }
}
