//! Managed backend access
//!
//! BloodNet does not store documents or authenticate users itself. This
//! module wraps the two managed services behind traits:
//!
//! - [`DocumentStore`]: the `requests` and `users` collections
//! - [`IdentityProvider`]: email/password accounts and id-token verification
//!
//! Production uses the REST protocols ([`FirestoreStore`], [`IdentityToolkit`]);
//! local development and tests use the in-memory doubles in [`memory`].

mod error;
mod firestore;
mod identity;
pub mod memory;
mod session;
#[cfg(test)]
pub(crate) mod testing;
mod value;

pub use error::{AuthError, BackendError};
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use identity::{IdentityConfig, IdentityToolkit};
pub use memory::{MemoryIdentity, MemoryStore};
pub use session::{Principal, SessionCache};
pub use value::{decode_fields, decode_value, encode_fields, encode_value, FirestoreDocument};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{BloodRequest, DonationClaim, DonorProfile, NewRequest, VersionedRequest};

/// Identity of a signed-in account as reported by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Tokens returned by a successful sign-up or sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: AuthUser,
    pub id_token: String,
    pub refresh_token: String,
    /// Lifetime of the id token in seconds
    pub expires_in: u64,
}

/// Typed access to the document collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &str;

    /// Cheap call that succeeds when the store is reachable
    async fn health_check(&self) -> Result<(), BackendError>;

    /// Insert a new `Active` request with a server-assigned `createdAt`
    async fn create_request(&self, request: NewRequest) -> Result<BloodRequest, BackendError>;

    async fn get_request(&self, id: &str) -> Result<Option<VersionedRequest>, BackendError>;

    /// All requests, newest `createdAt` first
    async fn list_requests(&self) -> Result<Vec<BloodRequest>, BackendError>;

    /// Requests claimed by the given donor
    async fn list_donations(&self, donor_id: &str) -> Result<Vec<BloodRequest>, BackendError>;

    /// Mark a request donated, only if it is still at `expected_version`
    ///
    /// Fails with [`BackendError::Conflict`] when another write got there
    /// first.
    async fn record_donation(
        &self,
        id: &str,
        claim: &DonationClaim,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError>;

    /// Remove the donation fields and set the request back to `Active`,
    /// only if the request is still at `expected_version`
    async fn clear_donation(
        &self,
        id: &str,
        expected_version: &str,
    ) -> Result<BloodRequest, BackendError>;

    async fn get_profile(&self, uid: &str) -> Result<Option<DonorProfile>, BackendError>;

    /// Create or replace a profile document
    async fn put_profile(&self, profile: &DonorProfile) -> Result<(), BackendError>;
}

/// Email/password identity service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Resolve an id token to the account it was issued for
    async fn verify(&self, id_token: &str) -> Result<AuthUser, AuthError>;

    /// Delete the account the id token belongs to
    async fn delete_account(&self, id_token: &str) -> Result<(), AuthError>;
}
