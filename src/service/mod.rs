//! BloodNet operations
//!
//! The service owns the donor and admin workflows: registration and sign-in
//! through the identity provider, request creation, claiming and undoing
//! donations, history, the admin dashboard and profiles. Every write is
//! followed by a feed refresh so connected dashboards see it immediately.

mod error;
mod export;

pub use error::ServiceError;
pub use export::requests_to_csv;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
    AuthSession, AuthUser, DocumentStore, IdentityProvider, Principal, SessionCache,
};
use crate::feed::RequestFeed;
use crate::forms::{CredentialsForm, ProfileForm, RequestForm};
use crate::model::{BloodRequest, DonationClaim, DonorProfile, RequestFilter, Role};

/// Result of a successful sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub session: AuthSession,
    pub profile: DonorProfile,
}

/// Admin overview of all requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    /// All requests, newest first
    pub requests: Vec<BloodRequest>,
    pub active: usize,
    pub fulfilled: usize,
}

impl Dashboard {
    pub fn from_requests(requests: Vec<BloodRequest>) -> Self {
        let fulfilled = requests.iter().filter(|r| r.is_donated()).count();
        Self {
            active: requests.len() - fulfilled,
            fulfilled,
            requests,
        }
    }
}

/// Donor and admin operations over the managed backend
pub struct BloodNet {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    sessions: Arc<SessionCache>,
    feed: Arc<RequestFeed>,
}

impl BloodNet {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        sessions: Arc<SessionCache>,
        feed: Arc<RequestFeed>,
    ) -> Self {
        Self {
            store,
            identity,
            sessions,
            feed,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    // ============================================
    // Accounts
    // ============================================

    /// Create an account and its profile with the role of the portal used
    ///
    /// The caller is not signed in afterwards; the portal asks them to sign in.
    /// If the profile cannot be written the new account is deleted again, so
    /// the role is never lost and the email can be registered once more.
    pub async fn register(
        &self,
        form: &CredentialsForm,
        role: Role,
    ) -> Result<DonorProfile, ServiceError> {
        let (email, password) = form.validate_registration()?;
        let session = self.identity.sign_up(&email, &password).await?;

        let profile = DonorProfile::new(&session.user.uid, &session.user.email, role);
        if let Err(e) = self.store.put_profile(&profile).await {
            tracing::warn!(
                uid = %profile.uid,
                error = %e,
                "Profile write failed, removing account"
            );
            if let Err(rollback) = self.identity.delete_account(&session.id_token).await {
                tracing::error!(
                    uid = %profile.uid,
                    error = %rollback,
                    "Account left without a profile"
                );
            }
            return Err(e.into());
        }

        tracing::info!(uid = %profile.uid, role = %role, "Account registered");
        Ok(profile)
    }

    pub async fn login(&self, form: &CredentialsForm) -> Result<LoginOutcome, ServiceError> {
        let (email, password) = form.validate_sign_in()?;
        let session = self.identity.sign_in(&email, &password).await?;
        let profile = self.profile_or_default(&session.user).await?;

        self.sessions
            .insert(
                &session.id_token,
                Principal {
                    user: session.user.clone(),
                    role: profile.role,
                },
                Some(Duration::from_secs(session.expires_in)),
            )
            .await;

        tracing::info!(uid = %profile.uid, role = %profile.role, "Signed in");
        Ok(LoginOutcome { session, profile })
    }

    /// Forget a session; returns whether it was known
    pub async fn logout(&self, id_token: &str) -> bool {
        self.sessions.evict(id_token).await
    }

    /// Resolve a bearer token to the signed-in caller
    pub async fn authenticate(&self, id_token: &str) -> Result<Principal, ServiceError> {
        if id_token.trim().is_empty() {
            return Err(ServiceError::Unauthorized);
        }
        if let Some(principal) = self.sessions.get(id_token).await {
            return Ok(principal);
        }

        let user = self.identity.verify(id_token).await?;
        let role = self
            .store
            .get_profile(&user.uid)
            .await?
            .map(|p| p.role)
            .unwrap_or_default();

        let principal = Principal { user, role };
        self.sessions.insert(id_token, principal.clone(), None).await;
        Ok(principal)
    }

    /// Stored profile, created with defaults on first access
    async fn profile_or_default(&self, user: &AuthUser) -> Result<DonorProfile, ServiceError> {
        if let Some(profile) = self.store.get_profile(&user.uid).await? {
            return Ok(profile);
        }

        let profile = DonorProfile::new(&user.uid, &user.email, Role::Donor);
        self.store.put_profile(&profile).await?;
        tracing::debug!(uid = %user.uid, "Created default profile");
        Ok(profile)
    }

    // ============================================
    // Requests
    // ============================================

    /// Post a new request (admins only)
    pub async fn create_request(
        &self,
        principal: &Principal,
        form: &RequestForm,
    ) -> Result<BloodRequest, ServiceError> {
        require_admin(principal)?;
        let new_request = form.validate()?;

        let created = self.store.create_request(new_request).await?;
        tracing::info!(
            request_id = %created.id,
            blood_type = %created.blood_type,
            urgency = %created.urgency,
            by = %principal.uid(),
            "Request created"
        );

        self.after_write().await;
        Ok(created)
    }

    /// Requests matching both filters, newest first
    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<BloodRequest>, ServiceError> {
        let requests = self.feed.current_or_refresh().await?;
        Ok(filter.apply(&requests))
    }

    pub async fn get_request(&self, id: &str) -> Result<BloodRequest, ServiceError> {
        self.store
            .get_request(id)
            .await?
            .map(|versioned| versioned.request)
            .ok_or_else(|| ServiceError::NotFound(format!("request {id}")))
    }

    /// Claim an active request for the calling donor
    ///
    /// The claim is written only if nobody changed the request since it was
    /// read; a donor who loses the race gets `Conflict`.
    pub async fn donate(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<BloodRequest, ServiceError> {
        if principal.is_admin() {
            return Err(ServiceError::Forbidden(
                "only donors can claim requests".to_string(),
            ));
        }

        let current = self
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {id}")))?;
        if current.request.is_donated() {
            return Err(ServiceError::Conflict(format!(
                "request {id} is already fulfilled"
            )));
        }

        let profile = self.profile_or_default(&principal.user).await?;
        let claim = DonationClaim {
            donor_email: principal.user.email.clone(),
            donor_id: principal.uid().to_string(),
            donor_name: profile.display_name().to_string(),
        };

        let donated = self
            .store
            .record_donation(id, &claim, &current.version)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    request_id = %id,
                    donor = %claim.donor_id,
                    error = %e,
                    "Donation not recorded"
                );
            })?;
        tracing::info!(request_id = %id, donor = %claim.donor_id, "Donation recorded");

        self.after_write().await;
        Ok(donated)
    }

    /// Revert a donation; allowed for the donor who made it and for admins
    ///
    /// The revert is written only if the request is unchanged since the
    /// claimer check, so it can never remove a later donor's claim.
    pub async fn undo_donation(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<BloodRequest, ServiceError> {
        let current = self
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("request {id}")))?;
        let request = &current.request;
        if !request.is_donated() {
            return Err(ServiceError::Conflict(format!(
                "request {id} has no donation to revert"
            )));
        }
        if !request.is_claimed_by(principal.uid()) && !principal.is_admin() {
            return Err(ServiceError::Forbidden(
                "only the donor who claimed this request can revert it".to_string(),
            ));
        }

        let reverted = self.store.clear_donation(id, &current.version).await?;
        tracing::info!(request_id = %id, by = %principal.uid(), "Donation reverted");

        self.after_write().await;
        Ok(reverted)
    }

    /// Requests the caller has claimed, most recent donation first
    pub async fn history(&self, principal: &Principal) -> Result<Vec<BloodRequest>, ServiceError> {
        let mut donations = self.store.list_donations(principal.uid()).await?;
        donations.sort_by(|a, b| {
            let at = |r: &BloodRequest| r.donation.as_ref().and_then(|d| d.donation_timestamp);
            at(b).cmp(&at(a))
        });
        Ok(donations)
    }

    /// All requests with active/fulfilled counts (admins only)
    pub async fn dashboard(&self, principal: &Principal) -> Result<Dashboard, ServiceError> {
        require_admin(principal)?;
        let requests = self.feed.current_or_refresh().await?;
        Ok(Dashboard::from_requests(requests))
    }

    /// CSV of every request, newest first (admins only)
    pub async fn export_csv(&self, principal: &Principal) -> Result<String, ServiceError> {
        require_admin(principal)?;
        let requests = self.store.list_requests().await?;
        requests_to_csv(&requests)
    }

    // ============================================
    // Profiles
    // ============================================

    pub async fn profile(&self, principal: &Principal) -> Result<DonorProfile, ServiceError> {
        self.profile_or_default(&principal.user).await
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        form: &ProfileForm,
    ) -> Result<DonorProfile, ServiceError> {
        let current = self.profile_or_default(&principal.user).await?;
        let updated = form.apply_to(&current)?;
        self.store.put_profile(&updated).await?;

        tracing::info!(uid = %updated.uid, "Profile updated");
        Ok(updated)
    }

    async fn after_write(&self) {
        if let Err(e) = self.feed.refresh().await {
            tracing::warn!(error = %e, "Feed refresh after write failed");
        }
    }
}

fn require_admin(principal: &Principal) -> Result<(), ServiceError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("admin role required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedStore;
    use crate::backend::{AuthError, BackendError, MemoryIdentity, MemoryStore};
    use crate::feed::FeedConfig;
    use crate::model::{BloodType, RequestStatus, Selection, Urgency};
    use crate::websocket::{ConnectionHub, HubConfig};

    fn service() -> BloodNet {
        service_over(Arc::new(MemoryStore::new()))
    }

    fn service_over(store: Arc<dyn DocumentStore>) -> BloodNet {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let feed = Arc::new(RequestFeed::new(store.clone(), hub, FeedConfig::default()));
        BloodNet::new(
            store,
            Arc::new(MemoryIdentity::new()),
            Arc::new(SessionCache::default()),
            feed,
        )
    }

    async fn sign_up(svc: &BloodNet, email: &str, role: Role) -> (String, Principal) {
        let form = CredentialsForm::new(email, "secret1");
        svc.register(&form, role).await.unwrap();
        let outcome = svc.login(&form).await.unwrap();
        let principal = svc.authenticate(&outcome.session.id_token).await.unwrap();
        (outcome.session.id_token, principal)
    }

    fn request_form(patient: &str, blood_type: &str, urgency: &str) -> RequestForm {
        RequestForm {
            patient_name: patient.to_string(),
            hospital: "Ruby Hall".to_string(),
            hospital_address: Some("Sassoon Rd".to_string()),
            location: Some("Pune".to_string()),
            blood_type: blood_type.to_string(),
            units: 2,
            urgency: urgency.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_keeps_portal_role() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;

        assert!(admin.is_admin());
        assert!(!donor.is_admin());
    }

    #[tokio::test]
    async fn test_register_errors() {
        let svc = service();
        let form = CredentialsForm::new("donor@example.com", "secret1");
        svc.register(&form, Role::Donor).await.unwrap();

        let dup = svc.register(&form, Role::Donor).await;
        assert!(matches!(dup, Err(ServiceError::Auth(AuthError::EmailInUse))));

        let weak = svc
            .register(&CredentialsForm::new("x@example.com", "123"), Role::Donor)
            .await;
        assert!(matches!(weak, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let svc = service();
        svc.register(&CredentialsForm::new("d@example.com", "secret1"), Role::Donor)
            .await
            .unwrap();

        let result = svc
            .login(&CredentialsForm::new("d@example.com", "wrong-pass"))
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Auth(AuthError::InvalidCredential))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let svc = service();
        assert!(matches!(
            svc.authenticate("bogus").await,
            Err(ServiceError::Unauthorized)
        ));
        assert!(matches!(
            svc.authenticate("").await,
            Err(ServiceError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_only_admins_create_requests() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;

        let form = request_form("Asha", "O-", "High");
        assert!(matches!(
            svc.create_request(&donor, &form).await,
            Err(ServiceError::Forbidden(_))
        ));

        let created = svc.create_request(&admin, &form).await.unwrap();
        assert_eq!(created.status, RequestStatus::Active);
        assert_eq!(created.blood_type, BloodType::ONegative);

        let mut bad = request_form("Asha", "O-", "High");
        bad.units = 0;
        assert!(matches!(
            svc.create_request(&admin, &bad).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_applies_both_filters() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        svc.create_request(&admin, &request_form("A", "O-", "High"))
            .await
            .unwrap();
        svc.create_request(&admin, &request_form("B", "O-", "Low"))
            .await
            .unwrap();
        svc.create_request(&admin, &request_form("C", "A+", "High"))
            .await
            .unwrap();

        let all = svc.list_requests(&RequestFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let filter = RequestFilter::new(
            Selection::Only(BloodType::ONegative),
            Selection::Only(Urgency::High),
        );
        let matched = svc.list_requests(&filter).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].patient_name, "A");
    }

    #[tokio::test]
    async fn test_donate_and_undo() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;
        let (_, other) = sign_up(&svc, "other@example.com", Role::Donor).await;

        svc.update_profile(
            &donor,
            &ProfileForm {
                full_name: Some("Dana Donor".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let request = svc
            .create_request(&admin, &request_form("Asha", "B+", "Medium"))
            .await
            .unwrap();

        assert!(matches!(
            svc.donate(&admin, &request.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let donated = svc.donate(&donor, &request.id).await.unwrap();
        assert!(donated.is_donated());
        let donation = donated.donation.as_ref().unwrap();
        assert_eq!(donation.donor_name, "Dana Donor");
        assert_eq!(donation.donor_email, "donor@example.com");

        // Already claimed
        assert!(matches!(
            svc.donate(&other, &request.id).await,
            Err(ServiceError::Conflict(_))
        ));
        // Not theirs to revert
        assert!(matches!(
            svc.undo_donation(&other, &request.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        let reverted = svc.undo_donation(&donor, &request.id).await.unwrap();
        assert_eq!(reverted.status, RequestStatus::Active);
        assert!(reverted.donation.is_none());

        assert!(matches!(
            svc.undo_donation(&donor, &request.id).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            svc.donate(&donor, "missing").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_donor_name_falls_back_to_email() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;
        let request = svc
            .create_request(&admin, &request_form("Asha", "B+", "Medium"))
            .await
            .unwrap();

        let donated = svc.donate(&donor, &request.id).await.unwrap();
        assert_eq!(donated.donation.unwrap().donor_name, "donor@example.com");
    }

    #[tokio::test]
    async fn test_feed_sees_writes_immediately() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;

        let request = svc
            .create_request(&admin, &request_form("Asha", "B+", "Medium"))
            .await
            .unwrap();
        svc.donate(&donor, &request.id).await.unwrap();

        let dashboard = svc.dashboard(&admin).await.unwrap();
        assert_eq!(dashboard.requests.len(), 1);
        assert_eq!(dashboard.fulfilled, 1);
        assert_eq!(dashboard.active, 0);

        assert!(matches!(
            svc.dashboard(&donor).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_history_newest_donation_first() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;

        let first = svc
            .create_request(&admin, &request_form("First", "A+", "Low"))
            .await
            .unwrap();
        let second = svc
            .create_request(&admin, &request_form("Second", "A+", "Low"))
            .await
            .unwrap();
        svc.create_request(&admin, &request_form("Unclaimed", "A+", "Low"))
            .await
            .unwrap();

        svc.donate(&donor, &first.id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        svc.donate(&donor, &second.id).await.unwrap();

        let history = svc.history(&donor).await.unwrap();
        let names: Vec<&str> = history.iter().map(|r| r.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_export_is_admin_only() {
        let svc = service();
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;
        svc.create_request(&admin, &request_form("Asha", "B+", "Medium"))
            .await
            .unwrap();

        let csv = svc.export_csv(&admin).await.unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(matches!(
            svc.export_csv(&donor).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_defaults_and_update() {
        let svc = service();
        let (_, donor) = sign_up(&svc, "donor@example.com", Role::Donor).await;

        let profile = svc.profile(&donor).await.unwrap();
        assert_eq!(profile.email, "donor@example.com");
        assert!(profile.full_name.is_empty());

        let updated = svc
            .update_profile(
                &donor,
                &ProfileForm {
                    blood_group: Some("o+".to_string()),
                    city: Some("Mumbai".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.blood_group, Some(BloodType::OPositive));
        assert_eq!(updated.role, Role::Donor);

        let bad = svc
            .update_profile(
                &donor,
                &ProfileForm {
                    photo_url: Some("ftp://x".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_logout_evicts_session() {
        let svc = service();
        let (token, _) = sign_up(&svc, "donor@example.com", Role::Donor).await;
        assert!(svc.logout(&token).await);
        assert!(!svc.logout(&token).await);
    }

    #[tokio::test]
    async fn test_undo_never_removes_a_later_claim() {
        let store = Arc::new(ScriptedStore::new());
        let svc = service_over(store.clone());
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, first) = sign_up(&svc, "first@example.com", Role::Donor).await;
        let (_, second) = sign_up(&svc, "second@example.com", Role::Donor).await;

        let request = svc
            .create_request(&admin, &request_form("Asha", "O+", "High"))
            .await
            .unwrap();
        svc.donate(&first, &request.id).await.unwrap();

        // Between the claimer check and the write, an admin reverts and the
        // second donor claims the request
        store
            .claim_before_next_undo(DonationClaim {
                donor_email: second.user.email.clone(),
                donor_id: second.uid().to_string(),
                donor_name: second.user.email.clone(),
            })
            .await;

        let result = svc.undo_donation(&first, &request.id).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));

        let current = svc.get_request(&request.id).await.unwrap();
        assert!(current.is_claimed_by(second.uid()));
        assert_eq!(current.status, RequestStatus::Donated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_donations_have_one_winner() {
        let svc = Arc::new(service());
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;
        let (_, first) = sign_up(&svc, "first@example.com", Role::Donor).await;
        let (_, second) = sign_up(&svc, "second@example.com", Role::Donor).await;
        let request = svc
            .create_request(&admin, &request_form("Asha", "O+", "High"))
            .await
            .unwrap();

        let claim = |principal: Principal| {
            let svc = Arc::clone(&svc);
            let id = request.id.clone();
            tokio::spawn(async move { svc.donate(&principal, &id).await })
        };
        let (a, b) = tokio::join!(claim(first.clone()), claim(second.clone()));
        let results = [a.unwrap(), b.unwrap()];

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::Conflict(_))))
            .count();
        assert_eq!((winners, conflicts), (1, 1));

        let stored = svc.get_request(&request.id).await.unwrap();
        let claimed_by_one =
            stored.is_claimed_by(first.uid()) != stored.is_claimed_by(second.uid());
        assert!(claimed_by_one);
    }

    #[tokio::test]
    async fn test_failed_profile_write_removes_new_account() {
        let store = Arc::new(ScriptedStore::new());
        let svc = service_over(store.clone());
        let form = CredentialsForm::new("admin@hospital.org", "secret1");

        store.fail_profile_writes(true);
        let failed = svc.register(&form, Role::Admin).await;
        assert!(matches!(
            failed,
            Err(ServiceError::Backend(BackendError::Unavailable))
        ));
        assert!(matches!(
            svc.login(&form).await,
            Err(ServiceError::Auth(AuthError::InvalidCredential))
        ));

        store.fail_profile_writes(false);
        let profile = svc.register(&form, Role::Admin).await.unwrap();
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(svc.login(&form).await.unwrap().profile.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_write_survives_stalled_poll() {
        let store = Arc::new(ScriptedStore::new());
        let svc = service_over(store.clone());
        let (_, admin) = sign_up(&svc, "admin@hospital.org", Role::Admin).await;

        store
            .stall_next_list(std::time::Duration::from_millis(50))
            .await;
        let poll = tokio::spawn({
            let feed = Arc::clone(&svc.feed);
            async move { feed.refresh().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        svc.create_request(&admin, &request_form("Asha", "O+", "High"))
            .await
            .unwrap();
        assert_eq!(svc.dashboard(&admin).await.unwrap().requests.len(), 1);

        poll.await.unwrap().unwrap();
        assert_eq!(svc.dashboard(&admin).await.unwrap().requests.len(), 1);
    }
}
