//! Donor portal state
//!
//! Pages are mutually exclusive. The request list is whatever the last
//! snapshot said; the view never merges or patches it locally.

use chrono::{DateTime, Utc};

use super::auth::AuthCard;
use super::cards::DonorCard;
use super::notification::{
    Notification, NotificationSlot, DONATION_FAILED, DONATION_REVERTED, DONATION_SUCCESS,
    PROFILE_FAILED, PROFILE_SAVED, UNDO_FAILED,
};
use crate::backend::AuthUser;
use crate::model::{BloodRequest, DonorProfile, RequestFilter, Role};

/// Shown instead of cards when the filters match nothing
pub const EMPTY_FILTER_MESSAGE: &str = "No active requests for the selected filters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonorPage {
    Loading,
    Auth,
    Dashboard,
    History,
    Profile,
}

/// Confirmation dialog for a donation
#[derive(Debug, Clone, PartialEq)]
pub struct DonationModal {
    pub request: BloodRequest,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub struct DonorView {
    pub page: DonorPage,
    pub auth: AuthCard,
    pub user: Option<AuthUser>,
    pub requests: Vec<BloodRequest>,
    pub filter: RequestFilter,
    pub modal: Option<DonationModal>,
    pub history: Vec<BloodRequest>,
    pub profile: Option<DonorProfile>,
    pub notification: NotificationSlot,
}

impl Default for DonorView {
    fn default() -> Self {
        Self::new()
    }
}

impl DonorView {
    pub fn new() -> Self {
        Self {
            page: DonorPage::Loading,
            auth: AuthCard::new(Role::Donor),
            user: None,
            requests: Vec::new(),
            filter: RequestFilter::default(),
            modal: None,
            history: Vec::new(),
            profile: None,
            notification: NotificationSlot::default(),
        }
    }

    /// Signed in goes to the dashboard, signed out to the auth card
    pub fn on_auth_state(&mut self, user: Option<AuthUser>) {
        self.page = if user.is_some() {
            DonorPage::Dashboard
        } else {
            self.requests.clear();
            self.history.clear();
            self.profile = None;
            self.modal = None;
            DonorPage::Auth
        };
        self.user = user;
    }

    pub fn on_snapshot(&mut self, requests: Vec<BloodRequest>) {
        self.requests = requests;
    }

    /// Switch page; only signed-in donors can leave the auth card
    pub fn navigate(&mut self, page: DonorPage) -> bool {
        let allowed = self.user.is_some()
            && matches!(
                page,
                DonorPage::Dashboard | DonorPage::History | DonorPage::Profile
            );
        if allowed {
            self.page = page;
        }
        allowed
    }

    pub fn set_filter(&mut self, filter: RequestFilter) {
        self.filter = filter;
    }

    pub fn visible_requests(&self) -> Vec<BloodRequest> {
        self.filter.apply(&self.requests)
    }

    pub fn cards(&self) -> Vec<DonorCard> {
        self.requests
            .iter()
            .filter(|r| self.filter.matches(r))
            .map(DonorCard::from_request)
            .collect()
    }

    /// Message replacing the grid when nothing matches
    pub fn empty_message(&self) -> Option<&'static str> {
        if self.requests.iter().any(|r| self.filter.matches(r)) {
            None
        } else {
            Some(EMPTY_FILTER_MESSAGE)
        }
    }

    /// Open the confirmation dialog; refused for a request already fulfilled
    pub fn open_modal(&mut self, request_id: &str) -> bool {
        let Some(request) = self.requests.iter().find(|r| r.id == request_id) else {
            return false;
        };
        if request.is_donated() {
            return false;
        }
        self.modal = Some(DonationModal {
            request: request.clone(),
            loading: false,
        });
        true
    }

    pub fn cancel_modal(&mut self) {
        if self.modal.as_ref().is_some_and(|m| !m.loading) {
            self.modal = None;
        }
    }

    /// Mark the dialog busy and return the request to claim
    pub fn confirm_modal(&mut self) -> Option<String> {
        let modal = self.modal.as_mut()?;
        if modal.loading {
            return None;
        }
        modal.loading = true;
        Some(modal.request.id.clone())
    }

    /// Close the dialog after the claim settled, either way
    pub fn donation_finished<E>(&mut self, result: Result<(), E>, now: DateTime<Utc>) {
        self.modal = None;
        self.notification.show(match result {
            Ok(()) => Notification::success(DONATION_SUCCESS, now),
            Err(_) => Notification::error(DONATION_FAILED, now),
        });
    }

    pub fn undo_finished<E>(&mut self, result: Result<(), E>, now: DateTime<Utc>) {
        self.notification.show(match result {
            Ok(()) => Notification::success(DONATION_REVERTED, now),
            Err(_) => Notification::error(UNDO_FAILED, now),
        });
    }

    pub fn on_history(&mut self, history: Vec<BloodRequest>) {
        self.history = history;
    }

    pub fn on_profile(&mut self, profile: DonorProfile) {
        self.profile = Some(profile);
    }

    pub fn profile_saved<E>(&mut self, result: Result<DonorProfile, E>, now: DateTime<Utc>) {
        match result {
            Ok(profile) => {
                self.profile = Some(profile);
                self.notification
                    .show(Notification::success(PROFILE_SAVED, now));
            }
            Err(_) => self
                .notification
                .show(Notification::error(PROFILE_FAILED, now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BloodType, NewRequest, RequestStatus, Selection, Urgency};

    fn request(id: &str, blood_type: BloodType, urgency: Urgency) -> BloodRequest {
        NewRequest {
            patient_name: format!("patient {id}"),
            hospital: "Sahyadri".to_string(),
            hospital_address: None,
            location: None,
            blood_type,
            units: 1,
            urgency,
        }
        .into_request(id.to_string(), None)
    }

    fn signed_in() -> DonorView {
        let mut view = DonorView::new();
        view.on_auth_state(Some(AuthUser {
            uid: "u1".to_string(),
            email: "d@example.com".to_string(),
        }));
        view
    }

    #[test]
    fn test_auth_state_drives_page() {
        let mut view = DonorView::new();
        assert_eq!(view.page, DonorPage::Loading);

        view.on_auth_state(None);
        assert_eq!(view.page, DonorPage::Auth);
        assert!(!view.navigate(DonorPage::Dashboard));

        let mut view = signed_in();
        assert_eq!(view.page, DonorPage::Dashboard);
        assert!(view.navigate(DonorPage::History));
        assert!(!view.navigate(DonorPage::Loading));
        assert_eq!(view.page, DonorPage::History);

        view.on_snapshot(vec![request("r1", BloodType::APositive, Urgency::Low)]);
        view.on_auth_state(None);
        assert!(view.requests.is_empty());
    }

    #[test]
    fn test_snapshot_replaces_list_and_filters_apply() {
        let mut view = signed_in();
        view.on_snapshot(vec![
            request("r1", BloodType::OPositive, Urgency::High),
            request("r2", BloodType::APositive, Urgency::High),
        ]);
        view.on_snapshot(vec![request("r3", BloodType::OPositive, Urgency::Low)]);
        assert_eq!(view.requests.len(), 1);

        view.set_filter(RequestFilter::new(
            Selection::Only(BloodType::OPositive),
            Selection::Only(Urgency::High),
        ));
        assert!(view.cards().is_empty());
        assert_eq!(view.empty_message(), Some(EMPTY_FILTER_MESSAGE));

        view.set_filter(RequestFilter::new(Selection::All, Selection::Only(Urgency::Low)));
        assert_eq!(view.visible_requests().len(), 1);
        assert!(view.empty_message().is_none());
    }

    #[test]
    fn test_modal_flow() {
        let now = Utc::now();
        let mut view = signed_in();
        let mut fulfilled = request("r2", BloodType::BNegative, Urgency::High);
        fulfilled.status = RequestStatus::Donated;
        view.on_snapshot(vec![request("r1", BloodType::BNegative, Urgency::High), fulfilled]);

        assert!(!view.open_modal("r2"));
        assert!(!view.open_modal("missing"));

        assert!(view.open_modal("r1"));
        view.cancel_modal();
        assert!(view.modal.is_none());

        view.open_modal("r1");
        assert_eq!(view.confirm_modal().as_deref(), Some("r1"));
        // Busy dialog ignores a second confirm and cancel
        assert!(view.confirm_modal().is_none());
        view.cancel_modal();
        assert!(view.modal.is_some());

        view.donation_finished::<()>(Ok(()), now);
        assert!(view.modal.is_none());
        assert_eq!(
            view.notification.visible(now).unwrap().message,
            "Success! Donation status updated."
        );

        view.open_modal("r1");
        view.confirm_modal();
        view.donation_finished(Err("conflict"), now);
        assert!(view.modal.is_none());
        let shown = view.notification.visible(now).unwrap();
        assert!(shown.is_error());
        assert_eq!(shown.message, "Error: Could not complete donation.");

        view.undo_finished::<()>(Ok(()), now);
        assert_eq!(
            view.notification.visible(now).unwrap().message,
            "Donation status reverted."
        );
    }
}
