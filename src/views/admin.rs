//! Admin portal state

use chrono::{DateTime, Utc};

use super::auth::AuthCard;
use super::cards::AdminCard;
use super::notification::{Notification, NotificationSlot, REQUEST_CREATED, REQUEST_FAILED};
use crate::backend::AuthUser;
use crate::model::{BloodRequest, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminPage {
    Loading,
    Auth,
    Dashboard,
    CreateRequest,
}

#[derive(Debug, Clone)]
pub struct AdminView {
    pub page: AdminPage,
    pub auth: AuthCard,
    pub user: Option<AuthUser>,
    pub requests: Vec<BloodRequest>,
    /// A create-request form is being submitted
    pub submitting: bool,
    pub notification: NotificationSlot,
}

impl Default for AdminView {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminView {
    pub fn new() -> Self {
        Self {
            page: AdminPage::Loading,
            auth: AuthCard::new(Role::Admin),
            user: None,
            requests: Vec::new(),
            submitting: false,
            notification: NotificationSlot::default(),
        }
    }

    pub fn on_auth_state(&mut self, user: Option<AuthUser>) {
        self.page = if user.is_some() {
            AdminPage::Dashboard
        } else {
            self.requests.clear();
            AdminPage::Auth
        };
        self.user = user;
    }

    pub fn on_snapshot(&mut self, requests: Vec<BloodRequest>) {
        self.requests = requests;
    }

    pub fn navigate(&mut self, page: AdminPage) -> bool {
        let allowed = self.user.is_some()
            && matches!(page, AdminPage::Dashboard | AdminPage::CreateRequest);
        if allowed {
            self.page = page;
        }
        allowed
    }

    pub fn cards(&self) -> Vec<AdminCard> {
        self.requests.iter().map(AdminCard::from_request).collect()
    }

    /// (pending, fulfilled)
    pub fn counts(&self) -> (usize, usize) {
        let fulfilled = self.requests.iter().filter(|r| r.is_donated()).count();
        (self.requests.len() - fulfilled, fulfilled)
    }

    pub fn begin_submit(&mut self) -> bool {
        if self.submitting || self.page != AdminPage::CreateRequest {
            return false;
        }
        self.submitting = true;
        true
    }

    /// A created request returns to the dashboard; a failure stays on the form
    pub fn create_finished<E>(&mut self, result: Result<(), E>, now: DateTime<Utc>) {
        self.submitting = false;
        match result {
            Ok(()) => {
                self.notification
                    .show(Notification::success(REQUEST_CREATED, now));
                self.page = AdminPage::Dashboard;
            }
            Err(_) => self
                .notification
                .show(Notification::error(REQUEST_FAILED, now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> AdminView {
        let mut view = AdminView::new();
        view.on_auth_state(Some(AuthUser {
            uid: "a1".to_string(),
            email: "admin@hospital.org".to_string(),
        }));
        view
    }

    #[test]
    fn test_create_request_flow() {
        let now = Utc::now();
        let mut view = signed_in();
        assert_eq!(view.page, AdminPage::Dashboard);
        assert!(!view.begin_submit());

        assert!(view.navigate(AdminPage::CreateRequest));
        assert!(view.begin_submit());
        assert!(!view.begin_submit());

        view.create_finished(Err("backend down"), now);
        assert_eq!(view.page, AdminPage::CreateRequest);
        assert_eq!(
            view.notification.visible(now).unwrap().message,
            "Error creating request."
        );

        view.begin_submit();
        view.create_finished::<()>(Ok(()), now);
        assert_eq!(view.page, AdminPage::Dashboard);
        assert_eq!(
            view.notification.visible(now).unwrap().message,
            "Request created successfully!"
        );
    }

    #[test]
    fn test_signed_out_admin_sees_auth() {
        let mut view = AdminView::new();
        view.on_auth_state(None);
        assert_eq!(view.page, AdminPage::Auth);
        assert!(!view.navigate(AdminPage::CreateRequest));
        assert_eq!(view.counts(), (0, 0));
    }
}
