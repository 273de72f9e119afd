use chrono::{DateTime, Utc};

use super::notification::{Notification, REGISTERED};
use crate::backend::AuthError;
use crate::model::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Sign-in / register card shared by both portals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCard {
    pub role: Role,
    pub mode: AuthMode,
    pub loading: bool,
}

impl AuthCard {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            mode: AuthMode::Login,
            loading: false,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.role {
            Role::Donor => "Donor Portal",
            Role::Admin => "Admin Portal",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "Sign in to continue",
            AuthMode::Register => "Create an account",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            AuthMode::Login => "Sign In",
            AuthMode::Register => "Register",
        }
    }

    pub fn toggle(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
    }

    pub fn begin(&mut self) {
        self.loading = true;
    }

    /// Settle a submitted form
    ///
    /// A registration switches the card to sign-in. A sign-in success needs
    /// no toast; the auth state change moves the portal to its dashboard.
    pub fn finish(
        &mut self,
        result: Result<(), &AuthError>,
        now: DateTime<Utc>,
    ) -> Option<Notification> {
        self.loading = false;
        match (result, self.mode) {
            (Ok(()), AuthMode::Register) => {
                self.mode = AuthMode::Login;
                Some(Notification::success(REGISTERED, now))
            }
            (Ok(()), AuthMode::Login) => None,
            (Err(e), _) => Some(Notification::error(e.friendly_message(), now)),
        }
    }
}
