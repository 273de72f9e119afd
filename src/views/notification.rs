use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long a notification stays visible, in milliseconds
pub const NOTIFICATION_TTL_MS: i64 = 4000;

pub const DONATION_SUCCESS: &str = "Success! Donation status updated.";
pub const DONATION_FAILED: &str = "Error: Could not complete donation.";
pub const DONATION_REVERTED: &str = "Donation status reverted.";
pub const UNDO_FAILED: &str = "Error: Could not revert donation.";
pub const REQUEST_CREATED: &str = "Request created successfully!";
pub const REQUEST_FAILED: &str = "Error creating request.";
pub const REGISTERED: &str = "Registration successful! Please sign in.";
pub const PROFILE_SAVED: &str = "Profile updated.";
pub const PROFILE_FAILED: &str = "Error: Could not update profile.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Toast shown at the bottom of a portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub shown_at: DateTime<Utc>,
}

impl Notification {
    pub fn success(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
            shown_at: now,
        }
    }

    pub fn error(message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Error,
            shown_at: now,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.shown_at >= Duration::milliseconds(NOTIFICATION_TTL_MS)
    }

    /// CSS class of the toast
    pub fn css_class(&self) -> &'static str {
        match self.kind {
            NotificationKind::Success => "notification",
            NotificationKind::Error => "notification error",
        }
    }
}

/// Holds at most one notification; a newer one replaces the older
#[derive(Debug, Clone, Default)]
pub struct NotificationSlot {
    current: Option<Notification>,
}

impl NotificationSlot {
    pub fn show(&mut self, notification: Notification) {
        self.current = Some(notification);
    }

    /// The notification to render at `now`, if it has not expired
    pub fn visible(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.current.as_ref().filter(|n| !n.is_expired(now))
    }

    /// Drop an expired notification
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.current.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.current = None;
        }
    }
}
