//! View state for the portal, donor and admin screens
//!
//! These are plain state machines with no I/O. Callers feed them auth state
//! changes, request snapshots and the outcome of writes; the views decide the
//! page, the cards to render and the notification to show. Time is passed in
//! so notification expiry is deterministic.

mod admin;
mod auth;
mod cards;
mod donor;
mod notification;
mod portal;

pub use admin::{AdminPage, AdminView};
pub use auth::{AuthCard, AuthMode};
pub use cards::{AdminCard, CardHeader, DonorCard};
pub use donor::{DonationModal, DonorPage, DonorView, EMPTY_FILTER_MESSAGE};
pub use notification::{
    Notification, NotificationKind, NotificationSlot, DONATION_FAILED, DONATION_REVERTED,
    DONATION_SUCCESS, NOTIFICATION_TTL_MS, PROFILE_FAILED, PROFILE_SAVED, REGISTERED,
    REQUEST_CREATED, REQUEST_FAILED, UNDO_FAILED,
};
pub use portal::Portal;
