//! BloodNet data model
//!
//! Two loosely-typed document shapes live in the document store:
//! - `BloodRequest` in the `requests` collection
//! - `DonorProfile` in the `users` collection
//!
//! Field names on the wire are camelCase to match the stored documents.

mod filter;
mod profile;
mod request;
mod types;

pub use filter::{RequestFilter, Selection};
pub use profile::DonorProfile;
pub use request::{
    sort_newest_first, BloodRequest, Donation, DonationClaim, NewRequest, RequestDocument,
    VersionedRequest,
};
pub use types::{BloodType, ParseEnumError, RequestStatus, Role, Urgency};

/// Collection holding blood requests
pub const REQUESTS_COLLECTION: &str = "requests";

/// Collection holding donor profiles
pub const USERS_COLLECTION: &str = "users";
