//! Donor profiles (collection `users`, one document per account uid)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{BloodType, Role};

/// Profile stored for every registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfile {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodType>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_donation_date: Option<NaiveDate>,
    #[serde(default)]
    pub available_for_emergency: bool,
    /// Link to a photo hosted by the file store; never uploaded by us
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl DonorProfile {
    /// Empty profile created on registration or first sign-in
    pub fn new(uid: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            full_name: String::new(),
            blood_group: None,
            city: String::new(),
            phone: String::new(),
            last_donation_date: None,
            available_for_emergency: false,
            photo_url: None,
            role,
        }
    }

    /// Name shown to hospitals: the full name, or the email if none is set
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
