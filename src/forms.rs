//! Form-to-record mapping
//!
//! Forms arrive as loosely-typed text (from the CLI, or JSON bodies posted
//! by a browser) and are validated here before anything reaches the
//! document store.

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::model::{BloodType, DonorProfile, NewRequest, ParseEnumError, Urgency};

/// Minimum password length accepted by the identity service
pub const MIN_PASSWORD_LEN: usize = 6;

/// A form field failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Password should be at least {MIN_PASSWORD_LEN} characters long.")]
    WeakPassword,
}

impl FormError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        FormError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field, for highlighting in a UI
    pub fn field(&self) -> &'static str {
        match self {
            FormError::Required { field } | FormError::Invalid { field, .. } => field,
            FormError::WeakPassword => "password",
        }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").expect("valid phone regex"))
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FormError::Required { field })
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The "Create a Blood Request" form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestForm {
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub hospital: String,
    #[serde(default)]
    pub hospital_address: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub blood_type: String,
    #[serde(default)]
    pub units: i64,
    #[serde(default)]
    pub urgency: String,
}

impl RequestForm {
    pub fn validate(&self) -> Result<NewRequest, FormError> {
        let patient_name = required("patientName", &self.patient_name)?;
        let hospital = required("hospital", &self.hospital)?;

        let blood_type_raw = required("bloodType", &self.blood_type)?;
        let blood_type: BloodType = blood_type_raw
            .parse()
            .map_err(|e: ParseEnumError| FormError::invalid("bloodType", e.to_string()))?;

        if self.units < 1 {
            return Err(FormError::invalid("units", "must be at least 1"));
        }
        let units = u32::try_from(self.units)
            .map_err(|_| FormError::invalid("units", "is too large"))?;

        let urgency_raw = required("urgency", &self.urgency)?;
        let urgency: Urgency = urgency_raw
            .parse()
            .map_err(|e: ParseEnumError| FormError::invalid("urgency", e.to_string()))?;

        Ok(NewRequest {
            patient_name,
            hospital,
            hospital_address: optional(self.hospital_address.as_deref()),
            location: optional(self.location.as_deref()),
            blood_type,
            units,
            urgency,
        })
    }
}

/// Email and password entered on the sign-in / register card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Checks shared by sign-in and registration
    pub fn validate_sign_in(&self) -> Result<(String, String), FormError> {
        let email = required("email", &self.email)?.to_lowercase();
        if !email_regex().is_match(&email) {
            return Err(FormError::invalid("email", "not an email address"));
        }
        if self.password.is_empty() {
            return Err(FormError::Required { field: "password" });
        }
        Ok((email, self.password.clone()))
    }

    /// Registration additionally enforces the minimum password length
    pub fn validate_registration(&self) -> Result<(String, String), FormError> {
        let (email, password) = self.validate_sign_in()?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::WeakPassword);
        }
        Ok((email, password))
    }
}

/// Editable part of a donor profile
///
/// `uid`, `email` and `role` are owned by the account and cannot be changed
/// through this form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub last_donation_date: Option<String>,
    #[serde(default)]
    pub available_for_emergency: Option<bool>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl ProfileForm {
    /// Apply the submitted fields onto an existing profile
    ///
    /// Absent fields are left unchanged; an empty string clears optional
    /// fields.
    pub fn apply_to(&self, profile: &DonorProfile) -> Result<DonorProfile, FormError> {
        let mut updated = profile.clone();

        if let Some(name) = &self.full_name {
            updated.full_name = name.trim().to_string();
        }

        if let Some(group) = &self.blood_group {
            updated.blood_group = if group.trim().is_empty() {
                None
            } else {
                Some(group.parse().map_err(|e: ParseEnumError| {
                    FormError::invalid("bloodGroup", e.to_string())
                })?)
            };
        }

        if let Some(city) = &self.city {
            updated.city = city.trim().to_string();
        }

        if let Some(phone) = &self.phone {
            let phone = phone.trim();
            if !phone.is_empty() && !phone_regex().is_match(phone) {
                return Err(FormError::invalid("phone", "not a phone number"));
            }
            updated.phone = phone.to_string();
        }

        if let Some(date) = &self.last_donation_date {
            updated.last_donation_date = parse_donation_date(date)?;
        }

        if let Some(available) = self.available_for_emergency {
            updated.available_for_emergency = available;
        }

        if let Some(url) = &self.photo_url {
            let url = url.trim();
            updated.photo_url = if url.is_empty() {
                None
            } else if url.starts_with("https://") || url.starts_with("http://") {
                Some(url.to_string())
            } else {
                return Err(FormError::invalid("photoURL", "must be an http(s) link"));
            };
        }

        Ok(updated)
    }
}

fn parse_donation_date(raw: &str) -> Result<Option<NaiveDate>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FormError::invalid("lastDonationDate", "expected YYYY-MM-DD"))?;
    if date > Utc::now().date_naive() {
        return Err(FormError::invalid("lastDonationDate", "cannot be in the future"));
    }
    Ok(Some(date))
}
