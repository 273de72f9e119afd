//! Data Transfer Objects
//!
//! Request and response types for the API endpoints. They derive both serde
//! directions so the CLI client can reuse them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{BloodRequest, BloodType, DonorProfile, RequestFilter, Role, Selection, Urgency};

// ============================================
// AUTH DTOs
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Portal the account is registered through
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub uid: String,
    pub email: String,
    pub role: Role,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id_token: String,
    /// Seconds until the id token expires
    pub expires_in: u64,
    pub profile: DonorProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub uid: String,
    pub email: String,
    pub role: Role,
    pub profile: DonorProfile,
}

// ============================================
// REQUEST DTOs
// ============================================

/// Query string of `GET /requests`; absent or `All` means no filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestListQuery {
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
}

impl RequestListQuery {
    pub fn from_filter(filter: &RequestFilter) -> Self {
        let text = |s: String| if s == "All" { None } else { Some(s) };
        Self {
            blood_type: text(filter.blood_type.to_string()),
            urgency: text(filter.urgency.to_string()),
        }
    }

    pub fn to_filter(&self) -> Result<RequestFilter, String> {
        let blood_type: Selection<BloodType> = self
            .blood_type
            .as_deref()
            .unwrap_or("")
            .parse()
            .map_err(|e: crate::model::ParseEnumError| e.to_string())?;
        let urgency: Selection<Urgency> = self
            .urgency
            .as_deref()
            .unwrap_or("")
            .parse()
            .map_err(|e: crate::model::ParseEnumError| e.to_string())?;
        Ok(RequestFilter::new(blood_type, urgency))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestListResponse {
    pub requests: Vec<BloodRequest>,
    pub count: usize,
}

impl RequestListResponse {
    pub fn new(requests: Vec<BloodRequest>) -> Self {
        Self {
            count: requests.len(),
            requests,
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy", "degraded" or "unhealthy"
    pub status: String,
    /// Document store backend and its status
    pub store: ComponentHealth,
    pub identity: String,
    pub feed: FeedHealth,
    pub websocket_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub backend: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedHealth {
    pub loaded: bool,
    pub request_count: usize,
    #[serde(default)]
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
