//! Blood request records
//!
//! A request is a hospital's posted need for blood. Once a donor claims it,
//! the donation fields are written next to the request fields in the same
//! document; undo removes them again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{BloodType, RequestStatus, Urgency};

/// A request as stored in the `requests` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RequestDocument", into = "RequestDocument")]
pub struct BloodRequest {
    /// Document id
    pub id: String,
    pub patient_name: String,
    pub hospital: String,
    pub hospital_address: Option<String>,
    pub location: Option<String>,
    pub blood_type: BloodType,
    /// Units of blood needed, always >= 1 for validated writes
    pub units: u32,
    pub urgency: Urgency,
    pub status: RequestStatus,
    /// Server timestamp; `None` only while a write is still pending
    pub created_at: Option<DateTime<Utc>>,
    /// Present once a donor has claimed the request
    pub donation: Option<Donation>,
}

impl BloodRequest {
    pub fn is_donated(&self) -> bool {
        self.status == RequestStatus::Donated
    }

    /// Whether the given user is the donor who claimed this request
    pub fn is_claimed_by(&self, uid: &str) -> bool {
        self.donation
            .as_ref()
            .map(|d| d.donor_id == uid)
            .unwrap_or(false)
    }
}

/// Donation fields written when a donor claims a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub donor_email: String,
    pub donor_id: String,
    pub donor_name: String,
    /// Server timestamp of the claim
    pub donation_timestamp: Option<DateTime<Utc>>,
}

/// Who is claiming a request; the timestamp is assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct DonationClaim {
    pub donor_email: String,
    pub donor_id: String,
    pub donor_name: String,
}

/// Validated input for a new request
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    pub patient_name: String,
    pub hospital: String,
    pub hospital_address: Option<String>,
    pub location: Option<String>,
    pub blood_type: BloodType,
    pub units: u32,
    pub urgency: Urgency,
}

impl NewRequest {
    /// Materialise the stored record for a freshly created document
    pub fn into_request(self, id: String, created_at: Option<DateTime<Utc>>) -> BloodRequest {
        BloodRequest {
            id,
            patient_name: self.patient_name,
            hospital: self.hospital,
            hospital_address: self.hospital_address,
            location: self.location,
            blood_type: self.blood_type,
            units: self.units,
            urgency: self.urgency,
            status: RequestStatus::Active,
            created_at,
            donation: None,
        }
    }
}

/// A request together with the store's version token for it
///
/// The version is opaque: Firestore's `updateTime`, or a counter in the
/// in-memory store. It is used as a write precondition when donating.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRequest {
    pub request: BloodRequest,
    pub version: String,
}

/// Flat wire shape of a request document (camelCase field names)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub patient_name: String,
    pub hospital: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub blood_type: BloodType,
    pub units: u32,
    pub urgency: Urgency,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_timestamp: Option<DateTime<Utc>>,
}

impl From<RequestDocument> for BloodRequest {
    fn from(doc: RequestDocument) -> Self {
        // A donation is only meaningful when the donor identity is present
        let donation = match (doc.donor_id, doc.donor_email) {
            (Some(donor_id), Some(donor_email)) => Some(Donation {
                donor_name: doc.donor_name.unwrap_or_else(|| donor_email.clone()),
                donor_email,
                donor_id,
                donation_timestamp: doc.donation_timestamp,
            }),
            _ => None,
        };

        Self {
            id: doc.id,
            patient_name: doc.patient_name,
            hospital: doc.hospital,
            hospital_address: doc.hospital_address,
            location: doc.location,
            blood_type: doc.blood_type,
            units: doc.units,
            urgency: doc.urgency,
            status: doc.status,
            created_at: doc.created_at,
            donation,
        }
    }
}

impl From<BloodRequest> for RequestDocument {
    fn from(req: BloodRequest) -> Self {
        let (donor_email, donor_id, donor_name, donation_timestamp) = match req.donation {
            Some(d) => (
                Some(d.donor_email),
                Some(d.donor_id),
                Some(d.donor_name),
                d.donation_timestamp,
            ),
            None => (None, None, None, None),
        };

        Self {
            id: req.id,
            patient_name: req.patient_name,
            hospital: req.hospital,
            hospital_address: req.hospital_address,
            location: req.location,
            blood_type: req.blood_type,
            units: req.units,
            urgency: req.urgency,
            status: req.status,
            created_at: req.created_at,
            donor_email,
            donor_id,
            donor_name,
            donation_timestamp,
        }
    }
}

/// Sort requests newest first by `createdAt`
///
/// Requests whose server timestamp is still pending sort first, matching
/// how a listener shows a just-written document at the top.
pub fn sort_newest_first(requests: &mut [BloodRequest]) {
    requests.sort_by(|a, b| match (a.created_at, b.created_at) {
        (None, None) => a.id.cmp(&b.id),
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.id.cmp(&b.id)),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> BloodRequest {
        NewRequest {
            patient_name: "Asha".to_string(),
            hospital: "City General".to_string(),
            hospital_address: None,
            location: Some("Pune".to_string()),
            blood_type: BloodType::ONegative,
            units: 2,
            urgency: Urgency::High,
        }
        .into_request("req-1".to_string(), Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
    }

    #[test]
    fn test_serializes_flat_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["patientName"], "Asha");
        assert_eq!(json["bloodType"], "O-");
        assert_eq!(json["status"], "Active");
        assert!(json.get("donorId").is_none());
        assert!(json.get("hospitalAddress").is_none());
    }

    #[test]
    fn test_donation_fields_round_into_struct() {
        let json = serde_json::json!({
            "id": "r9",
            "patientName": "Ravi",
            "hospital": "St. Mary",
            "bloodType": "B+",
            "units": 1,
            "urgency": "Low",
            "status": "Donated",
            "donorEmail": "d@example.com",
            "donorId": "uid-1",
        });
        let req: BloodRequest = serde_json::from_value(json).unwrap();
        let donation = req.donation.as_ref().unwrap();
        assert_eq!(donation.donor_name, "d@example.com");
        assert!(req.is_donated());
        assert!(req.is_claimed_by("uid-1"));
        assert!(!req.is_claimed_by("uid-2"));
    }

    #[test]
    fn test_missing_status_defaults_to_active() {
        let json = serde_json::json!({
            "patientName": "Ravi",
            "hospital": "St. Mary",
            "bloodType": "A+",
            "units": 3,
            "urgency": "Medium",
        });
        let req: BloodRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.status, RequestStatus::Active);
        assert!(req.donation.is_none());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut older = sample();
        older.id = "old".to_string();
        older.created_at = Some(Utc.timestamp_opt(1_000, 0).unwrap());
        let mut newer = sample();
        newer.id = "new".to_string();
        newer.created_at = Some(Utc.timestamp_opt(2_000, 0).unwrap());
        let mut pending = sample();
        pending.id = "pending".to_string();
        pending.created_at = None;

        let mut list = vec![older, pending, newer];
        sort_newest_first(&mut list);
        let ids: Vec<_> = list.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["pending", "new", "old"]);
    }
}
