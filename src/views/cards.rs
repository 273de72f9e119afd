//! Card view models for request lists

use serde::Serialize;

use crate::model::BloodRequest;

/// Fields shared by donor and admin cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardHeader {
    pub request_id: String,
    pub blood_type: String,
    pub hospital: String,
    /// "For: <patient>"
    pub patient_line: String,
    pub urgency: String,
    pub urgency_class: String,
    pub units: u32,
}

impl CardHeader {
    fn from_request(request: &BloodRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            blood_type: request.blood_type.to_string(),
            hospital: request.hospital.clone(),
            patient_line: format!("For: {}", request.patient_name),
            urgency: request.urgency.to_string(),
            urgency_class: request.urgency.css_class(),
            units: request.units,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorCard {
    pub header: CardHeader,
    pub button_label: &'static str,
    pub button_class: &'static str,
    /// Whether pressing the button opens the confirmation modal
    pub can_donate: bool,
    pub show_undo: bool,
}

impl DonorCard {
    pub fn from_request(request: &BloodRequest) -> Self {
        let donated = request.is_donated();
        Self {
            header: CardHeader::from_request(request),
            button_label: if donated { "Donation Confirmed!" } else { "I can donate" },
            button_class: if donated { "button-donated" } else { "button-primary" },
            can_donate: !donated,
            show_undo: donated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminCard {
    pub header: CardHeader,
    pub badge: &'static str,
    pub badge_class: &'static str,
    /// Donor name once fulfilled
    pub donor: Option<String>,
}

impl AdminCard {
    pub fn from_request(request: &BloodRequest) -> Self {
        let donated = request.is_donated();
        Self {
            header: CardHeader::from_request(request),
            badge: if donated { "Fulfilled" } else { "Pending" },
            badge_class: if donated { "button-donated" } else { "button-primary" },
            donor: request.donation.as_ref().map(|d| d.donor_name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BloodType, Donation, NewRequest, RequestStatus, Urgency};

    fn request() -> BloodRequest {
        NewRequest {
            patient_name: "Kiran".to_string(),
            hospital: "KEM".to_string(),
            hospital_address: None,
            location: None,
            blood_type: BloodType::APositive,
            units: 4,
            urgency: Urgency::Medium,
        }
        .into_request("r1".to_string(), None)
    }

    fn donated(mut request: BloodRequest) -> BloodRequest {
        request.status = RequestStatus::Donated;
        request.donation = Some(Donation {
            donor_email: "d@example.com".to_string(),
            donor_id: "u1".to_string(),
            donor_name: "Dana".to_string(),
            donation_timestamp: None,
        });
        request
    }

    #[test]
    fn test_donor_card_labels() {
        let card = DonorCard::from_request(&request());
        assert_eq!(card.button_label, "I can donate");
        assert!(card.can_donate);
        assert!(!card.show_undo);
        assert_eq!(card.header.urgency_class, "urgency-medium");
        assert_eq!(card.header.patient_line, "For: Kiran");

        let card = DonorCard::from_request(&donated(request()));
        assert_eq!(card.button_label, "Donation Confirmed!");
        assert!(!card.can_donate);
        assert!(card.show_undo);
    }

    #[test]
    fn test_admin_card_badges() {
        assert_eq!(AdminCard::from_request(&request()).badge, "Pending");

        let card = AdminCard::from_request(&donated(request()));
        assert_eq!(card.badge, "Fulfilled");
        assert_eq!(card.donor.as_deref(), Some("Dana"));
    }
}
