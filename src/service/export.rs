//! CSV export of the request list for admins

use chrono::{DateTime, SecondsFormat, Utc};

use super::ServiceError;
use crate::model::BloodRequest;

const HEADER: [&str; 13] = [
    "id",
    "patientName",
    "hospital",
    "hospitalAddress",
    "location",
    "bloodType",
    "units",
    "urgency",
    "status",
    "createdAt",
    "donorName",
    "donorEmail",
    "donationTimestamp",
];

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Render requests as CSV, one row per request in the given order
pub fn requests_to_csv(requests: &[BloodRequest]) -> Result<String, ServiceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for request in requests {
        let donation = request.donation.as_ref();
        writer.write_record([
            request.id.as_str(),
            request.patient_name.as_str(),
            request.hospital.as_str(),
            request.hospital_address.as_deref().unwrap_or(""),
            request.location.as_deref().unwrap_or(""),
            request.blood_type.as_str(),
            &request.units.to_string(),
            request.urgency.as_str(),
            request.status.as_str(),
            &timestamp(request.created_at),
            donation.map(|d| d.donor_name.as_str()).unwrap_or(""),
            donation.map(|d| d.donor_email.as_str()).unwrap_or(""),
            &timestamp(donation.and_then(|d| d.donation_timestamp)),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BloodType, Donation, NewRequest, RequestStatus, Urgency};
    use chrono::TimeZone;

    #[test]
    fn test_csv_rows_and_quoting() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let active = NewRequest {
            patient_name: "Singh, Arjun".to_string(),
            hospital: "AIIMS".to_string(),
            hospital_address: None,
            location: Some("Delhi".to_string()),
            blood_type: BloodType::AbNegative,
            units: 3,
            urgency: Urgency::High,
        }
        .into_request("r1".to_string(), Some(created));

        let mut donated = active.clone();
        donated.id = "r2".to_string();
        donated.status = RequestStatus::Donated;
        donated.donation = Some(Donation {
            donor_email: "d@example.com".to_string(),
            donor_id: "u1".to_string(),
            donor_name: "Dana".to_string(),
            donation_timestamp: Some(created),
        });

        let csv = requests_to_csv(&[active, donated]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,patientName,hospital"));
        assert_eq!(
            lines[1],
            "r1,\"Singh, Arjun\",AIIMS,,Delhi,AB-,3,High,Active,2024-03-01T09:30:00Z,,,"
        );
        assert!(lines[2]
            .ends_with("Donated,2024-03-01T09:30:00Z,Dana,d@example.com,2024-03-01T09:30:00Z"));
    }

    #[test]
    fn test_empty_export_has_header() {
        let csv = requests_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
