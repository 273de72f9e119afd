//! Dashboard filters
//!
//! Donors filter the request list by blood type and urgency. Each filter is
//! either `All` or one concrete value, and a request is shown only when both
//! filters match.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::request::BloodRequest;
use super::types::{BloodType, ParseEnumError, Urgency};

/// `All`, or one specific value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("All"),
            Selection::Only(v) => v.fmt(f),
        }
    }
}

impl<T: FromStr<Err = ParseEnumError>> FromStr for Selection<T> {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            trimmed.parse().map(Selection::Only)
        }
    }
}

impl<T: Serialize> Serialize for Selection<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selection::All => serializer.serialize_str("All"),
            Selection::Only(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T> Deserialize<'de> for Selection<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Blood type and urgency filters applied to the donor dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    #[serde(default)]
    pub blood_type: Selection<BloodType>,
    #[serde(default)]
    pub urgency: Selection<Urgency>,
}

impl RequestFilter {
    pub fn new(blood_type: Selection<BloodType>, urgency: Selection<Urgency>) -> Self {
        Self {
            blood_type,
            urgency,
        }
    }

    pub fn matches(&self, request: &BloodRequest) -> bool {
        self.blood_type.matches(&request.blood_type) && self.urgency.matches(&request.urgency)
    }

    /// Keep matching requests, preserving order
    pub fn apply<'a, I>(&self, requests: I) -> Vec<BloodRequest>
    where
        I: IntoIterator<Item = &'a BloodRequest>,
    {
        requests
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewRequest;

    fn request(id: &str, blood_type: BloodType, urgency: Urgency) -> BloodRequest {
        NewRequest {
            patient_name: "P".to_string(),
            hospital: "H".to_string(),
            hospital_address: None,
            location: None,
            blood_type,
            units: 1,
            urgency,
        }
        .into_request(id.to_string(), None)
    }

    #[test]
    fn test_both_filters_must_match() {
        let list = vec![
            request("1", BloodType::APositive, Urgency::High),
            request("2", BloodType::APositive, Urgency::Low),
            request("3", BloodType::ONegative, Urgency::High),
        ];

        let filter = RequestFilter::new(
            Selection::Only(BloodType::APositive),
            Selection::Only(Urgency::High),
        );
        let ids: Vec<_> = filter.apply(&list).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1"]);

        let by_urgency = RequestFilter::new(Selection::All, Selection::Only(Urgency::High));
        assert_eq!(by_urgency.apply(&list).len(), 2);

        assert_eq!(RequestFilter::default().apply(&list).len(), 3);
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("All".parse::<Selection<Urgency>>().unwrap(), Selection::All);
        assert_eq!("".parse::<Selection<Urgency>>().unwrap(), Selection::All);
        assert_eq!(
            "AB-".parse::<Selection<BloodType>>().unwrap(),
            Selection::Only(BloodType::AbNegative)
        );
        assert!("urgent".parse::<Selection<Urgency>>().is_err());
    }

    #[test]
    fn test_filter_serde() {
        let filter: RequestFilter =
            serde_json::from_str(r#"{"bloodType": "O+", "urgency": "All"}"#).unwrap();
        assert_eq!(filter.blood_type, Selection::Only(BloodType::OPositive));
        assert_eq!(filter.urgency, Selection::All);

        let json = serde_json::to_string(&RequestFilter::default()).unwrap();
        assert_eq!(json, r#"{"bloodType":"All","urgency":"All"}"#);
    }
}
