//! Wire types for the portal's transactional API.
//!
//! Field names follow the portal's camelCase JSON. Response shapes are
//! tolerant (`#[serde(default)]`) because the portal omits fields freely.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// Availability envelope: `{"data": [court, …]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub data: Vec<CourtAvailability>,
}

/// One court (or table/turf) and its slot grid for the requested day.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtAvailability {
    pub court_id: i64,
    #[serde(default)]
    pub court_name: String,
    #[serde(default)]
    pub slots: Vec<SlotInfo>,
}

/// One slot within a court's grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    /// `"HH:MM:SS"`.
    #[serde(default)]
    pub slot_time: String,
    /// The portal's availability flag: 1 means bookable.
    #[serde(default)]
    pub available: i64,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Present on booked slots; required to cancel through the portal.
    #[serde(default)]
    pub booking_id: Option<String>,
}

/// A cart line between add-to-cart and clear-cart. Owned exclusively by the
/// in-flight booking run; the automation lock keeps runs from overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub court_id: i64,
    pub court_name: String,
    pub slot_date: NaiveDate,
    /// `"HH:MM:SS"`.
    pub slot_time: String,
    /// `"HH:MM:SS"`, thirty minutes after `slot_time`, rolling over midnight.
    pub end_time: String,
    pub activity_id: i64,
    pub price: i64,
}

/// Customer resolution result. `non_member_id` absent means the portal has
/// never seen this phone number; booking creation registers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRef {
    pub non_member_id: Option<i64>,
    pub phone: String,
}

/// Input to booking creation, assembled by the orchestrator.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub non_member_id: Option<i64>,
    pub gross_amount: i64,
    pub customer_name: String,
    /// National-format digits, country code stripped.
    pub customer_phone: String,
    pub customer_email: String,
    pub remarks: String,
}

/// Outcome of a successful booking creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub booking_id: Option<String>,
    pub status: i64,
}

/// Refund policy for cancellations. The portal encodes these as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundType {
    Policy,
    Full,
    NoRefund,
}

impl RefundType {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            RefundType::Policy => 1,
            RefundType::Full => 2,
            RefundType::NoRefund => 3,
        }
    }
}

impl Serialize for RefundType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl std::str::FromStr for RefundType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "policy" => Ok(RefundType::Policy),
            "full" => Ok(RefundType::Full),
            "none" => Ok(RefundType::NoRefund),
            other => Err(format!("unknown refund type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_type_codes_match_portal_contract() {
        assert_eq!(RefundType::Policy.code(), 1);
        assert_eq!(RefundType::Full.code(), 2);
        assert_eq!(RefundType::NoRefund.code(), 3);
    }

    #[test]
    fn refund_type_serializes_as_integer() {
        let json = serde_json::to_string(&RefundType::NoRefund).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn refund_type_parses_operator_strings() {
        assert_eq!("policy".parse::<RefundType>().unwrap(), RefundType::Policy);
        assert_eq!("FULL".parse::<RefundType>().unwrap(), RefundType::Full);
        assert_eq!("none".parse::<RefundType>().unwrap(), RefundType::NoRefund);
        assert!("partial".parse::<RefundType>().is_err());
    }

    #[test]
    fn availability_tolerates_sparse_slots() {
        let body = r#"{"data":[{"courtId":7,"courtName":"Snooker Table 1","slots":[{"slotTime":"10:00:00","available":1,"price":250}]}]}"#;
        let parsed: AvailabilityResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        let slot = &parsed.data[0].slots[0];
        assert_eq!(slot.slot_time, "10:00:00");
        assert_eq!(slot.available, 1);
        assert!(slot.booking_id.is_none());
    }

    #[test]
    fn cart_line_serializes_camel_case() {
        let line = CartLine {
            court_id: 7,
            court_name: "Snooker Table 1".to_string(),
            slot_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            slot_time: "23:30:00".to_string(),
            end_time: "00:00:00".to_string(),
            activity_id: 16221,
            price: 250,
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["courtId"], 7);
        assert_eq!(json["slotDate"], "2025-06-01");
        assert_eq!(json["endTime"], "00:00:00");
    }
}
