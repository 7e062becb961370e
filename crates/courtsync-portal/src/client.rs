//! HTTP client for the booking portal's transactional API.
//!
//! Wraps `reqwest` with portal-specific error handling, session-token
//! injection, and typed response deserialization. Mutating endpoints check
//! the `"requestStatus"` field in the JSON envelope and surface API-level
//! failures as [`PortalError::Api`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header;
use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::error::PortalError;
use crate::normalize::normalize_phone;
use crate::token::TokenProvider;
use crate::types::{
    AvailabilityResponse, BookingConfirmation, CartLine, CourtAvailability, CustomerRef,
    NewBooking, RefundType,
};

/// The portal operates a single venue; the club id is fixed.
const CLUB_ID: i64 = 1;
const COUNTRY_CODE: &str = "+91";

/// Low-level typed operations against the portal's transactional API.
///
/// The orchestrators depend on this trait so tests can script portal
/// behaviour; [`PortalClient`] is the production implementation.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Fetch the slot grid for one activity on one day.
    async fn get_availability(
        &self,
        activity_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<CourtAvailability>, PortalError>;

    /// Add one slot to the session cart.
    async fn add_to_cart(&self, line: &CartLine) -> Result<(), PortalError>;

    /// Resolve a customer by phone. An unknown number is not an error.
    async fn lookup_customer(&self, phone: &str) -> Result<CustomerRef, PortalError>;

    /// Zero out any credits attached to the session cart.
    async fn reset_credits(&self) -> Result<(), PortalError>;

    /// Apply a flat discount to the session cart.
    async fn apply_discount(&self, amount: i64) -> Result<(), PortalError>;

    /// Create the booking from the current cart.
    async fn create_booking(&self, booking: &NewBooking)
        -> Result<BookingConfirmation, PortalError>;

    /// Empty the session cart.
    async fn clear_cart(&self) -> Result<(), PortalError>;

    /// Cancel an existing booking.
    async fn cancel_booking(
        &self,
        booking_id: &str,
        refund_type: RefundType,
        send_sms: bool,
    ) -> Result<(), PortalError>;
}

/// Production client for the portal API.
pub struct PortalClient {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl PortalClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PortalError::Api`] if `base_url` is not a
    /// valid URL.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, PortalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("courtsync/0.1 (venue-calendar)")
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // Url::join appends endpoint paths instead of replacing the last
        // path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| PortalError::Api(format!("invalid portal base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PortalError> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::Api(format!("invalid portal endpoint '{path}': {e}")))
    }

    /// Sends a POST with the session token, classifies the HTTP status, and
    /// parses the response body as JSON.
    ///
    /// 5xx becomes [`PortalError::Server`] (the retryable class); any other
    /// non-2xx becomes [`PortalError::Api`] with the body attached.
    async fn post_json(&self, path: &str, body: Option<Value>) -> Result<Value, PortalError> {
        let token = self.tokens.bearer_token().await?;
        let url = self.endpoint(path)?;

        let mut request = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_server_error() {
            return Err(PortalError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(PortalError::Api(format!("{path}: HTTP {status}: {text}")));
        }

        serde_json::from_str(&text).map_err(|e| PortalError::Deserialize {
            context: path.to_string(),
            source: e,
        })
    }
}

/// Requires `"requestStatus": 1`; anything else (including absence) is an
/// API-level failure. Used for booking creation and cancellation.
fn require_request_status(body: &Value) -> Result<(), PortalError> {
    if body.get("requestStatus").and_then(Value::as_i64) == Some(1) {
        return Ok(());
    }
    Err(PortalError::Api(envelope_message(body)))
}

/// Rejects only an explicit non-success `"requestStatus"`. Cart and discount
/// endpoints omit the field on some responses.
fn check_request_status(body: &Value) -> Result<(), PortalError> {
    match body.get("requestStatus").and_then(Value::as_i64) {
        Some(status) if status != 1 => Err(PortalError::Api(envelope_message(body))),
        _ => Ok(()),
    }
}

fn envelope_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("portal reported failure")
        .to_string()
}

#[async_trait]
impl PortalApi for PortalClient {
    async fn get_availability(
        &self,
        activity_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<CourtAvailability>, PortalError> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let body = json!({
            "activityIds": [activity_id],
            "activityStartDate": date_str,
            "activityEndDate": date_str,
            "customerStatus": 0,
        });

        let value = self.post_json("availability", Some(body)).await?;
        let parsed: AvailabilityResponse =
            serde_json::from_value(value).map_err(|e| PortalError::Deserialize {
                context: format!("availability(activity={activity_id}, date={date_str})"),
                source: e,
            })?;

        Ok(parsed.data)
    }

    async fn add_to_cart(&self, line: &CartLine) -> Result<(), PortalError> {
        let body = json!({
            "slotDuration": "00:30:00",
            "slot": {
                "activityId": line.activity_id,
                "activityType": 0,
                "count": 1,
                "courtId": line.court_id,
                "courtName": line.court_name,
                "courtBrothers": [],
                "slotDate": line.slot_date.format("%Y-%m-%d").to_string(),
                "slotTime": line.slot_time,
                "endTime": line.end_time,
                "available": 1,
                "blocked": false,
                "blockingId": null,
                "price": line.price,
                "slotDiscount": {},
            },
        });

        let value = self.post_json("carting/slot/add", Some(body)).await?;
        check_request_status(&value)
    }

    async fn lookup_customer(&self, phone: &str) -> Result<CustomerRef, PortalError> {
        let mobile = normalize_phone(phone);
        let body = json!({
            "clubId": CLUB_ID,
            "mobile": mobile,
        });

        let value = self.post_json("customer/details", Some(body)).await?;
        let non_member_id = value
            .pointer("/data/customerDetails/id")
            .and_then(Value::as_i64);

        Ok(CustomerRef {
            non_member_id,
            phone: mobile,
        })
    }

    async fn reset_credits(&self) -> Result<(), PortalError> {
        let value = self.post_json("club/credits/reset", None).await?;
        check_request_status(&value)
    }

    async fn apply_discount(&self, amount: i64) -> Result<(), PortalError> {
        let body = json!({ "discountAmount": amount });
        let value = self.post_json("club/discount/apply", Some(body)).await?;
        check_request_status(&value)
    }

    async fn create_booking(
        &self,
        booking: &NewBooking,
    ) -> Result<BookingConfirmation, PortalError> {
        let body = json!({
            "coupon": null,
            "toBeRegistered": false,
            "memberId": null,
            "nonMemberId": booking.non_member_id,
            "paymentMode": "No Pay",
            "bookingRemarks": booking.remarks,
            "totalPaidAmount": 0,
            "grossAmount": booking.gross_amount,
            // Full discount: operator bookings always settle off-platform.
            "clubDiscount": booking.gross_amount,
            "credits": 0,
            "customerDetails": {
                "name": booking.customer_name,
                "countryCode": COUNTRY_CODE,
                "mobile": booking.customer_phone,
                "email": booking.customer_email,
                "additionalInfo": "",
                "company": "",
                "uniqueId": "",
            },
            "isPatternBooking": false,
            "patternBookingData": {},
            "transactionData": { "type": 1, "mode": 0 },
            "sendSMS": false,
            "sendPaymentLink": false,
        });

        let value = self.post_json("booking", Some(body)).await?;
        require_request_status(&value)?;

        Ok(BookingConfirmation {
            booking_id: value
                .get("bookingId")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            status: 1,
        })
    }

    async fn clear_cart(&self) -> Result<(), PortalError> {
        let value = self.post_json("carting/clear", None).await?;
        check_request_status(&value)
    }

    async fn cancel_booking(
        &self,
        booking_id: &str,
        refund_type: RefundType,
        send_sms: bool,
    ) -> Result<(), PortalError> {
        let body = json!({
            "bookingId": booking_id,
            "patternBookingId": null,
            "cancelRemarks": "",
            "refundMode": "cash",
            "refundType": refund_type.code(),
            "transactionData": { "type": -1, "mode": 1 },
            "sendSMS": send_sms,
        });

        let value = self.post_json("booking/cancellation", Some(body)).await?;
        require_request_status(&value)
    }
}
