//! The slot booking pipeline.
//!
//! Fetch, validate, cart, resolve customer, zero the cost, confirm. The
//! whole run holds the automation lock because the portal cart is shared
//! session state. Only the initial availability fetch is retried; once the
//! cart has been touched the only recovery is clearing it, which happens
//! exactly once on any terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use courtsync_core::SportCatalog;
use courtsync_portal::{retry_on_server_error, CartLine, NewBooking, PortalApi};

use crate::error::BookingError;
use crate::lock::AutomationLock;
use crate::matching;
use crate::types::{BookingIntent, BookingResult};

const FETCH_ATTEMPTS: u32 = 3;
const FETCH_BACKOFF: Duration = Duration::from_secs(1);

pub struct BookingOrchestrator {
    portal: Arc<dyn PortalApi>,
    catalog: Arc<SportCatalog>,
    lock: Arc<AutomationLock>,
}

impl BookingOrchestrator {
    #[must_use]
    pub fn new(
        portal: Arc<dyn PortalApi>,
        catalog: Arc<SportCatalog>,
        lock: Arc<AutomationLock>,
    ) -> Self {
        Self {
            portal,
            catalog,
            lock,
        }
    }

    /// Books one slot. Returns the confirmation on success and `None` on any
    /// failure; pipeline errors are logged here and never propagate.
    pub async fn book_slot(&self, intent: &BookingIntent) -> Option<BookingResult> {
        let guard = self.lock.acquire().await;
        tracing::info!(
            date = %intent.date,
            time = %intent.time,
            sport = %intent.sport,
            court = %intent.court,
            "starting booking"
        );

        let mut cart_loaded = false;
        let outcome = self.run_pipeline(intent, &mut cart_loaded).await;

        // Clear exactly once from the first cart mutation onward, success or
        // not. A failed clear is logged and swallowed; the next pipeline run
        // will clear again before booking.
        if cart_loaded {
            if let Err(error) = self.portal.clear_cart().await {
                tracing::warn!(error = %error, "failed to clear portal cart");
            }
        }
        drop(guard);

        match outcome {
            Ok(result) => {
                tracing::info!(
                    booking_id = ?result.booking_id,
                    gross_amount = result.gross_amount,
                    "booking confirmed"
                );
                Some(result)
            }
            Err(error) => {
                tracing::warn!(error = %error, "booking failed");
                None
            }
        }
    }

    async fn run_pipeline(
        &self,
        intent: &BookingIntent,
        cart_loaded: &mut bool,
    ) -> Result<BookingResult, BookingError> {
        let activity_id = self
            .catalog
            .activity_id(&intent.sport)
            .ok_or_else(|| BookingError::UnknownSport(intent.sport.clone()))?;

        let courts = retry_on_server_error(FETCH_ATTEMPTS, FETCH_BACKOFF, || {
            self.portal.get_availability(activity_id, intent.date)
        })
        .await?;

        let court = matching::find_court(&courts, &intent.court)
            .ok_or_else(|| BookingError::CourtNotFound(intent.court.clone()))?;
        let slot_time = matching::portal_time(intent.time);
        let slot = matching::find_slot(court, &slot_time).ok_or_else(|| {
            BookingError::SlotUnavailable(format!(
                "no {slot_time} slot on {}",
                court.court_name
            ))
        })?;
        if slot.available != 1 {
            return Err(BookingError::SlotUnavailable(
                slot.status
                    .clone()
                    .unwrap_or_else(|| "not open for booking".to_string()),
            ));
        }

        let line = CartLine {
            court_id: court.court_id,
            court_name: court.court_name.clone(),
            slot_date: intent.date,
            slot_time,
            end_time: matching::slot_end_time(intent.time),
            activity_id,
            price: slot.price,
        };
        self.portal.add_to_cart(&line).await?;
        *cart_loaded = true;

        let customer = self.portal.lookup_customer(&intent.customer_phone).await?;
        if customer.non_member_id.is_none() {
            tracing::info!("unknown customer, portal registers them at booking time");
        }

        // Zero the balance: reset club credits, then a full-price discount.
        // A free slot has no balance to zero, so both steps are skipped.
        if line.price > 0 {
            self.portal.reset_credits().await?;
            self.portal.apply_discount(line.price).await?;
        }

        let confirmation = self
            .portal
            .create_booking(&NewBooking {
                non_member_id: customer.non_member_id,
                gross_amount: line.price,
                customer_name: intent.customer_name.clone(),
                customer_phone: customer.phone,
                customer_email: intent.customer_email.clone(),
                remarks: intent.remarks.clone(),
            })
            .await?;

        Ok(BookingResult {
            booking_id: confirmation.booking_id,
            gross_amount: line.price,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use courtsync_core::Sport;
    use courtsync_portal::{
        BookingConfirmation, CourtAvailability, CustomerRef, PortalError, RefundType, SlotInfo,
    };

    use super::*;

    /// Scripted portal that records every call, tagged with enough detail to
    /// assert ordering and arguments.
    pub(crate) struct ScriptedPortal {
        pub(crate) calls: Mutex<Vec<String>>,
        pub(crate) courts: Vec<CourtAvailability>,
        pub(crate) availability_failures: Mutex<u32>,
        pub(crate) fail_discount: bool,
        pub(crate) known_customer: Option<i64>,
    }

    impl ScriptedPortal {
        pub(crate) fn new(courts: Vec<CourtAvailability>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                courts,
                availability_failures: Mutex::new(0),
                fail_discount: false,
                known_customer: Some(7001),
            }
        }

        fn log(&self, entry: impl Into<String>) {
            self.calls.lock().unwrap().push(entry.into());
        }

        pub(crate) fn call_names(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.split(':').next().unwrap_or(c).to_string())
                .collect()
        }
    }

    #[async_trait]
    impl PortalApi for ScriptedPortal {
        async fn get_availability(
            &self,
            activity_id: i64,
            date: NaiveDate,
        ) -> Result<Vec<CourtAvailability>, PortalError> {
            self.log(format!("get_availability:{activity_id}:{date}"));
            // Yield so concurrent pipelines would interleave here if the
            // lock failed to serialize them.
            tokio::task::yield_now().await;
            let mut failures = self.availability_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(PortalError::Server { status: 502 });
            }
            Ok(self.courts.clone())
        }

        async fn add_to_cart(&self, line: &CartLine) -> Result<(), PortalError> {
            self.log(format!("add_to_cart:{}:{}", line.court_name, line.end_time));
            tokio::task::yield_now().await;
            Ok(())
        }

        async fn lookup_customer(&self, phone: &str) -> Result<CustomerRef, PortalError> {
            self.log(format!("lookup_customer:{phone}"));
            tokio::task::yield_now().await;
            Ok(CustomerRef {
                non_member_id: self.known_customer,
                phone: phone.to_string(),
            })
        }

        async fn reset_credits(&self) -> Result<(), PortalError> {
            self.log("reset_credits");
            tokio::task::yield_now().await;
            Ok(())
        }

        async fn apply_discount(&self, amount: i64) -> Result<(), PortalError> {
            self.log(format!("apply_discount:{amount}"));
            tokio::task::yield_now().await;
            if self.fail_discount {
                Err(PortalError::Api("discount rejected".to_string()))
            } else {
                Ok(())
            }
        }

        async fn create_booking(
            &self,
            booking: &NewBooking,
        ) -> Result<BookingConfirmation, PortalError> {
            self.log(format!(
                "create_booking:{}:{}",
                booking.gross_amount, booking.customer_name
            ));
            tokio::task::yield_now().await;
            Ok(BookingConfirmation {
                booking_id: Some("BK-100".to_string()),
                status: 1,
            })
        }

        async fn clear_cart(&self) -> Result<(), PortalError> {
            self.log("clear_cart");
            tokio::task::yield_now().await;
            Ok(())
        }

        async fn cancel_booking(
            &self,
            booking_id: &str,
            refund_type: RefundType,
            send_sms: bool,
        ) -> Result<(), PortalError> {
            self.log(format!(
                "cancel_booking:{booking_id}:{}:{send_sms}",
                refund_type.code()
            ));
            tokio::task::yield_now().await;
            Ok(())
        }
    }

    pub(crate) fn open_slot(time: &str, price: i64) -> SlotInfo {
        SlotInfo {
            slot_time: time.to_string(),
            available: 1,
            price,
            status: None,
            customer_name: None,
            booking_id: None,
        }
    }

    pub(crate) fn booked_slot(time: &str, booking_id: &str) -> SlotInfo {
        SlotInfo {
            slot_time: time.to_string(),
            available: 0,
            price: 400,
            status: Some("Booked".to_string()),
            customer_name: Some("Ravi".to_string()),
            booking_id: Some(booking_id.to_string()),
        }
    }

    pub(crate) fn grid(court_name: &str, slots: Vec<SlotInfo>) -> Vec<CourtAvailability> {
        vec![CourtAvailability {
            court_id: 31,
            court_name: court_name.to_string(),
            slots,
        }]
    }

    pub(crate) fn catalog() -> Arc<SportCatalog> {
        Arc::new(SportCatalog::new(vec![Sport {
            name: "Snooker".to_string(),
            activity_id: 16221,
        }]))
    }

    fn intent(time: (u32, u32)) -> BookingIntent {
        BookingIntent {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            sport: "Snooker".to_string(),
            court: "Table 1".to_string(),
            customer_name: "Asha".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_email: "asha@example.com".to_string(),
            remarks: String::new(),
        }
    }

    fn orchestrator(portal: Arc<ScriptedPortal>) -> BookingOrchestrator {
        BookingOrchestrator::new(portal, catalog(), Arc::new(AutomationLock::new()))
    }

    #[tokio::test]
    async fn happy_path_runs_steps_in_order_and_clears_cart() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250)],
        )));
        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((10, 0)))
            .await
            .expect("booking should succeed");

        assert_eq!(result.booking_id.as_deref(), Some("BK-100"));
        assert_eq!(result.gross_amount, 250);
        assert_eq!(
            portal.call_names(),
            vec![
                "get_availability",
                "add_to_cart",
                "lookup_customer",
                "reset_credits",
                "apply_discount",
                "create_booking",
                "clear_cart",
            ]
        );
    }

    #[tokio::test]
    async fn validation_failure_makes_no_mutating_calls() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![booked_slot("10:00:00", "BK-5")],
        )));
        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((10, 0)))
            .await;

        assert!(result.is_none());
        assert_eq!(portal.call_names(), vec!["get_availability"]);
    }

    #[tokio::test]
    async fn missing_slot_time_is_rejected_before_carting() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250)],
        )));
        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((10, 30)))
            .await;

        assert!(result.is_none());
        assert_eq!(portal.call_names(), vec!["get_availability"]);
    }

    #[tokio::test]
    async fn unknown_sport_fails_without_portal_calls() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250)],
        )));
        let mut bad_sport = intent((10, 0));
        bad_sport.sport = "Curling".to_string();
        let result = orchestrator(Arc::clone(&portal)).book_slot(&bad_sport).await;

        assert!(result.is_none());
        assert!(portal.call_names().is_empty());
    }

    #[tokio::test]
    async fn failure_after_carting_still_clears_cart_once() {
        let mut scripted = ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250)],
        ));
        scripted.fail_discount = true;
        let portal = Arc::new(scripted);

        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((10, 0)))
            .await;

        assert!(result.is_none());
        let names = portal.call_names();
        assert_eq!(
            names.iter().filter(|n| *n == "clear_cart").count(),
            1,
            "exactly one cart clear on a failed run"
        );
        assert!(!names.contains(&"create_booking".to_string()));
    }

    #[tokio::test]
    async fn zero_price_slot_skips_credit_and_discount_steps() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 0)],
        )));
        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((10, 0)))
            .await
            .expect("zero-price booking should succeed");

        assert_eq!(result.gross_amount, 0);
        let names = portal.call_names();
        assert!(!names.contains(&"reset_credits".to_string()));
        assert!(!names.contains(&"apply_discount".to_string()));
        assert!(names.contains(&"create_booking".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_availability_errors_are_retried() {
        let scripted = ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250)],
        ));
        *scripted.availability_failures.lock().unwrap() = 2;
        let portal = Arc::new(scripted);

        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((10, 0)))
            .await;

        assert!(result.is_some());
        let names = portal.call_names();
        assert_eq!(
            names.iter().filter(|n| *n == "get_availability").count(),
            3,
            "two 5xx failures then success"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn availability_gives_up_after_three_attempts() {
        let scripted = ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250)],
        ));
        *scripted.availability_failures.lock().unwrap() = 5;
        let portal = Arc::new(scripted);

        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((10, 0)))
            .await;

        assert!(result.is_none());
        let names = portal.call_names();
        assert_eq!(names.iter().filter(|n| *n == "get_availability").count(), 3);
        assert!(!names.contains(&"clear_cart".to_string()), "cart never touched");
    }

    #[tokio::test]
    async fn midnight_adjacent_slot_carts_with_wrapped_end_time() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("23:30:00", 250)],
        )));
        let result = orchestrator(Arc::clone(&portal))
            .book_slot(&intent((23, 30)))
            .await;

        assert!(result.is_some());
        let calls = portal.calls.lock().unwrap();
        assert!(
            calls.iter().any(|c| c == "add_to_cart:Snooker Table 1:00:00:00"),
            "end time must wrap past midnight, calls: {calls:?}"
        );
    }

    #[tokio::test]
    async fn concurrent_bookings_are_serialized() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250), open_slot("11:00:00", 250)],
        )));
        let lock = Arc::new(AutomationLock::new());
        let first = Arc::new(BookingOrchestrator::new(
            Arc::clone(&portal) as Arc<dyn PortalApi>,
            catalog(),
            Arc::clone(&lock),
        ));
        let second = Arc::new(BookingOrchestrator::new(
            Arc::clone(&portal) as Arc<dyn PortalApi>,
            catalog(),
            Arc::clone(&lock),
        ));

        let first_intent = intent((10, 0));
        let second_intent = intent((11, 0));
        let (a, b) = tokio::join!(
            first.book_slot(&first_intent),
            second.book_slot(&second_intent)
        );
        assert!(a.is_some());
        assert!(b.is_some());

        // Each pipeline's call sequence must be contiguous in the shared log.
        let names = portal.call_names();
        assert_eq!(names.len(), 14);
        let expected = [
            "get_availability",
            "add_to_cart",
            "lookup_customer",
            "reset_credits",
            "apply_discount",
            "create_booking",
            "clear_cart",
        ];
        assert_eq!(&names[..7], &expected, "first pipeline uninterrupted");
        assert_eq!(&names[7..], &expected, "second pipeline uninterrupted");
    }
}
