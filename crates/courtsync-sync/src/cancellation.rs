//! Booking cancellation.
//!
//! Two entry points: cancel by calendar position (fetch the grid, find the
//! booked slot, extract its booking id) or cancel a known booking id
//! directly. Both hold the automation lock; neither retries, since a
//! cancellation that half-succeeded must be inspected, not replayed.

use std::sync::Arc;

use courtsync_core::SportCatalog;
use courtsync_portal::{PortalApi, SlotInfo};

use crate::error::BookingError;
use crate::lock::AutomationLock;
use crate::matching;
use crate::types::{CancellationIntent, SlotRef};

pub struct CancellationOrchestrator {
    portal: Arc<dyn PortalApi>,
    catalog: Arc<SportCatalog>,
    lock: Arc<AutomationLock>,
}

impl CancellationOrchestrator {
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

    /// Cancels whatever booking occupies the referenced slot. Returns the
    /// cancelled booking id, or `None` if no booked slot matched or the
    /// portal refused.
    pub async fn cancel_slot(&self, slot: &SlotRef, intent: &CancellationIntent) -> Option<String> {
        let _guard = self.lock.acquire().await;
        match self.resolve_and_cancel(slot, intent).await {
            Ok(booking_id) => {
                tracing::info!(
                    booking_id = %booking_id,
                    date = %slot.date,
                    time = %slot.time,
                    "booking cancelled"
                );
                Some(booking_id)
            }
            Err(error) => {
                tracing::warn!(error = %error, date = %slot.date, "cancellation failed");
                None
            }
        }
    }

    /// Cancels a booking by its portal id. Returns whether the portal
    /// accepted the cancellation.
    pub async fn cancel_booking(&self, intent: &CancellationIntent) -> bool {
        let _guard = self.lock.acquire().await;
        match self
            .portal
            .cancel_booking(&intent.booking_id, intent.refund_type, intent.send_sms)
            .await
        {
            Ok(()) => {
                tracing::info!(booking_id = %intent.booking_id, "booking cancelled");
                true
            }
            Err(error) => {
                tracing::warn!(
                    booking_id = %intent.booking_id,
                    error = %error,
                    "cancellation failed"
                );
                false
            }
        }
    }

    async fn resolve_and_cancel(
        &self,
        slot: &SlotRef,
        intent: &CancellationIntent,
    ) -> Result<String, BookingError> {
        let activity_id = self
            .catalog
            .activity_id(&slot.sport)
            .ok_or_else(|| BookingError::UnknownSport(slot.sport.clone()))?;

        // One fetch, no retry: a stale grid must not drive a cancellation.
        let courts = self.portal.get_availability(activity_id, slot.date).await?;
        let court = matching::find_court(&courts, &slot.court)
            .ok_or_else(|| BookingError::CourtNotFound(slot.court.clone()))?;

        let slot_time = matching::portal_time(slot.time);
        let booking_id = court
            .slots
            .iter()
            .find(|s| s.slot_time == slot_time && is_booked(s))
            .and_then(|s| s.booking_id.clone())
            .ok_or(BookingError::BookingNotFound)?;

        self.portal
            .cancel_booking(&booking_id, intent.refund_type, intent.send_sms)
            .await?;
        Ok(booking_id)
    }
}

fn is_booked(slot: &SlotInfo) -> bool {
    slot.available != 1
        && slot
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("booked"))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use courtsync_portal::RefundType;

    use super::*;
    use crate::booking::tests::{booked_slot, catalog, grid, open_slot, ScriptedPortal};

    fn slot_ref(time: (u32, u32)) -> SlotRef {
        SlotRef {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            sport: "Snooker".to_string(),
            court: "Table 1".to_string(),
        }
    }

    fn no_refund() -> CancellationIntent {
        CancellationIntent {
            booking_id: String::new(),
            refund_type: RefundType::NoRefund,
            send_sms: false,
        }
    }

    fn orchestrator(portal: Arc<ScriptedPortal>) -> CancellationOrchestrator {
        CancellationOrchestrator::new(portal, catalog(), Arc::new(AutomationLock::new()))
    }

    #[tokio::test]
    async fn cancels_matching_booked_slot() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("09:30:00", 250), booked_slot("10:00:00", "BK-5")],
        )));
        let cancelled = orchestrator(Arc::clone(&portal))
            .cancel_slot(&slot_ref((10, 0)), &no_refund())
            .await;

        assert_eq!(cancelled.as_deref(), Some("BK-5"));
        let calls = portal.calls.lock().unwrap();
        assert!(calls.iter().any(|c| c == "cancel_booking:BK-5:3:false"));
    }

    #[tokio::test]
    async fn open_slot_is_not_cancelled() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![open_slot("10:00:00", 250)],
        )));
        let cancelled = orchestrator(Arc::clone(&portal))
            .cancel_slot(&slot_ref((10, 0)), &no_refund())
            .await;

        assert!(cancelled.is_none());
        assert_eq!(portal.call_names(), vec!["get_availability"]);
    }

    #[tokio::test]
    async fn time_mismatch_never_reaches_the_portal_cancel() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Snooker Table 1",
            vec![booked_slot("10:00:00", "BK-5")],
        )));
        let cancelled = orchestrator(Arc::clone(&portal))
            .cancel_slot(&slot_ref((10, 30)), &no_refund())
            .await;

        assert!(cancelled.is_none());
        assert_eq!(portal.call_names(), vec!["get_availability"]);
    }

    #[tokio::test]
    async fn direct_cancellation_passes_refund_through() {
        let portal = Arc::new(ScriptedPortal::new(grid("Snooker Table 1", vec![])));
        let intent = CancellationIntent {
            booking_id: "BK-77".to_string(),
            refund_type: RefundType::Full,
            send_sms: true,
        };
        let accepted = orchestrator(Arc::clone(&portal)).cancel_booking(&intent).await;

        assert!(accepted);
        let calls = portal.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &["cancel_booking:BK-77:2:true".to_string()]);
    }

    #[tokio::test]
    async fn unknown_court_fails_without_cancel_call() {
        let portal = Arc::new(ScriptedPortal::new(grid(
            "Badminton Court 4",
            vec![booked_slot("10:00:00", "BK-5")],
        )));
        let cancelled = orchestrator(Arc::clone(&portal))
            .cancel_slot(&slot_ref((10, 0)), &no_refund())
            .await;

        assert!(cancelled.is_none());
        assert_eq!(portal.call_names(), vec!["get_availability"]);
    }
}
