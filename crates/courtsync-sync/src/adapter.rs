//! Availability sources and the persistence seams they write through.
//!
//! The scheduler only knows the [`PortalAdapter`] trait; the production
//! adapter pulls slot grids from the portal API and persists them through
//! [`SlotStore`] and [`ScrapeStatusStore`], which the binary backs with
//! Postgres.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use courtsync_core::SportCatalog;
use courtsync_portal::{PortalApi, PortalError, SlotInfo, TokenProvider};
use thiserror::Error;

use crate::types::ScrapeRequest;

/// Opaque persistence failure reported by a store implementation.
#[derive(Debug, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One collected slot, normalized for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub source: String,
    pub sport: String,
    pub court: String,
    pub status: String,
    pub price: i64,
    pub customer_name: Option<String>,
}

#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Insert-or-update the given slots on their natural key.
    async fn upsert_slots(&self, slots: &[SlotRecord]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ScrapeStatusStore: Send + Sync {
    async fn record(
        &self,
        source: &str,
        date: NaiveDate,
        success: bool,
        detail: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// One source of availability data.
#[async_trait]
pub trait PortalAdapter: Send + Sync {
    /// Stable identifier used in logs and scrape-status rows.
    fn source(&self) -> &str;

    /// Whether the adapter can run right now. Not-ready adapters are skipped
    /// for the cycle, never treated as failed.
    fn is_ready(&self) -> bool;

    /// Collect and persist availability for every request in the batch.
    async fn scrape(&self, batch: &[ScrapeRequest]) -> Result<(), AdapterError>;
}

/// Adapter that reads slot grids from the portal's availability endpoint.
pub struct ApiPortalAdapter {
    source: String,
    portal: Arc<dyn PortalApi>,
    tokens: Arc<dyn TokenProvider>,
    catalog: Arc<SportCatalog>,
    slots: Arc<dyn SlotStore>,
    status: Arc<dyn ScrapeStatusStore>,
}

impl ApiPortalAdapter {
    pub fn new(
        source: impl Into<String>,
        portal: Arc<dyn PortalApi>,
        tokens: Arc<dyn TokenProvider>,
        catalog: Arc<SportCatalog>,
        slots: Arc<dyn SlotStore>,
        status: Arc<dyn ScrapeStatusStore>,
    ) -> Self {
        Self {
            source: source.into(),
            portal,
            tokens,
            catalog,
            slots,
            status,
        }
    }

    async fn scrape_one(&self, request: &ScrapeRequest) -> Result<(), AdapterError> {
        let sports = self.catalog.filtered(request.sport_filter.as_deref());
        let mut rows = Vec::new();

        for sport in &sports {
            let courts = self
                .portal
                .get_availability(sport.activity_id, request.date)
                .await?;
            for court in courts {
                for slot in court.slots {
                    let Some(slot_time) = parse_slot_time(&slot.slot_time) else {
                        tracing::debug!(
                            source = %self.source,
                            raw = %slot.slot_time,
                            "skipping slot with unparseable time"
                        );
                        continue;
                    };
                    rows.push(SlotRecord {
                        slot_date: request.date,
                        slot_time,
                        source: self.source.clone(),
                        sport: sport.name.clone(),
                        court: court.court_name.clone(),
                        status: slot_status(&slot),
                        price: slot.price,
                        customer_name: slot.customer_name.clone(),
                    });
                }
            }
        }

        self.slots.upsert_slots(&rows).await?;
        self.status
            .record(&self.source, request.date, true, None)
            .await?;
        tracing::info!(
            source = %self.source,
            date = %request.date,
            slots = rows.len(),
            "collected availability"
        );
        Ok(())
    }
}

#[async_trait]
impl PortalAdapter for ApiPortalAdapter {
    fn source(&self) -> &str {
        &self.source
    }

    fn is_ready(&self) -> bool {
        self.tokens.available()
    }

    async fn scrape(&self, batch: &[ScrapeRequest]) -> Result<(), AdapterError> {
        for request in batch {
            self.scrape_one(request).await?;
        }
        Ok(())
    }
}

fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").ok()
}

/// Collapse the portal's slot flags into one status string. The portal only
/// sets `status` on non-open slots.
fn slot_status(slot: &SlotInfo) -> String {
    if slot.available == 1 {
        "available".to_string()
    } else {
        slot.status
            .as_deref()
            .map_or_else(|| "booked".to_string(), str::to_lowercase)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use courtsync_portal::{
        BookingConfirmation, CartLine, CourtAvailability, CustomerRef, NewBooking, RefundType,
    };

    use super::*;

    struct FakePortal {
        grids: Mutex<Vec<Result<Vec<CourtAvailability>, PortalError>>>,
    }

    #[async_trait]
    impl PortalApi for FakePortal {
        async fn get_availability(
            &self,
            _activity_id: i64,
            _date: NaiveDate,
        ) -> Result<Vec<CourtAvailability>, PortalError> {
            self.grids
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn add_to_cart(&self, _line: &CartLine) -> Result<(), PortalError> {
            unimplemented!("not exercised by adapter tests")
        }

        async fn lookup_customer(&self, _phone: &str) -> Result<CustomerRef, PortalError> {
            unimplemented!("not exercised by adapter tests")
        }

        async fn reset_credits(&self) -> Result<(), PortalError> {
            unimplemented!("not exercised by adapter tests")
        }

        async fn apply_discount(&self, _amount: i64) -> Result<(), PortalError> {
            unimplemented!("not exercised by adapter tests")
        }

        async fn create_booking(
            &self,
            _booking: &NewBooking,
        ) -> Result<BookingConfirmation, PortalError> {
            unimplemented!("not exercised by adapter tests")
        }

        async fn clear_cart(&self) -> Result<(), PortalError> {
            unimplemented!("not exercised by adapter tests")
        }

        async fn cancel_booking(
            &self,
            _booking_id: &str,
            _refund_type: RefundType,
            _send_sms: bool,
        ) -> Result<(), PortalError> {
            unimplemented!("not exercised by adapter tests")
        }
    }

    #[derive(Default)]
    struct MemorySlotStore {
        rows: Mutex<Vec<SlotRecord>>,
    }

    #[async_trait]
    impl SlotStore for MemorySlotStore {
        async fn upsert_slots(&self, slots: &[SlotRecord]) -> Result<(), StoreError> {
            self.rows.lock().unwrap().extend_from_slice(slots);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStatusStore {
        records: Mutex<Vec<(String, NaiveDate, bool)>>,
    }

    #[async_trait]
    impl ScrapeStatusStore for MemoryStatusStore {
        async fn record(
            &self,
            source: &str,
            date: NaiveDate,
            success: bool,
            _detail: Option<&str>,
        ) -> Result<(), StoreError> {
            self.records
                .lock()
                .unwrap()
                .push((source.to_string(), date, success));
            Ok(())
        }
    }

    struct AlwaysToken;

    #[async_trait]
    impl TokenProvider for AlwaysToken {
        fn available(&self) -> bool {
            true
        }

        async fn bearer_token(&self) -> Result<String, PortalError> {
            Ok("token".to_string())
        }
    }

    fn one_court_grid() -> Vec<CourtAvailability> {
        vec![CourtAvailability {
            court_id: 11,
            court_name: "Badminton Court 2".to_string(),
            slots: vec![
                SlotInfo {
                    slot_time: "09:00:00".to_string(),
                    available: 1,
                    price: 400,
                    status: None,
                    customer_name: None,
                    booking_id: None,
                },
                SlotInfo {
                    slot_time: "09:30:00".to_string(),
                    available: 0,
                    price: 400,
                    status: Some("Booked".to_string()),
                    customer_name: Some("Ravi".to_string()),
                    booking_id: Some("BK-5".to_string()),
                },
            ],
        }]
    }

    fn single_sport_catalog() -> Arc<SportCatalog> {
        Arc::new(SportCatalog::new(vec![courtsync_core::Sport {
            name: "Badminton".to_string(),
            activity_id: 16214,
        }]))
    }

    #[tokio::test]
    async fn scrape_persists_rows_and_success_status() {
        let portal = Arc::new(FakePortal {
            grids: Mutex::new(vec![Ok(one_court_grid())]),
        });
        let slots = Arc::new(MemorySlotStore::default());
        let status = Arc::new(MemoryStatusStore::default());
        let adapter = ApiPortalAdapter::new(
            "portal-api",
            portal,
            Arc::new(AlwaysToken),
            single_sport_catalog(),
            Arc::clone(&slots) as Arc<dyn SlotStore>,
            Arc::clone(&status) as Arc<dyn ScrapeStatusStore>,
        );

        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        adapter
            .scrape(&[ScrapeRequest {
                date,
                force: false,
                sport_filter: None,
            }])
            .await
            .expect("scrape should succeed");

        let rows = slots.rows.lock().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "available");
        assert_eq!(rows[1].status, "booked");
        assert_eq!(rows[1].customer_name.as_deref(), Some("Ravi"));

        let records = status.records.lock().unwrap();
        assert_eq!(records.as_slice(), &[("portal-api".to_string(), date, true)]);
    }

    #[tokio::test]
    async fn portal_failure_propagates_without_status_write() {
        let portal = Arc::new(FakePortal {
            grids: Mutex::new(vec![Err(PortalError::Server { status: 502 })]),
        });
        let slots = Arc::new(MemorySlotStore::default());
        let status = Arc::new(MemoryStatusStore::default());
        let adapter = ApiPortalAdapter::new(
            "portal-api",
            portal,
            Arc::new(AlwaysToken),
            single_sport_catalog(),
            Arc::clone(&slots) as Arc<dyn SlotStore>,
            Arc::clone(&status) as Arc<dyn ScrapeStatusStore>,
        );

        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let err = adapter
            .scrape(&[ScrapeRequest {
                date,
                force: false,
                sport_filter: None,
            }])
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Portal(_)));
        assert!(slots.rows.lock().unwrap().is_empty());
        assert!(status.records.lock().unwrap().is_empty());
    }

    #[test]
    fn unparseable_time_is_skipped_not_fatal() {
        let slot = SlotInfo {
            slot_time: "9am".to_string(),
            available: 1,
            price: 0,
            status: None,
            customer_name: None,
            booking_id: None,
        };
        assert!(parse_slot_time(&slot.slot_time).is_none());
    }
}
