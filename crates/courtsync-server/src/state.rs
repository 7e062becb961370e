//! Postgres-backed implementations of the sync crate's persistence seams.

use async_trait::async_trait;
use chrono::NaiveDate;
use courtsync_db::NewSlot;
use courtsync_sync::{ScrapeStatusStore, SlotRecord, SlotStore, StoreError};
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgSlotStore {
    pool: PgPool,
}

impl PgSlotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotStore for PgSlotStore {
    async fn upsert_slots(&self, slots: &[SlotRecord]) -> Result<(), StoreError> {
        let rows: Vec<NewSlot> = slots
            .iter()
            .map(|slot| NewSlot {
                slot_date: slot.slot_date,
                slot_time: slot.slot_time,
                source: slot.source.clone(),
                sport: slot.sport.clone(),
                court: slot.court.clone(),
                status: slot.status.clone(),
                price: i32::try_from(slot.price).ok(),
                customer_name: slot.customer_name.clone(),
            })
            .collect();

        courtsync_db::upsert_slots(&self.pool, &rows)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgScrapeStatusStore {
    pool: PgPool,
}

impl PgScrapeStatusStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScrapeStatusStore for PgScrapeStatusStore {
    async fn record(
        &self,
        source: &str,
        date: NaiveDate,
        success: bool,
        detail: Option<&str>,
    ) -> Result<(), StoreError> {
        let status = if success { "success" } else { "failed" };
        courtsync_db::record_scrape_status(&self.pool, source, date, status, detail)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }
}
