//! Database operations for the `slots` table.
//!
//! Slot rows are the unified calendar: one row per `(slot_date, slot_time,
//! sport, court)` regardless of which source last observed it. Adapters upsert
//! whole batches after every collection pass.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `slots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlotRow {
    pub id: i64,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub source: String,
    pub sport: String,
    pub court: String,
    pub status: String,
    pub price: Option<i32>,
    pub customer_name: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// A slot observation to upsert, produced by a portal adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlot {
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub source: String,
    pub sport: String,
    pub court: String,
    pub status: String,
    pub price: Option<i32>,
    pub customer_name: Option<String>,
}

/// Upsert a batch of slot observations in one round-trip.
///
/// Uses `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT` so the whole batch is
/// written regardless of size. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_slots(pool: &PgPool, slots: &[NewSlot]) -> Result<u64, DbError> {
    if slots.is_empty() {
        return Ok(0);
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(slots.len());
    let mut times: Vec<NaiveTime> = Vec::with_capacity(slots.len());
    let mut sources: Vec<String> = Vec::with_capacity(slots.len());
    let mut sports: Vec<String> = Vec::with_capacity(slots.len());
    let mut courts: Vec<String> = Vec::with_capacity(slots.len());
    let mut statuses: Vec<String> = Vec::with_capacity(slots.len());
    let mut prices: Vec<Option<i32>> = Vec::with_capacity(slots.len());
    let mut customer_names: Vec<Option<String>> = Vec::with_capacity(slots.len());

    for slot in slots {
        dates.push(slot.slot_date);
        times.push(slot.slot_time);
        sources.push(slot.source.clone());
        sports.push(slot.sport.clone());
        courts.push(slot.court.clone());
        statuses.push(slot.status.clone());
        prices.push(slot.price);
        customer_names.push(slot.customer_name.clone());
    }

    let result = sqlx::query(
        "INSERT INTO slots \
             (slot_date, slot_time, source, sport, court, status, price, customer_name) \
         SELECT * FROM UNNEST(\
             $1::date[], $2::time[], $3::text[], $4::text[], \
             $5::text[], $6::text[], $7::int4[], $8::text[]) \
         ON CONFLICT (slot_date, slot_time, sport, court) DO UPDATE SET \
             source        = EXCLUDED.source, \
             status        = EXCLUDED.status, \
             price         = EXCLUDED.price, \
             customer_name = EXCLUDED.customer_name, \
             scraped_at    = NOW()",
    )
    .bind(&dates)
    .bind(&times)
    .bind(&sources)
    .bind(&sports)
    .bind(&courts)
    .bind(&statuses)
    .bind(&prices)
    .bind(&customer_names)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// List all slot rows for one calendar day, ordered for the dashboard grid.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_slots(pool: &PgPool, date: NaiveDate) -> Result<Vec<SlotRow>, DbError> {
    let rows = sqlx::query_as::<_, SlotRow>(
        "SELECT id, slot_date, slot_time, source, sport, court, status, price, \
                customer_name, scraped_at \
         FROM slots \
         WHERE slot_date = $1 \
         ORDER BY sport, court, slot_time",
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Check whether a specific slot is still open according to local data.
///
/// A slot with no row is treated as available: absence means no source has
/// observed a booking there, and the portal remains the authority at booking
/// time anyway.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn is_slot_available(
    pool: &PgPool,
    date: NaiveDate,
    time: NaiveTime,
    sport: &str,
    court: &str,
) -> Result<bool, DbError> {
    let status: Option<String> = sqlx::query_scalar(
        "SELECT status FROM slots \
         WHERE slot_date = $1 AND slot_time = $2 AND sport = $3 AND court = $4",
    )
    .bind(date)
    .bind(time)
    .bind(sport)
    .bind(court)
    .fetch_optional(pool)
    .await?;

    Ok(match status {
        None => true,
        Some(s) => s.eq_ignore_ascii_case("available"),
    })
}
