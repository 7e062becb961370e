//! Database operations for the `scrape_status` table.
//!
//! One row per `(source, slot_date)`: the outcome of the most recent
//! collection attempt for that date by that source. Sources never overwrite
//! each other's rows.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `scrape_status` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeStatusRow {
    pub id: i64,
    pub source: String,
    pub slot_date: NaiveDate,
    pub status: String,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Record the outcome of a collection attempt, replacing any previous outcome
/// for the same source and date.
///
/// `status` is `"success"` or `"failed"`; `detail` carries the error message
/// on failure.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_scrape_status(
    pool: &PgPool,
    source: &str,
    date: NaiveDate,
    status: &str,
    detail: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO scrape_status (source, slot_date, status, detail) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (source, slot_date) DO UPDATE SET \
             status      = EXCLUDED.status, \
             detail      = EXCLUDED.detail, \
             recorded_at = NOW()",
    )
    .bind(source)
    .bind(date)
    .bind(status)
    .bind(detail)
    .execute(pool)
    .await?;

    Ok(())
}

/// List the per-source collection outcomes for one calendar day.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_status(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Vec<ScrapeStatusRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeStatusRow>(
        "SELECT id, source, slot_date, status, detail, recorded_at \
         FROM scrape_status \
         WHERE slot_date = $1 \
         ORDER BY source",
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
