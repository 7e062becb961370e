//! Database operations for the `bookings` table.
//!
//! A booking row is written only after the portal pipeline reports success;
//! it is the operator's local receipt, not the source of truth.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `bookings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRecordRow {
    pub id: i64,
    pub public_id: Uuid,
    pub portal_booking_id: Option<String>,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub sport: String,
    pub court: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub gross_amount: i32,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A successful booking to record locally.
#[derive(Debug, Clone)]
pub struct NewBookingRecord {
    pub portal_booking_id: Option<String>,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub sport: String,
    pub court: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub gross_amount: i32,
    pub remarks: Option<String>,
}

/// Insert a local booking record. Generates the public UUID in Rust and
/// returns the full newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_booking_record(
    pool: &PgPool,
    record: &NewBookingRecord,
) -> Result<BookingRecordRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, BookingRecordRow>(
        "INSERT INTO bookings \
             (public_id, portal_booking_id, slot_date, slot_time, sport, court, \
              customer_name, customer_phone, customer_email, gross_amount, remarks) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING id, public_id, portal_booking_id, slot_date, slot_time, sport, court, \
                   customer_name, customer_phone, customer_email, gross_amount, remarks, \
                   created_at",
    )
    .bind(public_id)
    .bind(record.portal_booking_id.as_deref())
    .bind(record.slot_date)
    .bind(record.slot_time)
    .bind(&record.sport)
    .bind(&record.court)
    .bind(&record.customer_name)
    .bind(&record.customer_phone)
    .bind(record.customer_email.as_deref())
    .bind(record.gross_amount)
    .bind(record.remarks.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// List locally recorded bookings for one calendar day, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_bookings(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Vec<BookingRecordRow>, DbError> {
    let rows = sqlx::query_as::<_, BookingRecordRow>(
        "SELECT id, public_id, portal_booking_id, slot_date, slot_time, sport, court, \
                customer_name, customer_phone, customer_email, gross_amount, remarks, \
                created_at \
         FROM bookings \
         WHERE slot_date = $1 \
         ORDER BY created_at DESC",
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
