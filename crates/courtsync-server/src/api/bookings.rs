use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use courtsync_db::{BookingRecordRow, NewBookingRecord};
use courtsync_sync::BookingIntent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct CreateBookingRequest {
    date: NaiveDate,
    time: NaiveTime,
    sport: String,
    court: String,
    customer_name: String,
    customer_phone: String,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BookingsQuery {
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub(super) struct BookingItem {
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

impl From<BookingRecordRow> for BookingItem {
    fn from(row: BookingRecordRow) -> Self {
        Self {
            public_id: row.public_id,
            portal_booking_id: row.portal_booking_id,
            slot_date: row.slot_date,
            slot_time: row.slot_time,
            sport: row.sport,
            court: row.court,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            gross_amount: row.gross_amount,
            remarks: row.remarks,
            created_at: row.created_at,
        }
    }
}

/// Books a slot through the portal pipeline and records the local receipt.
///
/// Local data is checked first so an obviously taken slot is rejected with a
/// conflict before the automation lock is ever contended; the portal remains
/// the authority for slots we have not observed.
pub(super) async fn create_booking(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingItem>>), ApiError> {
    if body.customer_name.trim().is_empty() || body.customer_phone.trim().is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "customer_name and customer_phone are required",
        ));
    }

    let open = courtsync_db::is_slot_available(
        &state.pool,
        body.date,
        body.time,
        &body.sport,
        &body.court,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    if !open {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "slot is already booked according to collected data",
        ));
    }

    let intent = BookingIntent {
        date: body.date,
        time: body.time,
        sport: body.sport.clone(),
        court: body.court.clone(),
        customer_name: body.customer_name.clone(),
        customer_phone: body.customer_phone.clone(),
        customer_email: body.customer_email.clone().unwrap_or_default(),
        remarks: body.remarks.clone().unwrap_or_default(),
    };
    let Some(result) = state.booking.book_slot(&intent).await else {
        return Err(ApiError::new(
            req_id.0,
            "portal_error",
            "the portal did not accept the booking",
        ));
    };

    let record = NewBookingRecord {
        portal_booking_id: result.booking_id.clone(),
        slot_date: body.date,
        slot_time: body.time,
        sport: body.sport,
        court: body.court,
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
        customer_email: body.customer_email,
        gross_amount: i32::try_from(result.gross_amount).unwrap_or(i32::MAX),
        remarks: body.remarks,
    };
    let row = courtsync_db::insert_booking_record(&state.pool, &record)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // Refresh the day in the background so the calendar catches up without
    // holding this response open.
    let coalescer = state.coalescer.clone();
    let date = record.slot_date;
    tokio::spawn(async move {
        let _ = coalescer.request_date(date, true, None).await;
    });

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BookingItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// Lists locally recorded bookings for one day, newest first.
pub(super) async fn list_bookings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<ApiResponse<Vec<BookingItem>>>, ApiError> {
    let rows = courtsync_db::list_bookings(&state.pool, query.date)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BookingItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
