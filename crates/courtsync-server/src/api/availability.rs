use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use courtsync_db::SlotRow;
use courtsync_sync::RequestOutcome;
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct AvailabilityQuery {
    date: NaiveDate,
    #[serde(default)]
    force: bool,
    /// Comma-separated sport names restricting a triggered refresh.
    sports: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AvailabilityData {
    pub date: NaiveDate,
    /// Outcome of the refresh this request triggered or joined:
    /// `completed`, `failed`, or `timed_out`. Slots are returned regardless.
    pub refresh: &'static str,
    pub slots: Vec<SlotItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct SlotItem {
    pub slot_time: NaiveTime,
    pub source: String,
    pub sport: String,
    pub court: String,
    pub status: String,
    pub price: Option<i32>,
    pub customer_name: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl From<SlotRow> for SlotItem {
    fn from(row: SlotRow) -> Self {
        Self {
            slot_time: row.slot_time,
            source: row.source,
            sport: row.sport,
            court: row.court,
            status: row.status,
            price: row.price,
            customer_name: row.customer_name,
            scraped_at: row.scraped_at,
        }
    }
}

/// Triggers (or joins) a refresh of the requested day, then returns the slot
/// grid from local data. A timed-out refresh still returns the grid; the
/// caller can see the staleness in the `refresh` field.
pub(super) async fn get_availability(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<AvailabilityData>>, ApiError> {
    let filter = parse_sports_filter(query.sports.as_deref());
    let outcome = state
        .coalescer
        .request_date(query.date, query.force, filter)
        .await;
    let refresh = match outcome {
        RequestOutcome::Completed { success: true } => "completed",
        RequestOutcome::Completed { success: false } => "failed",
        RequestOutcome::TimedOut => "timed_out",
    };

    let rows = courtsync_db::list_slots(&state.pool, query.date)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: AvailabilityData {
            date: query.date,
            refresh,
            slots: rows.into_iter().map(SlotItem::from).collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn parse_sports_filter(raw: Option<&str>) -> Option<Vec<String>> {
    let sports: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if sports.is_empty() {
        None
    } else {
        Some(sports)
    }
}
