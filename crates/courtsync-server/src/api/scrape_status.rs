use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use courtsync_db::ScrapeStatusRow;
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeStatusQuery {
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeStatusItem {
    pub source: String,
    pub slot_date: NaiveDate,
    pub status: String,
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl From<ScrapeStatusRow> for ScrapeStatusItem {
    fn from(row: ScrapeStatusRow) -> Self {
        Self {
            source: row.source,
            slot_date: row.slot_date,
            status: row.status,
            detail: row.detail,
            recorded_at: row.recorded_at,
        }
    }
}

/// Per-source outcome of the most recent collection attempt for a day.
pub(super) async fn list_scrape_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ScrapeStatusQuery>,
) -> Result<Json<ApiResponse<Vec<ScrapeStatusItem>>>, ApiError> {
    let rows = courtsync_db::list_scrape_status(&state.pool, query.date)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ScrapeStatusItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
