use axum::{extract::State, Extension, Json};
use chrono::{NaiveDate, NaiveTime};
use courtsync_portal::RefundType;
use courtsync_sync::{CancellationIntent, SlotRef};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

/// Cancel either a known portal booking (`booking_id`) or whatever booking
/// occupies a slot (`date` + `time` + `sport` + `court`).
#[derive(Debug, Deserialize)]
pub(super) struct CancellationRequest {
    booking_id: Option<String>,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    sport: Option<String>,
    court: Option<String>,
    #[serde(default = "default_refund")]
    refund: String,
    #[serde(default)]
    send_sms: bool,
}

fn default_refund() -> String {
    "policy".to_string()
}

#[derive(Debug, Serialize)]
pub(super) struct CancellationData {
    pub cancelled: bool,
    pub booking_id: Option<String>,
}

pub(super) async fn create_cancellation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CancellationRequest>,
) -> Result<Json<ApiResponse<CancellationData>>, ApiError> {
    let refund_type: RefundType = body.refund.parse().map_err(|_: String| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            "refund must be one of: policy, full, none",
        )
    })?;

    if let Some(booking_id) = body.booking_id {
        let intent = CancellationIntent {
            booking_id: booking_id.clone(),
            refund_type,
            send_sms: body.send_sms,
        };
        if state.cancellation.cancel_booking(&intent).await {
            return Ok(Json(ApiResponse {
                data: CancellationData {
                    cancelled: true,
                    booking_id: Some(booking_id),
                },
                meta: ResponseMeta::new(req_id.0),
            }));
        }
        return Err(ApiError::new(
            req_id.0,
            "portal_error",
            "the portal did not accept the cancellation",
        ));
    }

    let (Some(date), Some(time), Some(sport), Some(court)) =
        (body.date, body.time, body.sport, body.court)
    else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "provide booking_id, or date, time, sport, and court",
        ));
    };

    let slot = SlotRef {
        date,
        time,
        sport,
        court,
    };
    let intent = CancellationIntent {
        booking_id: String::new(),
        refund_type,
        send_sms: body.send_sms,
    };
    match state.cancellation.cancel_slot(&slot, &intent).await {
        Some(booking_id) => {
            let coalescer = state.coalescer.clone();
            tokio::spawn(async move {
                let _ = coalescer.request_date(date, true, None).await;
            });
            Ok(Json(ApiResponse {
                data: CancellationData {
                    cancelled: true,
                    booking_id: Some(booking_id),
                },
                meta: ResponseMeta::new(req_id.0),
            }))
        }
        None => Err(ApiError::new(
            req_id.0,
            "portal_error",
            "no booked slot matched, or the portal refused the cancellation",
        )),
    }
}
