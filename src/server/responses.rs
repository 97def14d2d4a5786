use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::cache::TooSoon;

pub fn rfc3339(instant: OffsetDateTime) -> String {
    instant.format(&Rfc3339).unwrap_or_default()
}

/// 429 for a forced sync that arrived before the TTL ran out.
#[derive(Debug, Clone, Copy)]
pub struct SyncTooSoon(pub TooSoon);

impl IntoResponse for SyncTooSoon {
    fn into_response(self) -> Response {
        let minutes_left = self.0.minutes_left();

        IntoResponse::into_response((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "message": format!(
                    "Rate limited. Please wait {minutes_left} minutes before next sync."
                ),
                "timestamp": rfc3339(OffsetDateTime::now_utc()),
                "next_allowed_sync": rfc3339(self.0.next_allowed),
            })),
        ))
    }
}

/// 400 for a malformed or unresolvable manual-update request.
#[derive(Debug, Clone)]
pub struct BadUpdateRequest(pub String);

impl IntoResponse for BadUpdateRequest {
    fn into_response(self) -> Response {
        IntoResponse::into_response((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": self.0,
            })),
        ))
    }
}
