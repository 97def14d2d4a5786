use axum::extract::State;
use axum::response::Result;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use crate::feed::{self, UploadTracking, RECENT_WINDOW_DAYS};
use crate::record::{PlatformRecord, RecentUpdate};
use crate::server::responses::{rfc3339, BadUpdateRequest, SyncTooSoon};
use crate::state::State as AppState;

#[derive(Serialize, Debug)]
pub(crate) struct StatusResponse {
    platforms: Vec<PlatformRecord>,

    #[serde(with = "time::serde::rfc3339")]
    last_check: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    next_update: OffsetDateTime,
}

pub async fn platforms_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.records().await;

    Json(StatusResponse {
        platforms: snapshot.records.to_vec(),
        last_check: snapshot.fetched_at,
        next_update: snapshot.next_update,
    })
}

#[derive(Serialize, Debug)]
pub(crate) struct RecentResponse {
    updates: Vec<RecentUpdate>,
    total: usize,
    total_before_filter: usize,
    days_filtered: i64,

    #[serde(with = "time::serde::rfc3339")]
    last_update: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    next_update: OffsetDateTime,

    upload_tracking: UploadTracking,
}

/// Built from whatever the cache currently holds; an empty cache yields an
/// empty feed rather than triggering a scrape cycle.
pub async fn chapters_recent(State(state): State<AppState>) -> Json<RecentResponse> {
    let now = OffsetDateTime::now_utc();
    let snapshot = state.cache.current();

    let (records, last_update, next_update) = match &snapshot {
        Some(snapshot) => (
            snapshot.records.as_slice(),
            snapshot.fetched_at,
            snapshot.next_update,
        ),

        None => (
            [].as_slice(),
            OffsetDateTime::UNIX_EPOCH,
            OffsetDateTime::UNIX_EPOCH + state.cache.ttl(),
        ),
    };

    let platforms = state.platforms.read().unwrap().clone();
    let built = feed::build_recent_feed(records, &platforms, now);

    Json(RecentResponse {
        total: built.updates.len(),
        total_before_filter: built.total_before_filter,
        days_filtered: RECENT_WINDOW_DAYS,
        last_update,
        next_update,
        upload_tracking: built.tracking,
        updates: built.updates,
    })
}

pub async fn sync_trigger(State(state): State<AppState>) -> Result<Json<Value>, SyncTooSoon> {
    let snapshot = state.force_sync().await.map_err(SyncTooSoon)?;
    info!("Manual sync completed");

    Ok(Json(json!({
        "success": true,
        "message": "Sync completed successfully",
        "timestamp": rfc3339(OffsetDateTime::now_utc()),
        "next_allowed_sync": rfc3339(snapshot.next_update),
    })))
}

#[derive(Deserialize, Debug)]
pub struct ManualUpdate {
    platform: Option<String>,
    chapter: Option<String>,
    date: Option<String>,
    time: Option<String>,
}

/// Overwrite a platform's manual-tracking fields and invalidate the cache so
/// the next status read runs a fresh cycle.
pub async fn chapter_update(
    State(state): State<AppState>,
    Json(update): Json<ManualUpdate>,
) -> Result<Json<Value>, BadUpdateRequest> {
    let (Some(platform_id), Some(chapter)) = (update.platform, update.chapter) else {
        return Err(BadUpdateRequest(
            "Missing required fields: platform, chapter".into(),
        ));
    };

    let now = OffsetDateTime::now_utc();
    let datetime = match (update.date.as_deref(), update.time.as_deref()) {
        (Some(date), Some(time)) => format!("{date}T{time}:00"),

        (Some(date), None) => {
            let clock = now
                .format(time::macros::format_description!("[hour]:[minute]"))
                .unwrap_or_default();
            format!("{date}T{clock}:00")
        }

        _ => now.format(&Rfc3339).unwrap_or_default(),
    };

    if crate::extract::parse_instant(&datetime, time::UtcOffset::UTC).is_none() {
        return Err(BadUpdateRequest(format!("Invalid date/time: {datetime}")));
    }

    let display_name = {
        let mut platforms = state.platforms.write().unwrap();

        let Some(platform) = platforms.iter_mut().find(|p| p.id == platform_id) else {
            return Err(BadUpdateRequest(format!("Unknown platform: {platform_id}")));
        };

        platform.last_chapter = Some(chapter.clone());
        platform.last_update = Some(datetime.clone());
        platform.name.clone()
    };

    state.cache.invalidate();
    info!(platform = %platform_id, %chapter, "Manual chapter update applied");

    Ok(Json(json!({
        "success": true,
        "message": format!("Updated {display_name}"),
        "platform": platform_id,
        "chapter": chapter,
        "datetime": datetime,
        "timestamp": rfc3339(now),
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": rfc3339(OffsetDateTime::now_utc()),
    }))
}
