//! Builds the recent-updates feed from cached platform records.
//!
//! The feed is derived on every request and never stored: records without a
//! real update signal are dropped, the rest are windowed to the trailing
//! seven days and sorted newest-first.

use std::cmp::Reverse;

use serde::Serialize;
use time::OffsetDateTime;

use crate::config::PlatformConfig;
use crate::extract::upload_status;
use crate::record::{PlatformRecord, PlatformStatus, RecentUpdate, UploadStatus};

/// Trailing window for the recent-updates feed.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Placeholder title manual tracking produces when nothing is known.
const PLACEHOLDER_TITLE: &str = "Up to Date";

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadTracking {
    pub just_uploaded: usize,
    pub today: usize,
    pub this_week: usize,
}

pub struct RecentFeed {
    pub updates: Vec<RecentUpdate>,
    pub total_before_filter: usize,
    pub tracking: UploadTracking,
}

pub fn build_recent_feed(
    records: &[PlatformRecord],
    platforms: &[PlatformConfig],
    now: OffsetDateTime,
) -> RecentFeed {
    let candidates: Vec<&PlatformRecord> = records
        .iter()
        .filter(|record| has_real_update(record))
        .collect();
    let total_before_filter = candidates.len();

    let cutoff = now - time::Duration::days(RECENT_WINDOW_DAYS);
    let mut updates: Vec<RecentUpdate> = candidates
        .into_iter()
        .filter(|record| record.timestamp.is_some_and(|ts| ts >= cutoff))
        .map(|record| to_update(record, platforms, now))
        .collect();

    // Stable sort keeps insertion order for equal timestamps.
    updates.sort_by_key(|update| Reverse(update.timestamp.unwrap_or(OffsetDateTime::UNIX_EPOCH)));

    let mut tracking = UploadTracking::default();
    for update in &updates {
        match update.upload_status {
            UploadStatus::JustUploaded => tracking.just_uploaded += 1,
            UploadStatus::Today => tracking.today += 1,
            UploadStatus::ThisWeek => tracking.this_week += 1,
            _ => {}
        }
    }

    RecentFeed {
        updates,
        total_before_filter,
        tracking,
    }
}

fn has_real_update(record: &PlatformRecord) -> bool {
    !record.chapter_title.is_empty()
        && record.chapter_title != PLACEHOLDER_TITLE
        && record.status != PlatformStatus::UpToDate
        && record.timestamp.is_some()
}

fn to_update(
    record: &PlatformRecord,
    platforms: &[PlatformConfig],
    now: OffsetDateTime,
) -> RecentUpdate {
    let config = platforms.iter().find(|p| p.id == record.platform);
    let platform_url = config
        .map(|p| p.url.to_string())
        .unwrap_or_else(|| record.platform_url.clone());
    let chapter_url = if record.chapter_url.is_empty() {
        platform_url.clone()
    } else {
        record.chapter_url.clone()
    };

    let upload = upload_status(now, record.timestamp);
    let unix = record.timestamp.map_or(0, OffsetDateTime::unix_timestamp);

    RecentUpdate {
        id: format!("{}-{unix}", record.platform),
        platform: record.platform.clone(),
        platform_display: config
            .map(|p| p.name.clone())
            .unwrap_or_else(|| record.platform.clone()),
        platform_emoji: config.map(|p| p.emoji.clone()).unwrap_or_default(),
        chapter_number: record.last_chapter.clone(),
        chapter_title: record.chapter_title.clone(),
        status: record.status,
        published_date: record.last_update.clone(),
        timestamp: record.timestamp,
        url: chapter_url.clone(),
        chapter_url,
        platform_url,
        preview: format!("New chapter uploaded: {}", record.chapter_title),
        upload_status: upload,
        status_indicator: status_indicator(upload, &record.last_update),
    }
}

fn status_indicator(upload: UploadStatus, last_update: &str) -> String {
    match upload {
        UploadStatus::JustUploaded => "🔥 JUST UPLOADED!".into(),
        UploadStatus::Today => "✨ Today".into(),
        UploadStatus::Yesterday => "📅 Yesterday".into(),
        UploadStatus::ThisWeek => "📆 This week".into(),
        _ => last_update.into(),
    }
}
