//! Wire types served by the JSON API.
//!
//! Field and enum variant names are part of the frontend contract and must
//! not be renamed.

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlatformStatus {
    Updated,
    UpToDate,
    Pending,
    Behind,
    Error,
    Unknown,
}

/// Recency bucket for an update, computed from `now - timestamp`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    JustUploaded,
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    Older,
    Unknown,
}

/// One tracked platform's state for a single aggregation cycle.
#[derive(Serialize, Debug, Clone)]
pub struct PlatformRecord {
    pub platform: String,
    pub status: PlatformStatus,
    pub last_chapter: String,
    pub chapter_title: String,
    pub last_update: String,

    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,

    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub chapter_url: String,
    pub platform_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Set iff `status` is [`PlatformStatus::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_method: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_behind: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chapters: Option<usize>,
}

impl PlatformRecord {
    /// A record for a scrape that produced nothing usable.
    pub fn error(platform: &str, platform_url: &str, message: impl Into<String>) -> Self {
        PlatformRecord {
            platform: platform.into(),
            status: PlatformStatus::Error,
            last_chapter: "Unknown".into(),
            chapter_title: String::new(),
            last_update: String::new(),
            timestamp: None,
            views: 0,
            likes: 0,
            comments: 0,
            chapter_url: platform_url.into(),
            platform_url: platform_url.into(),
            note: None,
            error: Some(message.into()),
            tracking_method: None,
            days_behind: None,
            total_chapters: None,
        }
    }
}

/// One row of the recent-updates feed, derived from a [`PlatformRecord`].
#[derive(Serialize, Debug, Clone)]
pub struct RecentUpdate {
    pub id: String,
    pub platform: String,
    pub platform_display: String,
    pub platform_emoji: String,
    pub chapter_number: String,
    pub chapter_title: String,
    pub status: PlatformStatus,
    pub published_date: String,

    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,

    pub url: String,
    pub chapter_url: String,
    pub platform_url: String,
    pub preview: String,
    pub upload_status: UploadStatus,
    pub status_indicator: String,
}
