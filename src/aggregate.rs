//! One aggregation cycle: every enabled scraper runs concurrently, manual
//! platforms are synthesized from their config fields, and failures degrade
//! to per-record errors instead of aborting the cycle.

use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use time::OffsetDateTime;
use tracing::{error, info, info_span, Instrument};

use crate::config::PlatformConfig;
use crate::extract::format_relative_time;
use crate::record::{PlatformRecord, PlatformStatus};
use crate::scrape::Registry;

pub struct Aggregator {
    client: Client,
    registry: Arc<Registry>,
}

impl Aggregator {
    pub fn new(client: Client, registry: Arc<Registry>) -> Self {
        Aggregator { client, registry }
    }

    /// Produce a fresh record for every configured platform, in config order.
    pub async fn run(&self, platforms: &[PlatformConfig], now: OffsetDateTime) -> Vec<PlatformRecord> {
        let futures = platforms.iter().map(|platform| {
            async move {
                let mut record = if platform.scraping {
                    self.scrape_one(platform).await
                } else {
                    manual_record(platform, now)
                };

                record.note = platform.note.clone();
                record
            }
            .instrument(info_span!("platform", id = %platform.id))
        });

        let records = join_all(futures).await;

        info!(
            total = records.len(),
            errors = records
                .iter()
                .filter(|r| r.status == PlatformStatus::Error)
                .count(),
            "Aggregation cycle finished"
        );

        records
    }

    async fn scrape_one(&self, platform: &PlatformConfig) -> PlatformRecord {
        let Some(scraper) = self.registry.get(platform.id.as_str()) else {
            return PlatformRecord::error(
                &platform.id,
                platform.url.as_str(),
                format!("no scraper registered for platform `{}`", platform.id),
            );
        };

        match scraper.scrape(&self.client, platform).await {
            Ok(record) => record,

            Err(e) => {
                error!("Scraping `{}` failed: {e:#}", platform.id);
                PlatformRecord::error(
                    &platform.id,
                    platform.url.as_str(),
                    format!("Scraping failed: {e:#}"),
                )
            }
        }
    }
}

/// Synthesize a record from manual-tracking config fields.
fn manual_record(platform: &PlatformConfig, now: OffsetDateTime) -> PlatformRecord {
    let last_chapter = platform
        .last_chapter
        .clone()
        .unwrap_or_else(|| "Unknown".into());
    let timestamp = platform
        .last_update
        .as_deref()
        .and_then(|text| crate::extract::parse_instant(text, now.offset()));

    let (status, days_behind, last_update) = match timestamp {
        Some(ts) => {
            let days = (now - ts).whole_days();
            (manual_status(days), Some(days), format_relative_time(now, ts))
        }

        None => (PlatformStatus::Unknown, None, "recently".into()),
    };

    PlatformRecord {
        platform: platform.id.clone(),
        status,
        chapter_title: format!("{last_chapter}: Latest"),
        last_chapter,
        last_update,
        timestamp,
        views: 0,
        likes: 0,
        comments: 0,
        chapter_url: platform.url.to_string(),
        platform_url: platform.url.to_string(),
        note: None,
        error: None,
        tracking_method: Some("manual"),
        days_behind,
        total_chapters: None,
    }
}

fn manual_status(days_behind: i64) -> PlatformStatus {
    if days_behind <= 1 {
        PlatformStatus::Updated
    } else if days_behind <= 2 {
        PlatformStatus::Pending
    } else if days_behind > 7 {
        PlatformStatus::Behind
    } else {
        PlatformStatus::UpToDate
    }
}
