//! Tapas series-page scraper. Episode lists are reverse-chronological, so
//! the newest episode is the first item.

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::Html;
use time::OffsetDateTime;

use crate::config::PlatformConfig;
use crate::extract::{clean_title, element_text, Locator};
use crate::record::PlatformRecord;

use super::{fetch_text, latest_item, scrape_listing, ListOrder, Scraper};

const EPISODE_CASCADE: &[Locator] = &[
    Locator::css(".js-episode-list .js-episode"),
    Locator::css(".episode-list .episode"),
    Locator::css(".series-episodes .episode"),
    Locator::css(".episode-item"),
    Locator::css(".episode-card"),
    Locator::css(r#"a[href*="/episode/"]"#),
];

const TITLE_FALLBACK: &[Locator] = &[
    Locator::css(".episode-title"),
    Locator::css(".title"),
    Locator::css("h3"),
    Locator::css(".text--title"),
];

pub struct Tapas;

impl Scraper for Tapas {
    fn scrape<'a>(
        &'a self,
        client: &'a Client,
        platform: &'a PlatformConfig,
    ) -> BoxFuture<'a, Result<PlatformRecord>> {
        Box::pin(async move {
            let html = fetch_text(client, &platform.url).await?;
            parse_series_page(&html, platform, OffsetDateTime::now_utc())
        })
    }
}

fn parse_series_page(
    html: &str,
    platform: &PlatformConfig,
    now: OffsetDateTime,
) -> Result<PlatformRecord> {
    let doc = Html::parse_document(html);

    let mut episode = scrape_listing(
        &doc,
        platform,
        now,
        EPISODE_CASCADE,
        ListOrder::NewestFirst,
        &[],
        "episode",
    )?;

    // Episode links are often bare thumbnails; pull the title out of the
    // item body when the anchor text is empty.
    if episode.title.is_empty() {
        if let Some(item) = latest_item(&doc, EPISODE_CASCADE, ListOrder::NewestFirst) {
            for locator in TITLE_FALLBACK {
                if let Some(el) = locator.select_within(item.element).into_iter().next() {
                    let title = clean_title(&element_text(&el));

                    if !title.is_empty() {
                        episode.title = title;
                        break;
                    }
                }
            }
        }
    }

    Ok(episode.into_record(platform, now))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn platform() -> PlatformConfig {
        crate::config::Config::default()
            .platforms
            .into_iter()
            .find(|p| p.id == "tapas")
            .unwrap()
    }

    const SERIES_PAGE: &str = r#"
        <html><body>
          <ul class="js-episode-list">
            <li class="js-episode">
              <a href="/episode/301992"></a>
              <h3 class="episode-title">Episode 18 - Aftermath</h3>
              <span class="date">2 hours ago</span>
            </li>
            <li class="js-episode">
              <a href="/episode/301821"><span>Episode 17</span></a>
            </li>
          </ul>
        </body></html>"#;

    #[test]
    fn takes_first_episode_with_title_fallback() {
        let now = datetime!(2025-08-10 12:00 UTC);
        let record = parse_series_page(SERIES_PAGE, &platform(), now).unwrap();

        assert_eq!(record.chapter_title, "Episode 18 - Aftermath");
        assert_eq!(record.last_chapter, "18");
        assert_eq!(record.chapter_url, "https://tapas.io/episode/301992");
        assert_eq!(record.timestamp, Some(now - time::Duration::hours(2)));
        assert_eq!(record.total_chapters, Some(2));
    }
}
