//! Text extraction utilities shared by the platform scrapers.
//!
//! Everything in here is total: malformed input yields a sentinel or `None`,
//! never a panic, since these functions run against whatever markup the
//! platforms happen to serve today.

use std::sync::OnceLock;

use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::record::UploadStatus;

/// Label returned when no chapter-number pattern matches.
pub const UNKNOWN_CHAPTER: &str = "Unknown";

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

/// Extract a chapter/episode label from a title.
///
/// Patterns are tried in priority order; the first match wins. Part notation
/// like `18.2` is preserved as-is.
pub fn chapter_number(title: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(\d+)\.(\d+)",
            r"(?i)chapter\s*(\d+)",
            r"(?i)kapitel\s*(\d+)",
            r"(?i)episode\s*(\d+)",
            r"(?i)part\s*(\d+)",
            r"(?i)teil\s*(\d+)",
            r"(\d+):",
            r"^\s*(\d+)",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });

    for pattern in patterns {
        if let Some(captures) = pattern.captures(title) {
            return match (captures.get(1), captures.get(2)) {
                (Some(whole), Some(part)) => format!("{}.{}", whole.as_str(), part.as_str()),
                (Some(n), None) => n.as_str().to_owned(),
                _ => continue,
            };
        }
    }

    UNKNOWN_CHAPTER.into()
}

/// Strip trailing "N days ago"-style noise that some chapter tables append to
/// link text, and collapse runs of whitespace.
pub fn clean_title(title: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static AGO_SUFFIX: OnceLock<Regex> = OnceLock::new();

    let collapsed = regex(&WHITESPACE, r"\s+").replace_all(title.trim(), " ");
    regex(
        &AGO_SUFFIX,
        r"(?i)\s*\d+\s+(days?|hours?|minutes?|weeks?)\s+ago\s*$",
    )
    .replace(&collapsed, "")
    .trim()
    .to_owned()
}

/// Parse an engagement-metric text such as `1.2K`, `5.3M` or `12,345`.
pub fn metric_value(text: &str) -> Option<u64> {
    static THOUSANDS: OnceLock<Regex> = OnceLock::new();
    static MILLIONS: OnceLock<Regex> = OnceLock::new();
    static PLAIN: OnceLock<Regex> = OnceLock::new();

    if let Some(captures) = regex(&THOUSANDS, r"(?i)([\d.]+)\s*K\b").captures(text) {
        let n: f64 = captures[1].parse().ok()?;
        return Some((n * 1_000.0).round() as u64);
    }

    if let Some(captures) = regex(&MILLIONS, r"(?i)([\d.]+)\s*M\b").captures(text) {
        let n: f64 = captures[1].parse().ok()?;
        return Some((n * 1_000_000.0).round() as u64);
    }

    let m = regex(&PLAIN, r"[\d,]+").find(text)?;
    m.as_str().replace(',', "").parse().ok()
}

/// One step of a selector-fallback cascade: a CSS query, optionally narrowed
/// to elements whose text contains a needle (stand-in for the `:contains()`
/// pseudo-class CSS itself lacks).
#[derive(Debug, Clone, Copy)]
pub struct Locator {
    pub css: &'static str,
    pub contains: Option<&'static str>,
}

impl Locator {
    pub const fn css(css: &'static str) -> Self {
        Locator {
            css,
            contains: None,
        }
    }

    pub const fn containing(css: &'static str, needle: &'static str) -> Self {
        Locator {
            css,
            contains: Some(needle),
        }
    }

    /// All elements this locator matches, in document order.
    pub fn select<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        let Ok(selector) = Selector::parse(self.css) else {
            return Vec::new();
        };

        doc.select(&selector)
            .filter(|el| match self.contains {
                Some(needle) => element_text(el).contains(needle),
                None => true,
            })
            .collect()
    }

    /// Like [`Locator::select`], but scoped to a subtree.
    pub fn select_within<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let Ok(selector) = Selector::parse(self.css) else {
            return Vec::new();
        };

        scope
            .select(&selector)
            .filter(|el| match self.contains {
                Some(needle) => element_text(el).contains(needle),
                None => true,
            })
            .collect()
    }
}

pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Walk a locator cascade and return the first metric value that parses.
///
/// Locator order encodes preference: the first locator that matches an
/// element wins even if a later one would match too. The element's text is
/// tried first, then its `data-count`/`data-value` attributes.
pub fn engagement_metric(doc: &Html, locators: &[Locator]) -> Option<u64> {
    for locator in locators {
        let Some(el) = locator.select(doc).into_iter().next() else {
            continue;
        };

        if let Some(value) = metric_value(&element_text(&el)) {
            return Some(value);
        }

        for attr in ["data-count", "data-value"] {
            if let Some(value) = el.value().attr(attr).and_then(metric_value) {
                return Some(value);
            }
        }
    }

    None
}

const CLOCK_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");
const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

fn clock_time(instant: OffsetDateTime) -> String {
    instant.format(CLOCK_FORMAT).unwrap_or_default()
}

/// Render `then` relative to `now` for humans.
///
/// Buckets: just now, minutes, hours (+ clock time), yesterday, days
/// (+ clock time), weeks, months, then a plain date. Future or unformattable
/// instants degrade to a generic string.
pub fn format_relative_time(now: OffsetDateTime, then: OffsetDateTime) -> String {
    let elapsed = now - then;

    if elapsed.is_negative() {
        return "just now".into();
    }

    let minutes = elapsed.whole_minutes();
    let hours = elapsed.whole_hours();
    let days = elapsed.whole_days();
    let weeks = days / 7;
    let months = days / 30;

    if minutes < 1 {
        "just now".into()
    } else if minutes < 60 {
        format!("{minutes} minutes ago")
    } else if hours < 24 {
        let clock = clock_time(then);
        if hours == 1 {
            format!("1 hour ago ({clock})")
        } else {
            format!("{hours} hours ago ({clock})")
        }
    } else if days == 1 {
        format!("yesterday at {}", clock_time(then))
    } else if days < 7 {
        format!("{days} days ago ({})", clock_time(then))
    } else if weeks == 1 {
        "1 week ago".into()
    } else if weeks < 4 {
        format!("{weeks} weeks ago")
    } else if months < 12 {
        format!("{months} months ago")
    } else {
        then.format(DATE_FORMAT).unwrap_or_else(|_| "recently".into())
    }
}

/// Parse human phrases like "3 days ago", "yesterday" or "today" back into an
/// instant, falling back to common absolute date formats. Returns `None` when
/// nothing matches.
pub fn parse_relative_time(now: OffsetDateTime, text: &str) -> Option<OffsetDateTime> {
    static AGO: OnceLock<Regex> = OnceLock::new();

    let lowered = text.trim().to_lowercase();

    if let Some(captures) =
        regex(&AGO, r"(\d+)\s*(minutes?|hours?|days?|weeks?)\s*ago").captures(&lowered)
    {
        let n: i64 = captures[1].parse().ok()?;
        let duration = match &captures[2][..1] {
            "m" => time::Duration::minutes(n),
            "h" => time::Duration::hours(n),
            "d" => time::Duration::days(n),
            _ => time::Duration::weeks(n),
        };

        return Some(now - duration);
    }

    if lowered.contains("just now") || lowered == "now" || lowered.contains("gerade eben") {
        return Some(now);
    }

    if lowered.contains("yesterday") {
        return Some(now - time::Duration::days(1));
    }

    if lowered.contains("today") {
        return Some(now.replace_time(Time::MIDNIGHT));
    }

    parse_instant(text, now.offset())
}

/// Best-effort absolute date/datetime parsing.
pub fn parse_instant(text: &str, assumed_offset: time::UtcOffset) -> Option<OffsetDateTime> {
    const LOCAL_FORMATS: &[&[BorrowedFormatItem<'_>]] = &[
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    const DAY_FORMATS: &[&[BorrowedFormatItem<'_>]] = &[
        format_description!("[year]-[month]-[day]"),
        format_description!("[day] [month repr:short] [year]"),
    ];

    let text = text.trim();

    if let Ok(instant) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(instant);
    }

    if let Ok(instant) = OffsetDateTime::parse(text, &Rfc2822) {
        return Some(instant);
    }

    for format in LOCAL_FORMATS {
        if let Ok(dt) = PrimitiveDateTime::parse(text, format) {
            return Some(dt.assume_offset(assumed_offset));
        }
    }

    for format in DAY_FORMATS {
        if let Ok(date) = Date::parse(text, format) {
            return Some(date.midnight().assume_offset(assumed_offset));
        }
    }

    None
}

/// Unix timestamps show up in `unixtime` attributes on some chapter tables.
pub fn parse_unix_timestamp(text: &str) -> Option<OffsetDateTime> {
    let seconds: i64 = text.trim().parse().ok()?;
    OffsetDateTime::from_unix_timestamp(seconds).ok()
}

/// Bucket an update timestamp by how long ago it happened.
pub fn upload_status(now: OffsetDateTime, timestamp: Option<OffsetDateTime>) -> UploadStatus {
    let Some(timestamp) = timestamp else {
        return UploadStatus::Unknown;
    };

    let elapsed = now - timestamp;
    let hours = elapsed.whole_hours();
    let days = elapsed.whole_days();

    if hours < 1 {
        UploadStatus::JustUploaded
    } else if hours < 24 {
        UploadStatus::Today
    } else if days < 2 {
        UploadStatus::Yesterday
    } else if days < 7 {
        UploadStatus::ThisWeek
    } else if days < 30 {
        UploadStatus::ThisMonth
    } else {
        UploadStatus::Older
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn chapter_number_patterns() {
        assert_eq!(chapter_number("Chapter 18"), "18");
        assert_eq!(chapter_number("chapter  7: The Fall"), "7");
        assert_eq!(chapter_number("Kapitel 3"), "3");
        assert_eq!(chapter_number("Episode 42 - Finale"), "42");
        assert_eq!(chapter_number("Part 9"), "9");
        assert_eq!(chapter_number("Teil 2"), "2");
        assert_eq!(chapter_number("18.2 - Interlude"), "18.2");
        assert_eq!(chapter_number("12: Homecoming"), "12");
        assert_eq!(chapter_number("5 Homecoming"), "5");
    }

    #[test]
    fn chapter_number_sentinel() {
        assert_eq!(chapter_number(""), UNKNOWN_CHAPTER);
        assert_eq!(chapter_number("Prologue"), UNKNOWN_CHAPTER);
        assert_eq!(chapter_number("An Interlude, Of Sorts"), UNKNOWN_CHAPTER);
    }

    #[test]
    fn clean_title_strips_ago_noise() {
        assert_eq!(
            clean_title("Chapter 18: The Fall   3 days ago"),
            "Chapter 18: The Fall"
        );
        assert_eq!(clean_title("  Chapter\n 18  "), "Chapter 18");
        assert_eq!(clean_title("Chapter 18"), "Chapter 18");
    }

    #[test]
    fn metric_suffixes() {
        assert_eq!(metric_value("1.2K"), Some(1200));
        assert_eq!(metric_value("5.3M"), Some(5_300_000));
        assert_eq!(metric_value("12,345 reads"), Some(12_345));
        assert_eq!(metric_value("234"), Some(234));
        assert_eq!(metric_value("2 K views"), Some(2000));
        assert_eq!(metric_value("no numbers here"), None);
    }

    #[test]
    fn engagement_metric_prefers_earlier_locators() {
        let doc = Html::parse_document(
            r#"<div class="reads">1.2K</div><div class="stats">999</div>"#,
        );
        let value = engagement_metric(&doc, &[Locator::css(".reads"), Locator::css(".stats")]);
        assert_eq!(value, Some(1200));
    }

    #[test]
    fn engagement_metric_falls_back_to_data_attributes() {
        let doc = Html::parse_document(r#"<span class="likes" data-count="731">likes</span>"#);
        assert_eq!(engagement_metric(&doc, &[Locator::css(".likes")]), Some(731));
    }

    #[test]
    fn engagement_metric_contains_filter() {
        let doc = Html::parse_document(
            "<dl><dt>Pages</dt><dd>12</dd><dd>Views 4,100</dd><dd>77</dd></dl>",
        );
        let value = engagement_metric(&doc, &[Locator::containing("dd", "Views")]);
        assert_eq!(value, Some(4100));
    }

    #[test]
    fn engagement_metric_none_when_nothing_matches() {
        let doc = Html::parse_document("<p>hello</p>");
        assert_eq!(engagement_metric(&doc, &[Locator::css(".reads")]), None);
    }

    #[test]
    fn relative_time_buckets() {
        let now = datetime!(2025-08-10 12:00 UTC);

        assert_eq!(format_relative_time(now, now), "just now");
        assert_eq!(
            format_relative_time(now, now - time::Duration::minutes(5)),
            "5 minutes ago"
        );
        assert_eq!(
            format_relative_time(now, now - time::Duration::hours(3)),
            "3 hours ago (09:00)"
        );
        assert_eq!(
            format_relative_time(now, now - time::Duration::days(1)),
            "yesterday at 12:00"
        );
        assert_eq!(
            format_relative_time(now, now - time::Duration::days(3)),
            "3 days ago (12:00)"
        );
        assert_eq!(
            format_relative_time(now, now - time::Duration::days(7)),
            "1 week ago"
        );
        assert_eq!(
            format_relative_time(now, now - time::Duration::days(21)),
            "3 weeks ago"
        );
        assert_eq!(
            format_relative_time(now, now - time::Duration::days(90)),
            "3 months ago"
        );
        assert_eq!(
            format_relative_time(now, now - time::Duration::days(400)),
            "2024-07-06"
        );
    }

    #[test]
    fn relative_time_is_monotonic() {
        // Growing elapsed time must never move to an earlier bucket.
        let now = datetime!(2025-08-10 12:00 UTC);
        let buckets = [
            time::Duration::ZERO,
            time::Duration::minutes(30),
            time::Duration::hours(5),
            time::Duration::days(1),
            time::Duration::days(4),
            time::Duration::days(10),
            time::Duration::days(45),
            time::Duration::days(500),
        ];

        let mut seen = Vec::new();
        for elapsed in buckets {
            let label = format_relative_time(now, now - elapsed);
            assert!(!seen.contains(&label), "bucket repeated: {label}");
            seen.push(label);
        }
    }

    #[test]
    fn relative_time_future_instant_does_not_panic() {
        let now = datetime!(2025-08-10 12:00 UTC);
        assert_eq!(
            format_relative_time(now, now + time::Duration::days(2)),
            "just now"
        );
    }

    #[test]
    fn parse_relative_phrases() {
        let now = datetime!(2025-08-10 12:00 UTC);

        assert_eq!(
            parse_relative_time(now, "3 days ago"),
            Some(now - time::Duration::days(3))
        );
        assert_eq!(
            parse_relative_time(now, "45 minutes ago"),
            Some(now - time::Duration::minutes(45))
        );
        assert_eq!(
            parse_relative_time(now, "2 weeks ago"),
            Some(now - time::Duration::weeks(2))
        );
        assert_eq!(
            parse_relative_time(now, "Yesterday"),
            Some(now - time::Duration::days(1))
        );
        assert_eq!(
            parse_relative_time(now, "today"),
            Some(datetime!(2025-08-10 0:00 UTC))
        );
        assert_eq!(parse_relative_time(now, "just now"), Some(now));
        assert_eq!(parse_relative_time(now, "gibberish"), None);
    }

    #[test]
    fn parse_absolute_dates() {
        let now = datetime!(2025-08-10 12:00 UTC);

        assert_eq!(
            parse_relative_time(now, "2025-08-06T14:30:00"),
            Some(datetime!(2025-08-06 14:30 UTC))
        );
        assert_eq!(
            parse_relative_time(now, "2025-08-06"),
            Some(datetime!(2025-08-06 0:00 UTC))
        );
        assert_eq!(
            parse_relative_time(now, "2025-08-06T14:30:00Z"),
            Some(datetime!(2025-08-06 14:30 UTC))
        );
    }

    #[test]
    fn unix_timestamps() {
        assert_eq!(
            parse_unix_timestamp("1754484600"),
            OffsetDateTime::from_unix_timestamp(1_754_484_600).ok()
        );
        assert_eq!(parse_unix_timestamp("soon"), None);
    }

    #[test]
    fn upload_status_buckets() {
        let now = datetime!(2025-08-10 12:00 UTC);

        let at = |d: time::Duration| upload_status(now, Some(now - d));

        assert_eq!(at(time::Duration::minutes(10)), UploadStatus::JustUploaded);
        assert_eq!(at(time::Duration::hours(5)), UploadStatus::Today);
        assert_eq!(at(time::Duration::hours(30)), UploadStatus::Yesterday);
        assert_eq!(at(time::Duration::days(3)), UploadStatus::ThisWeek);
        assert_eq!(at(time::Duration::days(12)), UploadStatus::ThisMonth);
        assert_eq!(at(time::Duration::days(60)), UploadStatus::Older);
        assert_eq!(upload_status(now, None), UploadStatus::Unknown);
    }
}
