//! Date normalization across English and Japanese listing formats.
//!
//! [`parse`] turns raw date text from any agency into an instant in the
//! canonical timezone. Candidate formats are tried in a fixed priority order
//! and the first one that consumes the whole string wins:
//!
//! 1. RFC 3339 timestamps with an offset (`2025-10-08T01:00:00Z`)
//! 2. Naive ISO timestamps (`2025-10-08T10:00:00`, `2025-10-08 10:00`)
//! 3. Japanese calendar dates (`2025年10月8日`, `令和7年10月8日`)
//! 4. ISO-like dates (`2025-10-08`, `2025/10/08`, `2025.10.08`)
//! 5. Numeric dates with the year last, ordered per agency
//!    (`10/08/2025` is month-first for the FDA, day-first elsewhere)
//! 6. English month names (`October 8, 2025`, `8 October 2025`, `Oct 8, 2025`)
//!
//! When nothing matches the whole text, date-looking fragments are pulled out
//! of it (e.g. `"News 8 October 2025"`) and run through the same list.
//!
//! Values without an offset are read as Tokyo wall-clock time, so a bare
//! date becomes midnight in Tokyo.

use crate::models::{Agency, CANONICAL_TZ, DateOrder, Timestamp};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%d/%m/%Y", "%d-%m-%Y"];
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%m/%d/%Y", "%m-%d-%Y"];

// chrono's %B and %b both accept full and abbreviated month names.
const ENGLISH_FORMATS: &[&str] = &["%B %d, %Y", "%B %d %Y", "%d %B %Y", "%d %B, %Y"];

static JAPANESE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日$").unwrap());
static REIWA_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^令和(\d{1,2}|元)年(\d{1,2})月(\d{1,2})日$").unwrap());

/// Fragment patterns for text that carries a date among other words.
static FRAGMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:\d{2})?",
        r"\d{4}年\d{1,2}月\d{1,2}日",
        r"令和(?:\d{1,2}|元)年\d{1,2}月\d{1,2}日",
        r"\b\d{4}[-/.]\d{1,2}[-/.]\d{1,2}\b",
        r"\b\d{1,2}[-/.]\d{1,2}[-/.]\d{4}\b",
        r"\b[A-Za-z]{3,9}\.? \d{1,2},? \d{4}\b",
        r"\b\d{1,2} [A-Za-z]{3,9},? \d{4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Parse `raw` as published by `source` into a canonical-zone instant.
///
/// Returns `None` when no supported format matches; callers drop such items
/// instead of inventing a date.
pub fn parse(raw: &str, source: Agency) -> Option<Timestamp> {
    let text = normalize(raw);
    if text.is_empty() {
        return None;
    }

    if let Some(ts) = parse_whole(&text, source) {
        trace!(raw, %ts, "Parsed date");
        return Some(ts);
    }

    for pattern in FRAGMENTS.iter() {
        for m in pattern.find_iter(&text) {
            if let Some(ts) = parse_whole(m.as_str(), source) {
                trace!(raw, fragment = m.as_str(), %ts, "Parsed date from fragment");
                return Some(ts);
            }
        }
    }

    debug!(raw, %source, "Unparseable date text");
    None
}

/// True when the whole of `raw` is a date in some agency's format, with
/// nothing else around it.
pub fn is_date_only(raw: &str) -> bool {
    let text = normalize(raw);
    !text.is_empty() && Agency::ALL.iter().any(|&agency| parse_whole(&text, agency).is_some())
}

/// Fold full-width digits and separators, collapse whitespace, and drop the
/// spaces some pages put between Japanese date components.
fn normalize(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '／' => '/',
            '－' | '‐' | '–' => '-',
            '，' => ',',
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect();

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.contains('年') {
        collapsed.replace(' ', "")
    } else {
        collapsed
            .trim_matches(|c: char| c == '|' || c == '-' || c == ':' || c.is_whitespace())
            .to_string()
    }
}

fn parse_whole(text: &str, source: Agency) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&*CANONICAL_TZ));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(text, fmt) {
            return localize(ndt);
        }
    }

    if let Some(date) = parse_japanese(text) {
        return at_midnight(date);
    }

    let numeric = match source.date_order() {
        DateOrder::MonthFirst => MONTH_FIRST_FORMATS,
        DateOrder::DayFirst => DAY_FIRST_FORMATS,
    };

    ISO_DATE_FORMATS
        .iter()
        .chain(numeric)
        .chain(ENGLISH_FORMATS)
        .find_map(|fmt| NaiveDate::parse_from_str(&strip_month_period(text), fmt).ok())
        .and_then(at_midnight)
}

fn parse_japanese(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = JAPANESE_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = REIWA_DATE.captures(text) {
        // Reiwa 1 (元年) is 2019.
        let era_year: i32 = match &caps[1] {
            "元" => 1,
            n => n.parse().ok()?,
        };
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(2018 + era_year, month, day);
    }

    None
}

/// "Oct. 8, 2025" -> "Oct 8, 2025"
fn strip_month_period(text: &str) -> String {
    match text.split_once(". ") {
        Some((head, tail)) if head.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("{head} {tail}")
        }
        _ => text.to_string(),
    }
}

fn at_midnight(date: NaiveDate) -> Option<Timestamp> {
    localize(date.and_time(NaiveTime::MIN))
}

fn localize(ndt: NaiveDateTime) -> Option<Timestamp> {
    CANONICAL_TZ.from_local_datetime(&ndt).single()
}
