//! Data models shared by the scraping pipeline, the aggregator and the outputs.
//!
//! - [`Agency`]: the four regulatory agencies the pipeline knows about
//! - [`RawCard`]: one listing card as extracted from HTML, before normalization
//! - [`NewsItem`]: the normalized, immutable record handed downstream
//! - [`TimeWindow`]: the inclusive lookback window used for filtering
//! - [`AggregateReport`] / [`AgencyReport`]: the per-run result, one status per agency
//!
//! All instants are expressed in the canonical timezone (Asia/Tokyo, a fixed
//! `+09:00` offset without daylight saving).

use chrono::{DateTime, Duration, FixedOffset, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A timezone-aware instant in the canonical zone.
pub type Timestamp = DateTime<FixedOffset>;

/// Asia/Tokyo. Japan has not observed daylight saving since 1951.
pub static CANONICAL_TZ: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(9 * 3600).expect("+09:00 is a valid offset"));

/// The regulatory agencies with a source adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Agency {
    /// European Medicines Agency.
    Ema,
    /// Pharmaceuticals and Medical Devices Agency (Japan).
    Pmda,
    /// U.S. Food and Drug Administration, guidance documents.
    Fda,
    /// World Health Organization.
    Who,
}

/// How an agency's listing page has to be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// Server-rendered HTML, a plain GET is enough.
    Static,
    /// Client-side rendered, needs a browser session.
    Browser,
}

/// Field order for purely numeric dates such as `10/08/2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    MonthFirst,
    DayFirst,
}

impl Agency {
    pub const ALL: [Agency; 4] = [Agency::Ema, Agency::Pmda, Agency::Fda, Agency::Who];

    /// Lowercase identifier used in file names and config keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Agency::Ema => "ema",
            Agency::Pmda => "pmda",
            Agency::Fda => "fda",
            Agency::Who => "who",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Agency::Ema => "EMA News",
            Agency::Pmda => "PMDA News",
            Agency::Fda => "FDA Guidance",
            Agency::Who => "WHO News",
        }
    }

    /// Attribution line printed at the bottom of every digest.
    pub fn data_source_label(&self) -> &'static str {
        match self {
            Agency::Ema => "Data source: European Medicines Agency (EMA)",
            Agency::Pmda => "Data source: 独立行政法人 医薬品医療機器総合機構 (PMDA)",
            Agency::Fda => "Data source: U.S. Food and Drug Administration (FDA)",
            Agency::Who => "Data source: World Health Organization (WHO)",
        }
    }

    /// FDA and WHO build their listings client-side.
    pub fn rendering(&self) -> Rendering {
        match self {
            Agency::Ema | Agency::Pmda => Rendering::Static,
            Agency::Fda | Agency::Who => Rendering::Browser,
        }
    }

    /// Only the FDA publishes US-style `MM/DD/YYYY` dates.
    pub fn date_order(&self) -> DateOrder {
        match self {
            Agency::Fda => DateOrder::MonthFirst,
            _ => DateOrder::DayFirst,
        }
    }
}

impl fmt::Display for Agency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One listing card as found on the page, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCard {
    pub title: String,
    /// Absolute URL, already resolved against the agency base URL.
    pub url: String,
    pub raw_date: Option<String>,
    pub category: Option<String>,
    pub excerpt: Option<String>,
}

/// A normalized announcement.
///
/// Fields are private: a `NewsItem` is assembled once by the source adapter
/// and is read-only afterwards. Filtering produces new collections of clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    title: String,
    url: String,
    published_at: Option<Timestamp>,
    summary_seed: Option<String>,
    category: Option<String>,
    source: Agency,
}

impl NewsItem {
    pub fn new(
        source: Agency,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: Option<Timestamp>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published_at,
            summary_seed: None,
            category: None,
            source,
        }
    }

    pub fn with_summary_seed(mut self, seed: Option<String>) -> Self {
        self.summary_seed = seed.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn published_at(&self) -> Option<Timestamp> {
        self.published_at
    }

    pub fn summary_seed(&self) -> Option<&str> {
        self.summary_seed.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn source(&self) -> Agency {
        self.source
    }

    /// Title, url and date all present.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.is_empty() && self.published_at.is_some()
    }
}

/// Inclusive `[start, end]` range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    /// The `days` days leading up to `now`, both ends included.
    ///
    /// A start before the earliest representable instant is clamped to it.
    pub fn last_days(days: u32, now: Timestamp) -> Self {
        let now = now.with_timezone(&*CANONICAL_TZ);
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or_else(|| {
                warn!(days, "Lookback window exceeds the calendar; clamping its start");
                DateTime::<Utc>::MIN_UTC.fixed_offset()
            });
        Self { start, end: now }
    }

    pub fn contains(&self, instant: &Timestamp) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

/// Outcome of one agency within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgencyStatus {
    /// The fetch worked; `discarded` items were removed by the filter.
    Ok { discarded: usize },
    /// The fetch itself failed; no items could be trusted.
    Failed { cause: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AgencyReport {
    pub agency: Agency,
    #[serde(flatten)]
    pub status: AgencyStatus,
    pub items: Vec<NewsItem>,
}

impl AgencyReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, AgencyStatus::Failed { .. })
    }

    /// Items newest first, for presentation.
    pub fn items_newest_first(&self) -> Vec<&NewsItem> {
        let mut items: Vec<&NewsItem> = self.items.iter().collect();
        items.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
        items
    }
}

/// Everything one aggregation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub window: TimeWindow,
    pub generated_at: Timestamp,
    pub agencies: Vec<AgencyReport>,
    /// Set once when a capability the run depends on (the browser driver)
    /// is missing altogether.
    pub fatal: Option<String>,
}

impl AggregateReport {
    #[cfg(test)]
    pub fn get(&self, agency: Agency) -> Option<&AgencyReport> {
        self.agencies.iter().find(|r| r.agency == agency)
    }

    pub fn total_items(&self) -> usize {
        self.agencies.iter().map(|r| r.items.len()).sum()
    }
}
