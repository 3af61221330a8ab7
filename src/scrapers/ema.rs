//! European Medicines Agency news listing.
//!
//! [EMA news](https://www.ema.europa.eu/en/news) is server-rendered with the
//! Europa Component Library, so each article is an `.ecl-card` (older
//! templates use `.ecl-content-item`) whose title links to `/en/news/...`.
//! The card meta line carries a `<time datetime>` element on current pages
//! and a plain `8 October 2025` on older ones.

use super::strings;
use crate::config::{DetailSelectors, SelectorTable, SourceConfig};

pub const LISTING_URL: &str = "https://www.ema.europa.eu/en/news";
pub const BASE_URL: &str = "https://www.ema.europa.eu";

pub fn default_config() -> SourceConfig {
    SourceConfig {
        listing_url: LISTING_URL.to_string(),
        base_url: BASE_URL.to_string(),
        request_delay_ms: None,
        excluded_categories: Vec::new(),
        min_title_chars: 1,
        selectors: SelectorTable {
            card: strings(&[".ecl-card", ".ecl-content-item", ".news-card", ".article-card"]),
            title: strings(&[
                ".ecl-card__title a",
                ".ecl-content-item__title a",
                ".news-title a",
                "h3 a",
                "h2 a",
            ]),
            link: strings(&[
                ".ecl-card__title a[href]",
                ".ecl-content-item__title a[href]",
                "a[href]",
            ]),
            date: strings(&[
                "time[datetime]",
                ".ecl-card__meta",
                ".ecl-content-item__meta",
                ".news-date",
                ".date",
            ]),
            category: Vec::new(),
            excerpt: strings(&[".ecl-card__description", ".ecl-content-item__description"]),
            wait_for: None,
            link_include: strings(&["/en/news/"]),
            link_exclude: Vec::new(),
        },
        detail: Some(DetailSelectors {
            content: strings(&[
                ".ecl-content-block__body p",
                ".ecl p",
                ".news-content p",
                "main p",
            ]),
            min_paragraph_chars: 50,
            ..DetailSelectors::default()
        }),
    }
}
