//! WHO newsroom.
//!
//! `https://www.who.int/news` loads its article list with JavaScript into a
//! `div.hubfiltering` widget, so the listing is rendered in a browser and the
//! adapter waits for the first list item to appear. Items carry the date in
//! a `span.timestamp` (`8 October 2025`). Article pages themselves are
//! static and fetched over plain HTTP for the summary seed.

use super::strings;
use crate::config::{DetailSelectors, SelectorTable, SourceConfig};

pub const LISTING_URL: &str = "https://www.who.int/news";
pub const BASE_URL: &str = "https://www.who.int";

pub fn default_config() -> SourceConfig {
    SourceConfig {
        listing_url: LISTING_URL.to_string(),
        base_url: BASE_URL.to_string(),
        request_delay_ms: None,
        excluded_categories: Vec::new(),
        min_title_chars: 10,
        selectors: SelectorTable {
            card: strings(&[
                "div.hubfiltering div.list-view--item",
                "div.hubfiltering div.vertical-list-item",
                r#"div.hubfiltering div[class*="list-view--item"]"#,
            ]),
            title: strings(&["p.heading", ".heading", "h3"]),
            link: strings(&["a[href]"]),
            date: strings(&[
                "div.table-cell.info span.timestamp",
                "span.timestamp",
                ".timestamp",
                ".date",
            ]),
            category: Vec::new(),
            excerpt: Vec::new(),
            wait_for: Some(r#"div.hubfiltering [class*="list-view--item"] a[href]"#.to_string()),
            link_include: strings(&["/news/"]),
            link_exclude: strings(&["javascript:", "mailto:"]),
        },
        detail: Some(DetailSelectors {
            content: strings(&[
                ".sf-detail-body-wrapper p",
                "article p",
                ".content p",
                "main p",
            ]),
            ..DetailSelectors::default()
        }),
    }
}
