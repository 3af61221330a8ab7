//! Window, category and duplicate filtering for normalized items.

use crate::models::{NewsItem, TimeWindow};
use itertools::Itertools;
use tracing::debug;

/// Keep the items that belong in a digest.
///
/// An item is retained iff its `published_at` is present and inside `window`
/// (both ends inclusive) and its category is either absent or not listed in
/// `excluded_categories` (exact string match). Relative input order is
/// preserved, and for repeated URLs only the first occurrence survives.
pub fn filter(items: &[NewsItem], window: &TimeWindow, excluded_categories: &[String]) -> Vec<NewsItem> {
    let kept: Vec<NewsItem> = items
        .iter()
        .filter(|item| item.is_valid())
        .filter(|item| item.published_at().is_some_and(|ts| window.contains(&ts)))
        .filter(|item| match item.category() {
            Some(category) => !excluded_categories.iter().any(|c| c == category),
            None => true,
        })
        .unique_by(|item| item.url().to_string())
        .cloned()
        .collect();

    debug!(
        input = items.len(),
        kept = kept.len(),
        dropped = items.len() - kept.len(),
        "Filtered items"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agency, CANONICAL_TZ, Timestamp};
    use chrono::TimeZone;

    fn tokyo(y: i32, m: u32, d: u32) -> Timestamp {
        CANONICAL_TZ.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn item(url: &str, title: &str, at: Option<Timestamp>) -> NewsItem {
        NewsItem::new(Agency::Pmda, title, url, at)
    }

    fn window() -> TimeWindow {
        TimeWindow::last_days(7, tokyo(2025, 10, 10))
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        assert!(filter(&[], &window(), &[]).is_empty());
    }

    #[test]
    fn test_window_scenario_keeps_order() {
        let items = vec![
            item("https://a/1", "first", Some(tokyo(2025, 10, 9))),
            item("https://a/2", "too old", Some(tokyo(2025, 9, 1))),
            item("https://a/3", "second", Some(tokyo(2025, 10, 4))),
        ];
        let kept = filter(&items, &window(), &[]);
        let titles: Vec<&str> = kept.iter().map(|i| i.title()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let w = window();
        let items = vec![
            item("https://a/start", "start", Some(w.start)),
            item("https://a/end", "end", Some(w.end)),
            item("https://a/future", "future", Some(tokyo(2025, 10, 11))),
        ];
        let kept = filter(&items, &w, &[]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|i| w.contains(&i.published_at().unwrap())));
    }

    #[test]
    fn test_undated_items_are_dropped() {
        let items = vec![item("https://a/1", "undated", None)];
        assert!(filter(&items, &window(), &[]).is_empty());
    }

    #[test]
    fn test_duplicate_url_keeps_first_seen() {
        let items = vec![
            item("https://a/same", "original title", Some(tokyo(2025, 10, 8))),
            item("https://a/same", "updated title", Some(tokyo(2025, 10, 9))),
        ];
        let kept = filter(&items, &window(), &[]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title(), "original title");
    }

    #[test]
    fn test_duplicate_outside_window_does_not_shadow_later_copy() {
        let items = vec![
            item("https://a/same", "stale", Some(tokyo(2025, 8, 1))),
            item("https://a/same", "fresh", Some(tokyo(2025, 10, 9))),
        ];
        let kept = filter(&items, &window(), &[]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title(), "fresh");
    }

    #[test]
    fn test_category_exclusion_is_exact() {
        let at = Some(tokyo(2025, 10, 8));
        let items = vec![
            item("https://a/1", "recruitment", at).with_category(Some("採用".to_string())),
            item("https://a/2", "safety", at).with_category(Some("安全対策".to_string())),
            item("https://a/3", "uncategorized", at),
            item("https://a/4", "near miss", at).with_category(Some("採用情報".to_string())),
            item("https://a/5", "procurement", at).with_category(Some("調達".to_string())),
        ];
        let excluded = vec!["採用".to_string(), "調達".to_string()];
        let kept = filter(&items, &window(), &excluded);
        let titles: Vec<&str> = kept.iter().map(|i| i.title()).collect();
        assert_eq!(titles, vec!["safety", "uncategorized", "near miss"]);
    }

    #[test]
    fn test_input_is_untouched() {
        let items = vec![
            item("https://a/1", "kept", Some(tokyo(2025, 10, 8))),
            item("https://a/2", "dropped", None),
        ];
        let before = items.clone();
        let _ = filter(&items, &window(), &[]);
        assert_eq!(items, before);
    }
}
