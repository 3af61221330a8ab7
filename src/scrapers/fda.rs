//! FDA guidance document search.
//!
//! The search page renders its results table client-side (an
//! `lcds-datatable` DataTables widget), so the listing needs a browser
//! session. Each `<tr>` is one guidance document: the summary link sits in
//! the focusable first cell and the issue date (`MM/DD/YYYY`) in the sorted
//! column. FDA's robots.txt asks for a 30 second crawl delay, which is the
//! default request delay for this source. Detail pages are not fetched.

use super::strings;
use crate::config::{SelectorTable, SourceConfig};

pub const LISTING_URL: &str =
    "https://www.fda.gov/regulatory-information/search-fda-guidance-documents";
pub const BASE_URL: &str = "https://www.fda.gov";
pub const CRAWL_DELAY_MS: u64 = 30_000;

pub fn default_config() -> SourceConfig {
    SourceConfig {
        listing_url: LISTING_URL.to_string(),
        base_url: BASE_URL.to_string(),
        request_delay_ms: Some(CRAWL_DELAY_MS),
        excluded_categories: Vec::new(),
        min_title_chars: 10,
        selectors: SelectorTable {
            card: strings(&["div.lcds-datatable tbody tr", "table tbody tr"]),
            title: strings(&[r#"td[tabindex="0"] a"#, "td a"]),
            link: strings(&[r#"td[tabindex="0"] a[href]"#, "td a[href]"]),
            date: strings(&["td.sorting_1", "td:nth-child(3)", "time[datetime]"]),
            category: Vec::new(),
            excerpt: Vec::new(),
            wait_for: Some("div.lcds-datatable tbody tr td a[href]".to_string()),
            link_include: strings(&["/search-fda-guidance-documents/"]),
            link_exclude: strings(&[".pdf", "/media/", "javascript:", "mailto:"]),
        },
        detail: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agency, CANONICAL_TZ};
    use crate::scrapers::cards::{CompiledSelectors, extract_cards};
    use chrono::TimeZone;
    use url::Url;

    const RENDERED: &str = r#"
<html><body><div class="lcds-datatable"><table><tbody>
  <tr>
    <td tabindex="0"><a href="/regulatory-information/search-fda-guidance-documents/e20-adaptive-designs-clinical-trials">E20 Adaptive Designs for Clinical Trials</a></td>
    <td><a href="/media/123/download">Download</a></td>
    <td class="sorting_1">10/08/2025</td>
    <td>Center for Drug Evaluation and Research</td>
  </tr>
  <tr>
    <td tabindex="0"><a href="/regulatory-information/search-fda-guidance-documents/real-world-evidence">Real-World Evidence: Considerations</a></td>
    <td>PDF</td>
    <td>09/30/2025</td>
  </tr>
</tbody></table></div></body></html>
"#;

    #[test]
    fn test_rendered_table_rows() {
        let config = default_config();
        let selectors = CompiledSelectors::compile(&config.selectors, config.min_title_chars).unwrap();
        let base = Url::parse(BASE_URL).unwrap();
        let scan = extract_cards(RENDERED, &selectors, &base);

        assert_eq!(scan.matched, 2);
        let first = scan.cards[0].as_ref().unwrap();
        assert_eq!(first.title, "E20 Adaptive Designs for Clinical Trials");
        assert_eq!(
            first.url,
            "https://www.fda.gov/regulatory-information/search-fda-guidance-documents/e20-adaptive-designs-clinical-trials"
        );
        assert_eq!(first.raw_date.as_deref(), Some("10/08/2025"));
        assert_eq!(
            crate::dates::parse("10/08/2025", Agency::Fda),
            Some(CANONICAL_TZ.with_ymd_and_hms(2025, 10, 8, 0, 0, 0).unwrap())
        );

        // No sorted column on this row, the third cell is used instead.
        let second = scan.cards[1].as_ref().unwrap();
        assert_eq!(second.raw_date.as_deref(), Some("09/30/2025"));
    }
}
