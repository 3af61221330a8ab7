//! PMDA (医薬品医療機器総合機構) "新着情報" listing.
//!
//! The page at `/0017.html` is static. Every entry is an `<li>` inside
//! `ul.list__news` with separate `p.date`, `p.category` and `p.title`
//! paragraphs; dates are written `2025年10月8日`. PMDA is the only agency
//! that labels entries with a category, and recruitment (採用) and
//! procurement (調達) notices are excluded by default.

use super::strings;
use crate::config::{DetailSelectors, SelectorTable, SourceConfig};

pub const LISTING_URL: &str = "https://www.pmda.go.jp/0017.html";
pub const BASE_URL: &str = "https://www.pmda.go.jp";

/// Institutional blurbs that appear in the meta description and side bars of
/// every PMDA page.
const BOILERPLATE: &[&str] = &[
    "医薬品・医療機器・再生医療等製品の承認審査・安全対策・健康被害救済の3つの業務を行う組織",
    "独立行政法人 医薬品医療機器総合機構",
    "PMDAについて",
];

pub fn default_config() -> SourceConfig {
    SourceConfig {
        listing_url: LISTING_URL.to_string(),
        base_url: BASE_URL.to_string(),
        request_delay_ms: None,
        excluded_categories: strings(&["採用", "調達"]),
        min_title_chars: 10,
        selectors: SelectorTable {
            card: strings(&["ul.list__news li"]),
            title: strings(&["p.title"]),
            link: strings(&["a[href]"]),
            date: strings(&["p.date"]),
            category: strings(&["p.category"]),
            excerpt: Vec::new(),
            wait_for: None,
            link_include: Vec::new(),
            link_exclude: strings(&[
                "/english/",
                "/sitemap",
                "/contact",
                "/privacy",
                "/accessibility",
                "/site-policy",
                "/search",
                "/user/",
                "javascript:",
                "mailto:",
                "#",
                "apology_objects",
            ]),
        },
        detail: Some(DetailSelectors {
            content: strings(&[
                ".content p",
                ".article-content p",
                ".news-content p",
                ".main-content p",
                "article p",
                "main p",
            ]),
            ignore: strings(BOILERPLATE),
            ..DetailSelectors::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::cards::{CompiledSelectors, extract_cards, extract_detail};
    use url::Url;

    const LISTING: &str = r#"
<html><body>
<ul class="list__news">
  <li><a href="/safety/info-services/drugs/calling-attention/0001.html">
    <p class="date">2025年10月8日</p>
    <p class="category">安全対策業務</p>
    <p class="title">使用上の注意の改訂指示について（令和7年10月8日）</p>
  </a></li>
  <li><a href="/about-pmda/recruit/0123.html">
    <p class="date">2025年10月7日</p>
    <p class="category">採用</p>
    <p class="title">職員募集（技術系職員）のお知らせについて</p>
  </a></li>
  <li><a href="/english/index.html">
    <p class="date">2025年10月6日</p>
    <p class="title">English pages have been updated today</p>
  </a></li>
  <li><a href="/review-services/0099.html">
    <p class="date">2025年10月5日</p>
    <p class="title">短い</p>
  </a></li>
</ul>
</body></html>
"#;

    #[test]
    fn test_listing_cards() {
        let config = default_config();
        let selectors = CompiledSelectors::compile(&config.selectors, config.min_title_chars).unwrap();
        let base = Url::parse(BASE_URL).unwrap();
        let scan = extract_cards(LISTING, &selectors, &base);

        assert_eq!(scan.matched, 4);
        let first = scan.cards[0].as_ref().unwrap();
        assert_eq!(
            first.url,
            "https://www.pmda.go.jp/safety/info-services/drugs/calling-attention/0001.html"
        );
        assert_eq!(first.raw_date.as_deref(), Some("2025年10月8日"));
        assert_eq!(first.category.as_deref(), Some("安全対策業務"));

        // Category filtering happens later; the card itself is fine.
        let recruit = scan.cards[1].as_ref().unwrap();
        assert_eq!(recruit.category.as_deref(), Some("採用"));

        assert!(scan.cards[2].is_err(), "english pages are excluded");
        assert!(scan.cards[3].is_err(), "titles under 10 characters are noise");
    }

    #[test]
    fn test_detail_skips_boilerplate() {
        let html = r#"
<html><head>
<meta name="description" content="医薬品・医療機器・再生医療等製品の承認審査・安全対策・健康被害救済の3つの業務を行う組織です。">
</head><body><div class="content">
<p>独立行政法人 医薬品医療機器総合機構 からのお知らせです。これは定型文なので除外されます。</p>
<p>令和7年10月8日付けで、医療用医薬品の使用上の注意の改訂について指示が行われましたのでお知らせします。</p>
</div></body></html>
"#;
        let config = default_config();
        let detail = config.detail.unwrap();
        let compiled = crate::scrapers::cards::CompiledDetail::compile(&detail).unwrap();
        let seed = extract_detail(html, &compiled).unwrap();
        assert!(seed.starts_with("令和7年10月8日付けで"));
        assert!(!seed.contains("定型文"));
    }
}
