//! HTML digest pages.
//!
//! Summarized digests come back from the model as complete documents and are
//! written as-is. Every other page (no items, failed source, summarizer
//! unavailable, or a reply that was only a fragment) is rendered here from one
//! shared template. All scraped text is escaped before it is embedded.

use crate::digest::Digest;
use crate::models::{Agency, NewsItem, TimeWindow, Timestamp};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const STYLE: &str = r#"
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; margin: 0; padding: 20px; background-color: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
        .period, .notice { color: #7f8c8d; }
        .article { margin: 20px 0; padding: 15px; border-left: 4px solid #3498db; background: #f8f9fa; }
        .article h3 { margin: 0 0 10px 0; color: #2c3e50; }
        .article .date, .article .category { color: #7f8c8d; font-size: 0.9em; margin-bottom: 10px; }
        .article a { color: #3498db; text-decoration: none; }
        .error { padding: 15px; border-left: 4px solid #c0392b; background: #fdf2f2; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #ecf0f1; font-size: 0.9em; color: #7f8c8d; }
        ul { padding-left: 20px; }
"#;

/// "2025年10月08日"
fn format_date(ts: &Timestamp) -> String {
    ts.format("%Y年%m月%d日").to_string()
}

pub fn page_title(agency: Agency) -> String {
    format!("{} Summary", agency.display_name())
}

/// Shown when the window holds no items for `agency`.
pub fn empty_message(agency: Agency) -> &'static str {
    match agency {
        Agency::Ema => "指定期間内に新しい記事は見つかりませんでした。",
        Agency::Pmda => "指定期間内に新しい情報は見つかりませんでした。",
        Agency::Fda => "指定期間内に新しいガイダンス文書は見つかりませんでした。",
        Agency::Who => "指定期間内に新しいニュースは見つかりませんでした。",
    }
}

fn source_links(items: &[&NewsItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let links: String = items
        .iter()
        .map(|item| {
            format!(
                "\n                <li><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></li>",
                encode_double_quoted_attribute(item.url()),
                encode_text(item.title())
            )
        })
        .collect();
    format!("\n            <p>記事URL:</p>\n            <ul>{links}\n            </ul>")
}

fn document(agency: Agency, window: &TimeWindow, body: &str, items: &[&NewsItem]) -> String {
    let title = page_title(agency);
    format!(
        r#"<!DOCTYPE html>
<html lang="ja">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <p class="period">対象期間: {start} 〜 {end}</p>
{body}
        <div class="footer">
            <h3>{source}</h3>{links}
        </div>
    </div>
</body>
</html>
"#,
        start = format_date(&window.start),
        end = format_date(&window.end),
        source = encode_text(agency.data_source_label()),
        links = source_links(items),
    )
}

/// Page for an agency with no items in the window.
pub fn empty_page(agency: Agency, window: &TimeWindow) -> String {
    let body = format!("        <p class=\"notice\">{}</p>", empty_message(agency));
    document(agency, window, &body, &[])
}

/// Page for an agency whose listing could not be retrieved.
pub fn failure_page(agency: Agency, window: &TimeWindow, cause: &str) -> String {
    let body = format!(
        "        <div class=\"error\"><p>情報を取得できませんでした。</p><p>{}</p></div>",
        encode_text(cause)
    );
    document(agency, window, &body, &[])
}

/// Locally rendered digest: title, date, category, excerpt and link per item.
pub fn fallback_page(agency: Agency, window: &TimeWindow, items: &[&NewsItem]) -> String {
    if items.is_empty() {
        return empty_page(agency, window);
    }

    let mut body = String::new();
    for item in items {
        let date = item.published_at().map(|ts| format_date(&ts)).unwrap_or_default();
        body.push_str("        <div class=\"article\">\n");
        body.push_str(&format!("            <h3>{}</h3>\n", encode_text(item.title())));
        body.push_str(&format!("            <div class=\"date\">公開日: {date}</div>\n"));
        if let Some(category) = item.category() {
            body.push_str(&format!(
                "            <div class=\"category\">カテゴリ: {}</div>\n",
                encode_text(category)
            ));
        }
        if let Some(seed) = item.summary_seed() {
            body.push_str(&format!("            <div class=\"summary\">{}</div>\n", encode_text(seed)));
        }
        body.push_str(&format!(
            "            <a href=\"{}\" target=\"_blank\" rel=\"noopener\">記事を読む</a>\n",
            encode_double_quoted_attribute(item.url())
        ));
        body.push_str("        </div>\n");
    }
    document(agency, window, body.trim_end(), items)
}

/// Embed a model reply that was not a full document. The fragment is the
/// model's own HTML and is not escaped.
pub fn wrap_fragment(agency: Agency, window: &TimeWindow, fragment: &str, items: &[&NewsItem]) -> String {
    document(agency, window, fragment.trim(), items)
}

/// Write `digest` to `{dir}/{agency}.html`.
#[instrument(level = "info", skip_all, fields(agency = %digest.agency))]
pub async fn write_digest(digest: &Digest, dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.html", digest.agency.slug()));
    fs::write(&path, &digest.html).await?;
    info!(path = %path.display(), bytes = digest.html.len(), "Wrote digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CANONICAL_TZ;
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        TimeWindow::last_days(7, CANONICAL_TZ.with_ymd_and_hms(2025, 10, 10, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_empty_page_names_agency_and_period() {
        let html = empty_page(Agency::Fda, &window());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>FDA Guidance Summary</title>"));
        assert!(html.contains("指定期間内に新しいガイダンス文書は見つかりませんでした。"));
        assert!(html.contains("対象期間: 2025年10月03日 〜 2025年10月10日"));
        assert!(html.contains("Data source: U.S. Food and Drug Administration (FDA)"));
    }

    #[test]
    fn test_fallback_escapes_scraped_text() {
        let item = NewsItem::new(
            Agency::Ema,
            "Vaccines <script>alert(1)</script> & more",
            "https://www.ema.europa.eu/en/news/a?x=1&y=\"2\"",
            Some(CANONICAL_TZ.with_ymd_and_hms(2025, 10, 8, 0, 0, 0).unwrap()),
        )
        .with_summary_seed(Some("Lead <b>text</b>".to_string()));
        let html = fallback_page(Agency::Ema, &window(), &[&item]);

        assert!(!html.contains("<script>"));
        assert!(html.contains("Vaccines &lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
        assert!(html.contains("Lead &lt;b&gt;text&lt;/b&gt;"));
        assert!(html.contains("href=\"https://www.ema.europa.eu/en/news/a?x=1&amp;y=&quot;2&quot;\""));
        assert!(html.contains("公開日: 2025年10月08日"));
        assert!(html.contains("記事を読む"));
    }

    #[test]
    fn test_fallback_without_items_is_empty_page() {
        assert_eq!(fallback_page(Agency::Who, &window(), &[]), empty_page(Agency::Who, &window()));
    }

    #[test]
    fn test_failure_page_shows_cause() {
        let html = failure_page(Agency::Who, &window(), "browser automation unavailable: <refused>");
        assert!(html.contains("browser automation unavailable: &lt;refused&gt;"));
    }

    #[tokio::test]
    async fn test_write_digest() {
        let dir = std::env::temp_dir().join(format!("regulatory_news_html_{}", std::process::id()));
        let digest = Digest {
            agency: Agency::Pmda,
            html: empty_page(Agency::Pmda, &window()),
            outcome: crate::digest::DigestOutcome::Empty,
        };
        let path = write_digest(&digest, &dir).await.unwrap();
        assert_eq!(path, dir.join("pmda.html"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("指定期間内に新しい情報は見つかりませんでした。"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
