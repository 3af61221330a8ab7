//! The per-agency source adapter.
//!
//! [`SourceAdapter::fetch`] retrieves one listing page, extracts its cards and
//! turns each into a [`NewsItem`]. A broken card is logged and skipped; a
//! broken page yields an empty item list together with the cause. Nothing in
//! here panics or returns early for the whole run.

use super::cards::{CompiledDetail, CompiledSelectors, extract_cards, extract_detail, extract_detail_dates};
use super::fetch::PageFetcher;
use super::renderer::{PageRenderer, RenderRequest};
use crate::config::SourceConfig;
use crate::dates;
use crate::error::{ItemExtractionError, ScrapeError};
use crate::models::{Agency, NewsItem, RawCard, Rendering, TimeWindow};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Minimum spacing between consecutive requests from one adapter.
#[derive(Debug)]
pub struct Politeness {
    interval: Duration,
    last: Option<Instant>,
}

impl Politeness {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Sleep until `interval` has passed since the previous call.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready = last + self.interval;
            let now = Instant::now();
            if ready > now {
                debug!(delay_ms = (ready - now).as_millis() as u64, "Politeness delay");
                sleep_until(ready).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Everything one adapter invocation produced.
#[derive(Debug)]
pub struct SourceOutcome {
    /// Converted items in page order. Undated items are included.
    pub items: Vec<NewsItem>,
    /// Set when the listing itself could not be used.
    pub failure: Option<ScrapeError>,
}

pub struct SourceAdapter<'a, F, R> {
    agency: Agency,
    config: &'a SourceConfig,
    fetcher: &'a F,
    renderer: &'a R,
    politeness: Politeness,
    wait_timeout: Duration,
}

impl<'a, F, R> SourceAdapter<'a, F, R>
where
    F: PageFetcher,
    R: PageRenderer,
{
    pub fn new(
        agency: Agency,
        config: &'a SourceConfig,
        fetcher: &'a F,
        renderer: &'a R,
        request_delay: Duration,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            agency,
            config,
            fetcher,
            renderer,
            politeness: Politeness::new(request_delay),
            wait_timeout,
        }
    }

    /// Fetch up to `max_items` items from the agency's listing.
    ///
    /// `window` is only used to decide which cards deserve a detail-page
    /// request (in-window or undated ones); window filtering itself happens
    /// downstream.
    #[instrument(level = "info", skip_all, fields(agency = %self.agency))]
    pub async fn fetch(&mut self, window: &TimeWindow, max_items: usize) -> SourceOutcome {
        match self.try_fetch(window, max_items).await {
            Ok(items) => SourceOutcome {
                items,
                failure: None,
            },
            Err(e) => {
                error!(error = %e, url = %self.config.listing_url, "Source failed");
                SourceOutcome {
                    items: Vec::new(),
                    failure: Some(e),
                }
            }
        }
    }

    async fn try_fetch(&mut self, window: &TimeWindow, max_items: usize) -> Result<Vec<NewsItem>, ScrapeError> {
        let selectors = CompiledSelectors::compile(&self.config.selectors, self.config.min_title_chars)?;
        let detail = self
            .config
            .detail
            .as_ref()
            .map(CompiledDetail::compile)
            .transpose()?;

        let base_text = if self.config.base_url.is_empty() {
            &self.config.listing_url
        } else {
            &self.config.base_url
        };
        let base = Url::parse(base_text).map_err(|e| ScrapeError::SourceUnavailable {
            url: self.config.listing_url.clone(),
            reason: format!("invalid base url `{base_text}`: {e}"),
        })?;

        let html = self.retrieve_listing().await?;
        let scan = extract_cards(&html, &selectors, &base);
        if scan.matched == 0 {
            return Err(ScrapeError::SourceUnavailable {
                url: self.config.listing_url.clone(),
                reason: format!("no cards matched {:?}", self.config.selectors.card),
            });
        }
        info!(matched = scan.matched, max_items, "Located listing cards");

        let mut items = Vec::new();
        let mut skipped = 0usize;
        for (index, card) in scan.cards.into_iter().take(max_items).enumerate() {
            let converted = match card {
                Ok(card) => self.convert(card, window, detail.as_ref()).await,
                Err(e) => Err(e),
            };
            match converted {
                Ok(item) => items.push(item),
                Err(e) => {
                    skipped += 1;
                    warn!(index, error = %e, "Skipping card");
                }
            }
        }

        info!(count = items.len(), skipped, "Extracted items");
        Ok(items)
    }

    async fn retrieve_listing(&mut self) -> Result<String, ScrapeError> {
        self.politeness.wait().await;
        let url = self.config.listing_url.as_str();
        match self.agency.rendering() {
            Rendering::Static => self.fetcher.fetch(url).await,
            Rendering::Browser => {
                let request = RenderRequest {
                    url,
                    wait_for: self.config.selectors.wait_for.as_deref(),
                    timeout: self.wait_timeout,
                };
                self.renderer.render(&request).await
            }
        }
    }

    async fn convert(
        &mut self,
        card: RawCard,
        window: &TimeWindow,
        detail: Option<&CompiledDetail>,
    ) -> Result<NewsItem, ItemExtractionError> {
        let mut published_at = card
            .raw_date
            .as_deref()
            .and_then(|raw| dates::parse(raw, self.agency));
        if published_at.is_none() {
            debug!(url = %card.url, raw_date = ?card.raw_date, "No usable date on card");
        }

        let mut seed = card.excerpt;
        // Undated cards may still find their date on the article page.
        let wanted = published_at.is_none_or(|ts| window.contains(&ts));
        if let Some(detail) = detail.filter(|_| wanted) {
            self.politeness.wait().await;
            let page = self
                .fetcher
                .fetch(&card.url)
                .await
                .map_err(|e| ItemExtractionError::DetailFetch {
                    url: card.url.clone(),
                    reason: e.to_string(),
                })?;
            if published_at.is_none() {
                published_at = extract_detail_dates(&page, detail)
                    .iter()
                    .find_map(|raw| dates::parse(raw, self.agency));
                debug!(url = %card.url, found = published_at.is_some(), "Date from article page");
            }
            if let Some(text) = extract_detail(&page, detail) {
                seed = Some(text);
            }
        }

        Ok(NewsItem::new(self.agency, card.title, card.url, published_at)
            .with_category(card.category)
            .with_summary_seed(seed))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{DetailSelectors, SelectorTable};
    use crate::models::CANONICAL_TZ;
    use crate::scrapers::strings;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves fixture pages; unknown URLs answer 404.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        pages: HashMap<String, String>,
        pub(crate) requests: Mutex<Vec<(String, std::time::Instant)>>,
    }

    impl FakeFetcher {
        pub(crate) fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), std::time::Instant::now()));
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScrapeError::UnexpectedStatus {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    /// Either serves one page for every request or behaves like a missing driver.
    pub(crate) struct FakeRenderer {
        html: Option<String>,
        pub(crate) calls: AtomicUsize,
    }

    impl FakeRenderer {
        pub(crate) fn serving(html: &str) -> Self {
            Self {
                html: Some(html.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn unavailable() -> Self {
            Self {
                html: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PageRenderer for FakeRenderer {
        async fn render(&self, request: &RenderRequest<'_>) -> Result<String, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.html {
                Some(html) => Ok(html.clone()),
                None => Err(ScrapeError::RendererUnavailable {
                    reason: format!("connection refused while rendering {}", request.url),
                }),
            }
        }
    }

    pub(crate) const LISTING_URL: &str = "https://agency.test/news";

    pub(crate) fn source_config(detail: Option<DetailSelectors>) -> SourceConfig {
        SourceConfig {
            listing_url: LISTING_URL.to_string(),
            base_url: "https://agency.test".to_string(),
            request_delay_ms: Some(0),
            excluded_categories: Vec::new(),
            min_title_chars: 5,
            selectors: SelectorTable {
                card: strings(&["li.news"]),
                title: strings(&["a"]),
                link: strings(&["a[href]"]),
                date: strings(&["span.date"]),
                category: strings(&["span.cat"]),
                excerpt: strings(&["p"]),
                wait_for: Some("li.news".to_string()),
                link_include: Vec::new(),
                link_exclude: Vec::new(),
            },
            detail,
        }
    }

    pub(crate) const LISTING: &str = r#"<ul>
        <li class="news"><a href="/n/1">Safety update for product A</a><span class="date">2025-10-08</span><span class="cat">安全性</span><p>Excerpt one</p></li>
        <li class="news"><span class="date">2025-10-08</span>no link on this card</li>
        <li class="news"><a href="/n/3">Recruitment notice 2025</a><span class="date">2025-10-07</span><span class="cat">採用</span></li>
        <li class="news"><a href="/n/4">Notice with an odd date</a><span class="date">soon</span></li>
        <li class="news"><a href="/n/5">Archived notice from 2024</a><span class="date">2024-01-05</span></li>
    </ul>"#;

    pub(crate) fn window() -> TimeWindow {
        TimeWindow::last_days(7, CANONICAL_TZ.with_ymd_and_hms(2025, 10, 10, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_cards_are_isolated_and_page_order_kept() {
        let fetcher = FakeFetcher::default().with_page(LISTING_URL, LISTING);
        let renderer = FakeRenderer::unavailable();
        let config = source_config(None);
        let mut adapter = SourceAdapter::new(
            Agency::Pmda,
            &config,
            &fetcher,
            &renderer,
            Duration::ZERO,
            Duration::from_secs(1),
        );

        let outcome = adapter.fetch(&window(), 20).await;
        assert!(outcome.failure.is_none());
        let urls: Vec<&str> = outcome.items.iter().map(|i| i.url()).collect();
        assert_eq!(
            urls,
            vec![
                "https://agency.test/n/1",
                "https://agency.test/n/3",
                "https://agency.test/n/4",
                "https://agency.test/n/5",
            ]
        );
        assert_eq!(outcome.items[0].category(), Some("安全性"));
        assert_eq!(outcome.items[0].summary_seed(), Some("Excerpt one"));
        assert_eq!(outcome.items[2].published_at(), None);
        assert_eq!(renderer.call_count(), 0, "static sources never touch the browser");
    }

    #[tokio::test]
    async fn test_zero_cards_is_empty_with_failure() {
        let fetcher = FakeFetcher::default().with_page(LISTING_URL, "<html><body>Maintenance</body></html>");
        let renderer = FakeRenderer::unavailable();
        let config = source_config(None);
        let mut adapter =
            SourceAdapter::new(Agency::Ema, &config, &fetcher, &renderer, Duration::ZERO, Duration::from_secs(1));

        let outcome = adapter.fetch(&window(), 20).await;
        assert!(outcome.items.is_empty());
        assert!(matches!(outcome.failure, Some(ScrapeError::SourceUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_empty_with_failure() {
        let fetcher = FakeFetcher::default();
        let renderer = FakeRenderer::unavailable();
        let config = source_config(None);
        let mut adapter =
            SourceAdapter::new(Agency::Ema, &config, &fetcher, &renderer, Duration::ZERO, Duration::from_secs(1));

        let outcome = adapter.fetch(&window(), 20).await;
        assert!(outcome.items.is_empty());
        assert!(matches!(outcome.failure, Some(ScrapeError::UnexpectedStatus { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_browser_sources_use_renderer() {
        let fetcher = FakeFetcher::default();
        let renderer = FakeRenderer::serving(LISTING);
        let config = source_config(None);
        let mut adapter =
            SourceAdapter::new(Agency::Who, &config, &fetcher, &renderer, Duration::ZERO, Duration::from_secs(1));

        let outcome = adapter.fetch(&window(), 2).await;
        assert_eq!(renderer.call_count(), 1);
        assert!(fetcher.requested().is_empty());
        // Capped before conversion: the second card fails, so one item is left.
        assert_eq!(outcome.items.len(), 1);
    }

    #[tokio::test]
    async fn test_detail_fetch_only_in_window_and_failure_skips_card() {
        let detail_page = r#"<html><head><meta name="description" content="Detailed lead for product A."></head></html>"#;
        let fetcher = FakeFetcher::default()
            .with_page(LISTING_URL, LISTING)
            .with_page("https://agency.test/n/1", detail_page);
        let renderer = FakeRenderer::unavailable();
        let config = source_config(Some(DetailSelectors::default()));
        let mut adapter =
            SourceAdapter::new(Agency::Pmda, &config, &fetcher, &renderer, Duration::ZERO, Duration::from_secs(1));

        let outcome = adapter.fetch(&window(), 20).await;
        assert!(outcome.failure.is_none());

        // /n/3 and the undated /n/4 have no detail page: only those cards go.
        let urls: Vec<&str> = outcome.items.iter().map(|i| i.url()).collect();
        assert_eq!(urls, vec!["https://agency.test/n/1", "https://agency.test/n/5"]);
        assert_eq!(outcome.items[0].summary_seed(), Some("Detailed lead for product A."));

        // Out-of-window cards never cost a request.
        assert_eq!(
            fetcher.requested(),
            vec![
                LISTING_URL,
                "https://agency.test/n/1",
                "https://agency.test/n/3",
                "https://agency.test/n/4",
            ]
        );
    }

    #[tokio::test]
    async fn test_undated_card_takes_date_from_article_page() {
        let dated_page = r#"<html><body><article><time datetime="2025-10-09T10:00:00+09:00">9 October</time>
            <p>Body paragraph long enough to become the seed text.</p></article></body></html>"#;
        let undated_page = "<html><body><article><p>Nothing that looks like a date here at all.</p></article></body></html>";
        let fetcher = FakeFetcher::default()
            .with_page(LISTING_URL, LISTING)
            .with_page("https://agency.test/n/1", undated_page)
            .with_page("https://agency.test/n/3", undated_page)
            .with_page("https://agency.test/n/4", dated_page);
        let renderer = FakeRenderer::unavailable();
        let config = source_config(Some(DetailSelectors::default()));
        let mut adapter =
            SourceAdapter::new(Agency::Pmda, &config, &fetcher, &renderer, Duration::ZERO, Duration::from_secs(1));

        let outcome = adapter.fetch(&window(), 20).await;
        let n4 = outcome
            .items
            .iter()
            .find(|i| i.url() == "https://agency.test/n/4")
            .unwrap();
        assert_eq!(
            n4.published_at(),
            Some(CANONICAL_TZ.with_ymd_and_hms(2025, 10, 9, 10, 0, 0).unwrap())
        );
        assert_eq!(n4.summary_seed(), Some("Body paragraph long enough to become the seed text."));
        // The listing date still wins when present.
        let n1 = &outcome.items[0];
        assert_eq!(n1.published_at(), Some(CANONICAL_TZ.with_ymd_and_hms(2025, 10, 8, 0, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn test_undated_card_without_article_date_stays_undated() {
        let page = "<html><body><article><p>Nothing that looks like a date here at all.</p></article></body></html>";
        let fetcher = FakeFetcher::default()
            .with_page(LISTING_URL, LISTING)
            .with_page("https://agency.test/n/1", page)
            .with_page("https://agency.test/n/3", page)
            .with_page("https://agency.test/n/4", page);
        let renderer = FakeRenderer::unavailable();
        let config = source_config(Some(DetailSelectors::default()));
        let mut adapter =
            SourceAdapter::new(Agency::Pmda, &config, &fetcher, &renderer, Duration::ZERO, Duration::from_secs(1));

        let outcome = adapter.fetch(&window(), 20).await;
        let n4 = outcome
            .items
            .iter()
            .find(|i| i.url() == "https://agency.test/n/4")
            .unwrap();
        assert_eq!(n4.published_at(), None);
    }

    #[tokio::test]
    async fn test_politeness_delay_between_requests() {
        let detail_page = r#"<html><body><article><p>A paragraph long enough to be used as the seed text.</p></article></body></html>"#;
        let fetcher = FakeFetcher::default()
            .with_page(LISTING_URL, LISTING)
            .with_page("https://agency.test/n/1", detail_page)
            .with_page("https://agency.test/n/3", detail_page)
            .with_page("https://agency.test/n/4", detail_page);
        let renderer = FakeRenderer::unavailable();
        let config = source_config(Some(DetailSelectors::default()));
        let delay = Duration::from_millis(60);
        let mut adapter =
            SourceAdapter::new(Agency::Pmda, &config, &fetcher, &renderer, delay, Duration::from_secs(1));

        adapter.fetch(&window(), 20).await;

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 4);
        // The fetcher clock is read slightly after the politeness clock.
        let tolerance = Duration::from_millis(5);
        for pair in requests.windows(2) {
            assert!(pair[1].1.duration_since(pair[0].1) + tolerance >= delay);
        }
    }
}
