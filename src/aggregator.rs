//! Runs the selected source adapters and assembles the per-run report.

use crate::config::AppConfig;
use crate::filter::filter;
use crate::models::{AgencyReport, AgencyStatus, AggregateReport, Agency, CANONICAL_TZ, Rendering, TimeWindow};
use crate::scrapers::adapter::SourceAdapter;
use crate::scrapers::fetch::PageFetcher;
use crate::scrapers::renderer::PageRenderer;
use chrono::Utc;
use itertools::Itertools;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Owns the page capabilities and applies configuration to every adapter.
pub struct Aggregator<'a, F, R> {
    config: &'a AppConfig,
    fetcher: F,
    renderer: R,
}

impl<'a, F, R> Aggregator<'a, F, R>
where
    F: PageFetcher,
    R: PageRenderer,
{
    pub fn new(config: &'a AppConfig, fetcher: F, renderer: R) -> Self {
        Self {
            config,
            fetcher,
            renderer,
        }
    }

    /// Scrape `agencies` one after another and filter their items to `window`.
    ///
    /// Every selected agency gets exactly one [`AgencyReport`], in selection
    /// order. A failing agency is reported as such and the run moves on. Once
    /// the browser driver has been found missing, later browser-rendered
    /// agencies are marked failed without contacting it again.
    #[instrument(level = "info", skip_all, fields(agencies = ?agencies, max_items))]
    pub async fn run(&self, agencies: &[Agency], window: &TimeWindow, max_items: usize) -> AggregateReport {
        let t0 = Instant::now();
        let mut fatal: Option<String> = None;
        let mut reports = Vec::with_capacity(agencies.len());
        let wait_timeout = Duration::from_secs(self.config.renderer.wait_timeout_secs);

        for &agency in agencies.iter().unique() {
            let source = self.config.sources.get(agency);

            if agency.rendering() == Rendering::Browser {
                if let Some(reason) = &fatal {
                    warn!(%agency, "Skipping browser-rendered source; renderer unavailable");
                    reports.push(AgencyReport {
                        agency,
                        status: AgencyStatus::Failed {
                            cause: format!("not attempted: {reason}"),
                        },
                        items: Vec::new(),
                    });
                    continue;
                }
            }

            let mut adapter = SourceAdapter::new(
                agency,
                source,
                &self.fetcher,
                &self.renderer,
                source.request_delay(&self.config.http),
                wait_timeout,
            );
            let outcome = adapter.fetch(window, max_items).await;

            let report = match outcome.failure {
                Some(e) => {
                    if e.is_resource_exhaustion() && fatal.is_none() {
                        error!(%agency, error = %e, "Browser automation unavailable for this run");
                        fatal = Some(e.to_string());
                    }
                    AgencyReport {
                        agency,
                        status: AgencyStatus::Failed { cause: e.to_string() },
                        items: Vec::new(),
                    }
                }
                None => {
                    let kept = filter(&outcome.items, window, &source.excluded_categories);
                    let discarded = outcome.items.len() - kept.len();
                    info!(%agency, kept = kept.len(), discarded, "Agency complete");
                    AgencyReport {
                        agency,
                        status: AgencyStatus::Ok { discarded },
                        items: kept,
                    }
                }
            };
            reports.push(report);
        }

        let report = AggregateReport {
            window: *window,
            generated_at: Utc::now().with_timezone(&*CANONICAL_TZ),
            agencies: reports,
            fatal,
        };
        let failed = report.agencies.iter().filter(|r| r.is_failed()).count();
        info!(
            total_items = report.total_items(),
            failed,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Aggregation finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::adapter::tests::{FakeFetcher, FakeRenderer, LISTING, LISTING_URL, source_config, window};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        for source in [
            &mut config.sources.ema,
            &mut config.sources.pmda,
            &mut config.sources.fda,
            &mut config.sources.who,
        ] {
            *source = source_config(None);
        }
        config.sources.pmda.excluded_categories = vec!["採用".to_string()];
        config
    }

    #[tokio::test]
    async fn test_one_failing_agency_does_not_stop_the_others() {
        let mut config = config();
        config.sources.ema.listing_url = "https://agency.test/broken".to_string();
        let aggregator = Aggregator::new(
            &config,
            FakeFetcher::default().with_page(LISTING_URL, LISTING),
            FakeRenderer::serving(LISTING),
        );

        let report = aggregator.run(&Agency::ALL, &window(), 20).await;
        assert_eq!(report.agencies.len(), 4);
        assert!(report.fatal.is_none());

        let ema = report.get(Agency::Ema).unwrap();
        assert!(ema.is_failed());
        assert!(ema.items.is_empty());

        // In-window, dated, not excluded: /n/1 only for PMDA, /n/1 and /n/3 elsewhere.
        let pmda = report.get(Agency::Pmda).unwrap();
        assert_eq!(pmda.items.len(), 1);
        assert_eq!(pmda.status, AgencyStatus::Ok { discarded: 3 });
        for agency in [Agency::Fda, Agency::Who] {
            let r = report.get(agency).unwrap();
            assert_eq!(r.status, AgencyStatus::Ok { discarded: 2 });
            assert_eq!(r.items.len(), 2);
        }
        assert_eq!(report.total_items(), 5);
    }

    #[tokio::test]
    async fn test_missing_renderer_is_reported_once() {
        let config = config();
        let renderer = FakeRenderer::unavailable();
        let aggregator = Aggregator::new(
            &config,
            FakeFetcher::default().with_page(LISTING_URL, LISTING),
            renderer,
        );

        let report = aggregator.run(&Agency::ALL, &window(), 20).await;
        assert!(report.fatal.as_deref().unwrap().contains("connection refused"));
        assert_eq!(aggregator.renderer.call_count(), 1);

        assert!(!report.get(Agency::Ema).unwrap().is_failed());
        assert!(!report.get(Agency::Pmda).unwrap().is_failed());
        assert!(report.get(Agency::Fda).unwrap().is_failed());
        match &report.get(Agency::Who).unwrap().status {
            AgencyStatus::Failed { cause } => assert!(cause.starts_with("not attempted")),
            other => panic!("expected WHO to be skipped, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_selection_order_and_duplicates() {
        let config = config();
        let aggregator = Aggregator::new(
            &config,
            FakeFetcher::default().with_page(LISTING_URL, LISTING),
            FakeRenderer::serving(LISTING),
        );

        let report = aggregator
            .run(&[Agency::Who, Agency::Ema, Agency::Who], &window(), 20)
            .await;
        let order: Vec<Agency> = report.agencies.iter().map(|r| r.agency).collect();
        assert_eq!(order, vec![Agency::Who, Agency::Ema]);
        assert_eq!(report.window, window());
    }
}
