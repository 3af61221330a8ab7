//! # Regulatory News
//!
//! A batch pipeline that collects recent announcements from drug regulatory
//! agencies, normalizes them into one record shape, and renders a translated
//! HTML digest per agency.
//!
//! ## Sources
//!
//! - EMA news and PMDA 新着情報 (static HTML)
//! - FDA guidance documents and WHO news (JavaScript-rendered, via WebDriver)
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=... regulatory_news -a ema,pmda,fda,who -d 7 -o ./digests
//! ```
//!
//! ## Architecture
//!
//! 1. **Scraping**: each agency's listing is fetched and its cards extracted
//!    (sequentially, with per-source politeness delays)
//! 2. **Normalization**: dates are parsed into Asia/Tokyo instants; items are
//!    filtered to the lookback window, excluded categories and unique URLs
//! 3. **Summarization**: one prompt per agency to an OpenAI-compatible API
//!    (4 at a time), with a local rendering when it is unavailable
//! 4. **Output**: `report.json` plus one HTML digest per agency

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod api;
mod cli;
mod config;
mod dates;
mod digest;
mod error;
mod filter;
mod models;
mod outputs;
mod scrapers;
mod utils;

use aggregator::Aggregator;
use api::{OpenAiChat, RetryAsk};
use cli::Cli;
use digest::{DigestOutcome, SummaryDirective, render_all};
use models::{CANONICAL_TZ, TimeWindow};
use outputs::{edition_dir, html, json};
use scrapers::fetch::HttpFetcher;
use scrapers::renderer::WebDriverRenderer;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("regulatory_news starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(agencies = ?args.agencies, days = args.days, max_items = args.max_items, output_dir = %args.output_dir, "Parsed CLI arguments");

    let mut config = config::load(args.config.as_deref())?;
    if let Some(url) = &args.webdriver_url {
        config.renderer.webdriver_url = url.clone();
    }

    // Early check: ensure output dir is writable before any network work
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let now = Utc::now().with_timezone(&*CANONICAL_TZ);
    let window = TimeWindow::last_days(args.days, now);
    info!(start = %window.start, end = %window.end, "Lookback window");

    // ---- Scrape ----
    let fetcher = HttpFetcher::new(&config.http)?;
    let renderer = WebDriverRenderer::new(&config.renderer, &config.http.user_agent)?;
    let aggregator = Aggregator::new(&config, fetcher, renderer);
    let report = aggregator.run(&args.agencies, &window, args.max_items).await;
    if let Some(fatal) = &report.fatal {
        warn!(%fatal, "Browser-rendered sources were skipped");
    }

    let out_dir = edition_dir(&args.output_dir, &report.generated_at);
    if let Err(e) = json::write_report(&report, &out_dir).await {
        error!(error = %e, "Failed to write JSON report");
    }

    // ---- Summarize ----
    let summarizer = match (&args.openai_api_key, args.no_summarize) {
        (_, true) => {
            info!("Summarization disabled; rendering digests locally");
            None
        }
        (None, false) => {
            warn!("OPENAI_API_KEY not set; rendering digests locally");
            None
        }
        (Some(key), false) => {
            let client = OpenAiChat::new(&config.summarizer, key.clone())?;
            Some(RetryAsk::new(
                client,
                config.summarizer.max_retries,
                Duration::from_secs(1),
            ))
        }
    };
    let directive = SummaryDirective {
        language: args.language.clone(),
        style: args.style.clone(),
    };
    let digests = render_all(
        &report,
        summarizer.as_ref(),
        &directive,
        config.summarizer.concurrency,
    )
    .await;

    // ---- HTML output ----
    for digest in &digests {
        if let DigestOutcome::Fallback { error: Some(e) } = &digest.outcome {
            warn!(agency = %digest.agency, error = %e, "Digest rendered without summarizer");
        }
        if let Err(e) = html::write_digest(digest, &out_dir).await {
            error!(agency = %digest.agency, error = %e, "Failed writing digest");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        items = report.total_items(),
        output = %out_dir.display(),
        "Execution complete"
    );

    Ok(())
}
