//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags; the WebDriver URL and
//! the OpenAI API key can also come from the environment.

use crate::models::Agency;
use clap::Parser;

/// Collect recent regulatory announcements and write per-agency digests.
///
/// # Examples
///
/// ```sh
/// # All agencies, last 7 days, digests under ./digests
/// regulatory_news
///
/// # Only the static sources, two weeks back, no summarization
/// regulatory_news -a ema,pmda -d 14 --no-summarize
///
/// # Browser sources against a remote Selenium server
/// regulatory_news -a fda,who --webdriver-url http://selenium:4444
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Agencies to scrape, comma separated
    #[arg(short, long, value_enum, value_delimiter = ',', default_values_t = Agency::ALL)]
    pub agencies: Vec<Agency>,

    /// Lookback window in days
    #[arg(short, long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=36500))]
    pub days: u32,

    /// Maximum listing cards converted per agency
    #[arg(short = 'n', long, default_value_t = 20)]
    pub max_items: usize,

    /// Output directory for the report and digests
    #[arg(short, long, default_value = "./digests")]
    pub output_dir: String,

    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// WebDriver endpoint (chromedriver, geckodriver or Selenium)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// OpenAI API key; without it digests are rendered locally
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Language for everything but article titles
    #[arg(long, default_value = "Japanese")]
    pub language: String,

    /// Style directive passed to the summarizer
    #[arg(long, default_value = "detailed summaries for regulatory affairs professionals")]
    pub style: String,

    /// Skip the summarizer and render digests locally
    #[arg(long)]
    pub no_summarize: bool,
}
