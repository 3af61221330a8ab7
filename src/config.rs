//! Runtime configuration.
//!
//! Everything that depends on the layout of an agency's website lives here as
//! data: listing URLs, selector tables, link rules and politeness delays. A
//! layout change on one of the sites should only ever need a config edit.
//!
//! The configuration is an optional YAML file layered over built-in defaults.
//! Each top-level section (and each agency under `sources`) may be omitted;
//! an agency block that *is* present replaces that agency's defaults as a
//! whole, with unspecified fields taking their generic defaults.
//!
//! ```yaml
//! http:
//!   request_delay_ms: 2000
//! renderer:
//!   webdriver_url: http://localhost:4444
//!   browser: firefox
//! sources:
//!   pmda:
//!     listing_url: https://www.pmda.go.jp/0017.html
//!     base_url: https://www.pmda.go.jp
//!     excluded_categories: [採用, 調達, イベント]
//!     selectors:
//!       card: ["ul.list__news li"]
//!       title: ["p.title"]
//!       link: ["a[href]"]
//!       date: ["p.date"]
//!       category: ["p.category"]
//! ```

use crate::error::ConfigError;
use crate::models::Agency;
use crate::scrapers::{ema, fda, pmda, who};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub renderer: RendererConfig,
    pub summarizer: SummarizerConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Minimum gap between two requests issued by the same adapter.
    pub request_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            request_delay_ms: 1500,
        }
    }
}

/// Connection to a W3C WebDriver server (chromedriver, geckodriver, Selenium).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    pub webdriver_url: String,
    /// `chrome` or `firefox`.
    pub browser: String,
    pub headless: bool,
    /// Upper bound on waiting for dynamic content to show up.
    pub wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Extra pause after the content appeared, for late-running scripts.
    pub settle_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            headless: true,
            wait_timeout_secs: 20,
            poll_interval_ms: 250,
            settle_ms: 3000,
        }
    }
}

/// OpenAI-compatible chat completions endpoint used for the digests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: usize,
    /// Digests summarized concurrently.
    pub concurrency: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 5,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "ema::default_config")]
    pub ema: SourceConfig,
    #[serde(default = "pmda::default_config")]
    pub pmda: SourceConfig,
    #[serde(default = "fda::default_config")]
    pub fda: SourceConfig,
    #[serde(default = "who::default_config")]
    pub who: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ema: ema::default_config(),
            pmda: pmda::default_config(),
            fda: fda::default_config(),
            who: who::default_config(),
        }
    }
}

impl SourcesConfig {
    pub fn get(&self, agency: Agency) -> &SourceConfig {
        match agency {
            Agency::Ema => &self.ema,
            Agency::Pmda => &self.pmda,
            Agency::Fda => &self.fda,
            Agency::Who => &self.who,
        }
    }
}

/// Everything an adapter needs to know about one agency's site.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub listing_url: String,
    /// Relative links on the listing are resolved against this.
    pub base_url: String,
    /// Overrides `http.request_delay_ms` for this source.
    pub request_delay_ms: Option<u64>,
    /// Categories (exact strings) whose items never make it into a digest.
    pub excluded_categories: Vec<String>,
    /// Titles shorter than this (in characters) are treated as navigation noise.
    pub min_title_chars: usize,
    pub selectors: SelectorTable,
    /// Per-article page scrape used to fill the summary seed.
    pub detail: Option<DetailSelectors>,
}

impl SourceConfig {
    pub fn request_delay(&self, http: &HttpConfig) -> Duration {
        Duration::from_millis(self.request_delay_ms.unwrap_or(http.request_delay_ms))
    }
}

/// CSS selectors for one listing page.
///
/// Every field holds alternatives tried in order; the first selector that
/// yields something wins. `card` is matched against the whole document, the
/// rest against each card.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorTable {
    pub card: Vec<String>,
    /// When empty or unmatched, the link text is used as the title.
    pub title: Vec<String>,
    pub link: Vec<String>,
    pub date: Vec<String>,
    pub category: Vec<String>,
    pub excerpt: Vec<String>,
    /// Browser-rendered sources only: wait until this matches.
    pub wait_for: Option<String>,
    /// A link must contain at least one of these substrings (if any are given).
    pub link_include: Vec<String>,
    /// A link containing any of these substrings is not an article.
    pub link_exclude: Vec<String>,
}

/// Selectors for an individual article page.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetailSelectors {
    /// Lead text. `meta` elements contribute their `content` attribute.
    pub summary: Vec<String>,
    /// Body paragraphs.
    pub content: Vec<String>,
    /// Publication date, used when the listing card carries none. A
    /// `datetime` or `content` attribute is preferred over element text.
    pub date: Vec<String>,
    pub max_paragraphs: usize,
    pub min_paragraph_chars: usize,
    /// Site boilerplate; any text containing one of these is skipped.
    pub ignore: Vec<String>,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            summary: vec![
                r#"meta[name="description"]"#.to_string(),
                r#"meta[property="og:description"]"#.to_string(),
            ],
            content: vec!["article p".to_string(), "main p".to_string()],
            date: vec![
                "time[datetime]".to_string(),
                r#"meta[property="article:published_time"]"#.to_string(),
                r#"meta[name="dcterms.created"]"#.to_string(),
                ".publish-date".to_string(),
                ".news-date".to_string(),
                ".date".to_string(),
            ],
            max_paragraphs: 3,
            min_paragraph_chars: 30,
            ignore: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Check that every configured selector parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for agency in Agency::ALL {
            let source = self.sources.get(agency);
            let s = &source.selectors;
            let fields: [(&'static str, &Vec<String>); 6] = [
                ("selectors.card", &s.card),
                ("selectors.title", &s.title),
                ("selectors.link", &s.link),
                ("selectors.date", &s.date),
                ("selectors.category", &s.category),
                ("selectors.excerpt", &s.excerpt),
            ];
            for (field, list) in fields {
                check_selectors(agency, field, list)?;
            }
            if let Some(wait_for) = &s.wait_for {
                check_selectors(agency, "selectors.wait_for", std::slice::from_ref(wait_for))?;
            }
            if let Some(detail) = &source.detail {
                check_selectors(agency, "detail.summary", &detail.summary)?;
                check_selectors(agency, "detail.content", &detail.content)?;
                check_selectors(agency, "detail.date", &detail.date)?;
            }
        }
        Ok(())
    }
}

fn check_selectors(agency: Agency, field: &'static str, list: &[String]) -> Result<(), ConfigError> {
    for selector in list {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::Selector {
                agency: agency.slug().to_string(),
                field,
                selector: selector.clone(),
            });
        }
    }
    Ok(())
}

/// Load the configuration from `path`, or the built-in defaults when no path
/// is given. The result is validated before it is returned.
#[instrument(level = "info")]
pub fn load(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
            let config = parse(&text, path)?;
            info!(path, "Loaded configuration file");
            config
        }
        None => {
            info!("No config file given; using built-in defaults");
            AppConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

fn parse(text: &str, path: &str) -> Result<AppConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}
