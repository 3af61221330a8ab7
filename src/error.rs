//! Error types for scraping, summarization and configuration.
//!
//! Per-card problems ([`ItemExtractionError`]) never leave the source adapter:
//! they are logged and the card is skipped. Per-source problems
//! ([`ScrapeError`]) become a failure marker on that agency's report.
//! Only [`ScrapeError::RendererUnavailable`] is treated as a run-level
//! condition, and even then the remaining static sources still run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("source unavailable at {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("dynamic content matching `{selector}` did not appear within {timeout_secs}s at {url}")]
    DynamicContentTimeout {
        url: String,
        selector: String,
        timeout_secs: u64,
    },

    #[error("browser automation unavailable: {reason}")]
    RendererUnavailable { reason: String },

    #[error("WebDriver protocol error: {0}")]
    WebDriver(String),

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ScrapeError {
    /// A missing browser driver is a resource problem, not a source problem.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, ScrapeError::RendererUnavailable { .. })
    }
}

/// Why a single listing card could not be converted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemExtractionError {
    #[error("card has no link")]
    MissingLink,

    #[error("card has no usable title")]
    MissingTitle,

    #[error("title `{0}` looks like an error page")]
    ErrorPageTitle(String),

    #[error("link `{href}` could not be resolved: {reason}")]
    BadLink { href: String, reason: String },

    #[error("link `{0}` is not an article link")]
    RejectedLink(String),

    #[error("detail fetch failed for {url}: {reason}")]
    DetailFetch { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("summarizer request timed out")]
    Timeout,

    #[error("summarizer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("summarizer quota exhausted: {0}")]
    Quota(String),

    #[error("malformed summarizer response: {0}")]
    Malformed(String),
}

impl SummarizerError {
    /// Quota and malformed replies will not improve by asking again.
    pub fn is_retriable(&self) -> bool {
        match self {
            SummarizerError::Http(_) | SummarizerError::Timeout => true,
            SummarizerError::Status { status, .. } => *status == 429 || *status >= 500,
            SummarizerError::Quota(_) | SummarizerError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for SummarizerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SummarizerError::Timeout
        } else {
            SummarizerError::Http(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid selector for {agency}.{field}: `{selector}`")]
    Selector {
        agency: String,
        field: &'static str,
        selector: String,
    },
}
