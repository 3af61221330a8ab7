//! Browser-rendered page retrieval over the W3C WebDriver protocol.
//!
//! FDA and WHO build their listings with JavaScript, so a plain GET returns an
//! empty shell. [`WebDriverRenderer`] drives a local chromedriver or
//! geckodriver (or a Selenium server) over its HTTP API:
//!
//! ```text
//! POST   /session                     new headless browser
//! POST   /session/{id}/url            navigate
//! POST   /session/{id}/elements       poll for the wait_for selector
//! GET    /session/{id}/source         rendered DOM
//! DELETE /session/{id}                always, whatever happened above
//! ```
//!
//! A driver that cannot be reached or refuses to start a browser is reported
//! as [`ScrapeError::RendererUnavailable`]; everything after session creation
//! is attributed to the page being rendered.

use crate::config::RendererConfig;
use crate::error::ScrapeError;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

/// One page to render.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub url: &'a str,
    /// CSS selector that must match before the DOM is captured.
    pub wait_for: Option<&'a str>,
    /// Upper bound on waiting for `wait_for`.
    pub timeout: Duration,
}

/// Something that can load a page in a browser and return the rendered DOM.
pub trait PageRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, ScrapeError>;
}

#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    client: Client,
    endpoint: String,
    browser: String,
    headless: bool,
    user_agent: String,
    poll_interval: Duration,
    settle: Duration,
}

impl WebDriverRenderer {
    pub fn new(config: &RendererConfig, user_agent: &str) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.webdriver_url.trim_end_matches('/').to_string(),
            browser: config.browser.to_lowercase(),
            headless: config.headless,
            user_agent: user_agent.to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(10)),
            settle: Duration::from_millis(config.settle_ms),
        })
    }

    fn capabilities(&self) -> Value {
        match self.browser.as_str() {
            "firefox" => {
                let mut args = Vec::new();
                if self.headless {
                    args.push("-headless".to_string());
                }
                json!({
                    "browserName": "firefox",
                    "moz:firefoxOptions": {
                        "args": args,
                        "prefs": { "general.useragent.override": self.user_agent }
                    }
                })
            }
            _ => {
                let mut args = vec![
                    "--no-sandbox".to_string(),
                    "--disable-dev-shm-usage".to_string(),
                    "--disable-gpu".to_string(),
                    "--window-size=1920,1080".to_string(),
                    format!("--user-agent={}", self.user_agent),
                ];
                if self.headless {
                    args.insert(0, "--headless=new".to_string());
                }
                json!({
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                })
            }
        }
    }

    /// Send a WebDriver command and unwrap its `value` member.
    async fn command(&self, request: RequestBuilder) -> Result<Value, ScrapeError> {
        let resp = request
            .send()
            .await
            .map_err(|e| ScrapeError::WebDriver(e.to_string()))?;
        let status = resp.status();
        let mut body: Value = resp
            .json()
            .await
            .map_err(|e| ScrapeError::WebDriver(format!("unreadable response: {e}")))?;
        if !status.is_success() {
            return Err(ScrapeError::WebDriver(driver_error_message(status.as_u16(), &body)));
        }
        Ok(body.get_mut("value").map(Value::take).unwrap_or(Value::Null))
    }

    #[instrument(level = "debug", skip(self))]
    async fn create_session(&self) -> Result<String, ScrapeError> {
        let request = self
            .client
            .post(format!("{}/session", self.endpoint))
            .json(&json!({ "capabilities": { "alwaysMatch": self.capabilities() } }));

        let value = self
            .command(request)
            .await
            .map_err(|e| ScrapeError::RendererUnavailable {
                reason: format!("{} ({})", e, self.endpoint),
            })?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ScrapeError::RendererUnavailable {
                reason: "driver did not return a session id".to_string(),
            })?;
        debug!(session_id, browser = %self.browser, "WebDriver session created");
        Ok(session_id.to_string())
    }

    async fn delete_session(&self, session_id: &str) {
        let request = self
            .client
            .delete(format!("{}/session/{}", self.endpoint, session_id));
        match self.command(request).await {
            Ok(_) => debug!(session_id, "WebDriver session closed"),
            Err(e) => warn!(session_id, error = %e, "Failed to close WebDriver session"),
        }
    }

    async fn load(&self, session_id: &str, request: &RenderRequest<'_>) -> Result<String, ScrapeError> {
        let session = format!("{}/session/{}", self.endpoint, session_id);

        self.command(
            self.client
                .post(format!("{session}/url"))
                .json(&json!({ "url": request.url })),
        )
        .await
        .map_err(|e| ScrapeError::SourceUnavailable {
            url: request.url.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(selector) = request.wait_for {
            let deadline = Instant::now() + request.timeout;
            loop {
                let found = self
                    .command(
                        self.client
                            .post(format!("{session}/elements"))
                            .json(&json!({ "using": "css selector", "value": selector })),
                    )
                    .await?;
                let count = found.as_array().map(Vec::len).unwrap_or(0);
                if count > 0 {
                    debug!(selector, count, "Dynamic content present");
                    break;
                }
                if Instant::now() + self.poll_interval > deadline {
                    return Err(ScrapeError::DynamicContentTimeout {
                        url: request.url.to_string(),
                        selector: selector.to_string(),
                        timeout_secs: request.timeout.as_secs(),
                    });
                }
                sleep(self.poll_interval).await;
            }
        }

        if !self.settle.is_zero() {
            sleep(self.settle).await;
        }

        let source = self
            .command(self.client.get(format!("{session}/source")))
            .await?;
        source
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::WebDriver("page source is not a string".to_string()))
    }
}

impl PageRenderer for WebDriverRenderer {
    #[instrument(level = "info", skip_all, fields(url = %request.url))]
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, ScrapeError> {
        let t0 = Instant::now();
        let session_id = self.create_session().await?;
        let result = self.load(&session_id, request).await;
        self.delete_session(&session_id).await;

        match &result {
            Ok(html) => info!(
                bytes = html.len(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Rendered page"
            ),
            Err(e) => warn!(error = %e, "Rendering failed"),
        }
        result
    }
}

fn driver_error_message(status: u16, body: &Value) -> String {
    let value = body.get("value");
    let error = value.and_then(|v| v.get("error")).and_then(Value::as_str);
    let message = value.and_then(|v| v.get("message")).and_then(Value::as_str);
    match (error, message) {
        (Some(error), Some(message)) => format!("{error}: {message}"),
        (Some(error), None) => error.to_string(),
        _ => format!("HTTP {status}"),
    }
}
