//! Per-agency digests: prompt construction, summarization and local fallbacks.
//!
//! One digest is produced for every agency in an [`AggregateReport`]. Agencies
//! with items are sent to the summarizer as a single prompt; everything else
//! (no items, a failed source, no summarizer, a failed summarization) is
//! rendered locally so every agency always gets a page.

use crate::api::{AskAsync, ChatPrompt};
use crate::models::{Agency, AgencyReport, AgencyStatus, AggregateReport, NewsItem, TimeWindow};
use crate::outputs::html;
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Output language and tone for the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDirective {
    pub language: String,
    pub style: String,
}

impl Default for SummaryDirective {
    fn default() -> Self {
        Self {
            language: "Japanese".to_string(),
            style: "detailed summaries for regulatory affairs professionals".to_string(),
        }
    }
}

/// How a digest page came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    /// No items in the window; nothing was sent to the summarizer.
    Empty,
    /// Written by the summarizer.
    Rendered,
    /// Rendered locally. `error` is set when the summarizer was asked and failed.
    Fallback { error: Option<String> },
    /// The agency's listing could not be retrieved.
    SourceFailed { cause: String },
}

#[derive(Debug, Clone)]
pub struct Digest {
    pub agency: Agency,
    pub outcome: DigestOutcome,
    pub html: String,
}

fn source_description(agency: Agency) -> &'static str {
    match agency {
        Agency::Ema => "news articles from the European Medicines Agency (EMA)",
        Agency::Pmda => "announcements from the Pharmaceuticals and Medical Devices Agency of Japan (PMDA)",
        Agency::Fda => "guidance documents from the U.S. Food and Drug Administration (FDA)",
        Agency::Who => "news articles from the World Health Organization (WHO)",
    }
}

fn system_prompt(directive: &SummaryDirective) -> String {
    format!(
        "You are a technical writer producing {language} digests of regulatory news. \
         Keep every article title (the h2 headings) exactly as published. Write everything \
         else, including dates, labels, key points and summaries, in {language}. \
         Never copy source sentences verbatim; translate them.",
        language = directive.language
    )
}

/// Build the chat prompt for one agency's items, in the given order.
pub fn build_prompt(
    agency: Agency,
    items: &[&NewsItem],
    window: &TimeWindow,
    directive: &SummaryDirective,
) -> ChatPrompt {
    let mut articles = String::new();
    for (i, item) in items.iter().enumerate() {
        articles.push_str(&format!("\nArticle {}:\n- Title: {}\n- URL: {}\n", i + 1, item.title(), item.url()));
        if let Some(ts) = item.published_at() {
            articles.push_str(&format!("- Published: {}\n", ts.to_rfc3339()));
        }
        if let Some(category) = item.category() {
            articles.push_str(&format!("- Category: {category}\n"));
        }
        if let Some(seed) = item.summary_seed() {
            articles.push_str(&format!("- Excerpt: {seed}\n"));
        }
    }

    let user = format!(
        "Turn the following {source} published between {start} and {end} into a \
mobile-friendly HTML digest with {style}.

Rules:
1. Keep each article title (h2) in its original language.
2. Write all other content in {language}.
3. For each article include the publication date, {category_rule}3-5 key points and a 2-3 paragraph summary.
4. Show each article as a card, styled with inline CSS (max-width: 1200px).
5. Links must use target=\"_blank\" rel=\"noopener\".
6. End with \"{label}\" followed by the URL of every article.

Articles:
{articles}
Return only a complete HTML document (<html>...</html>) with no explanation.",
        source = source_description(agency),
        start = window.start.format("%Y-%m-%d"),
        end = window.end.format("%Y-%m-%d"),
        style = directive.style,
        language = directive.language,
        category_rule = if agency == Agency::Pmda { "the category, " } else { "" },
        label = agency.data_source_label(),
    );

    ChatPrompt {
        system: system_prompt(directive),
        user,
    }
}

/// Pull the HTML document out of a model reply.
///
/// Code fences and any chatter before `<html` are dropped, as is anything
/// after the closing `</html>`. Returns `None` when the reply holds no
/// document.
pub fn extract_html(reply: &str) -> Option<String> {
    let lowered = reply.to_ascii_lowercase();
    let start = lowered.find("<!doctype html").or_else(|| lowered.find("<html"))?;
    let end = lowered
        .rfind("</html>")
        .filter(|&end| end > start)
        .map(|end| end + "</html>".len())
        .unwrap_or(reply.len());
    Some(reply[start..end].trim().to_string())
}

/// Strip a Markdown code fence around a fragment, if present.
fn strip_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
            body.trim_end().strip_suffix("```").unwrap_or(body).trim()
        }
        None => trimmed,
    }
}

#[instrument(level = "info", skip_all, fields(agency = %report.agency))]
async fn render_one<A>(
    report: &AgencyReport,
    window: &TimeWindow,
    summarizer: Option<&A>,
    directive: &SummaryDirective,
) -> Digest
where
    A: AskAsync<Response = String>,
{
    let agency = report.agency;
    if let AgencyStatus::Failed { cause } = &report.status {
        return Digest {
            agency,
            html: html::failure_page(agency, window, cause),
            outcome: DigestOutcome::SourceFailed { cause: cause.clone() },
        };
    }

    let items = report.items_newest_first();
    if items.is_empty() {
        debug!("No items; rendering empty digest");
        return Digest {
            agency,
            html: html::empty_page(agency, window),
            outcome: DigestOutcome::Empty,
        };
    }

    let Some(summarizer) = summarizer else {
        return Digest {
            agency,
            html: html::fallback_page(agency, window, &items),
            outcome: DigestOutcome::Fallback { error: None },
        };
    };

    let t0 = Instant::now();
    let prompt = build_prompt(agency, &items, window, directive);
    match summarizer.ask(&prompt).await {
        Ok(reply) => {
            info!(
                items = items.len(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Summarized digest"
            );
            if let Some(document) = extract_html(&reply) {
                return Digest {
                    agency,
                    html: document,
                    outcome: DigestOutcome::Rendered,
                };
            }
            let fragment = strip_fence(&reply);
            if fragment.is_empty() {
                warn!("Summarizer reply was empty; using local rendering");
                return Digest {
                    agency,
                    html: html::fallback_page(agency, window, &items),
                    outcome: DigestOutcome::Fallback {
                        error: Some("empty summarizer reply".to_string()),
                    },
                };
            }
            debug!(preview = %truncate_for_log(fragment, 200), "Wrapping HTML fragment");
            Digest {
                agency,
                html: html::wrap_fragment(agency, window, fragment, &items),
                outcome: DigestOutcome::Rendered,
            }
        }
        Err(e) => {
            warn!(error = %e, "Summarization failed; using local rendering");
            Digest {
                agency,
                html: html::fallback_page(agency, window, &items),
                outcome: DigestOutcome::Fallback {
                    error: Some(e.to_string()),
                },
            }
        }
    }
}

/// Produce one digest per agency in `report`, in agency order.
///
/// At most `concurrency` summarizer requests are in flight at once. With no
/// summarizer every digest is rendered locally.
#[instrument(level = "info", skip_all, fields(agencies = report.agencies.len(), concurrency))]
pub async fn render_all<A>(
    report: &AggregateReport,
    summarizer: Option<&A>,
    directive: &SummaryDirective,
    concurrency: usize,
) -> Vec<Digest>
where
    A: AskAsync<Response = String>,
{
    let mut digests: Vec<Digest> = stream::iter(report.agencies.iter())
        .map(|agency_report| render_one(agency_report, &report.window, summarizer, directive))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    digests.sort_by_key(|d| d.agency);

    let fallbacks = digests
        .iter()
        .filter(|d| matches!(d.outcome, DigestOutcome::Fallback { .. }))
        .count();
    info!(count = digests.len(), fallbacks, "Rendered digests");
    digests
}
