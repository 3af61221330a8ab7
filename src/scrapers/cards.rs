//! Selector-driven extraction of listing cards and article details.
//!
//! Nothing here performs I/O: the functions take an HTML string and return
//! plain data, so each agency's selector table can be tested against a
//! fixture.

use crate::config::{DetailSelectors, SelectorTable};
use crate::dates;
use crate::error::{ItemExtractionError, ScrapeError};
use crate::models::RawCard;
use crate::utils::{clean_text, truncate_chars};
use scraper::{ElementRef, Html, Selector};
use tracing::trace;
use url::Url;

const EXCERPT_MAX_CHARS: usize = 300;
const SEED_MAX_CHARS: usize = 1200;

/// Lowercased fragments of titles served by error pages.
const ERROR_PAGE_TITLES: &[&str] = &[
    "page not found",
    "not available",
    "404 ",
    "access denied",
    "ページが見つかりません",
];

fn compile_all(list: &[String]) -> Result<Vec<Selector>, ScrapeError> {
    list.iter()
        .map(|s| {
            Selector::parse(s).map_err(|e| ScrapeError::InvalidSelector {
                selector: s.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// A [`SelectorTable`] with every selector parsed.
#[derive(Debug)]
pub struct CompiledSelectors {
    card: Vec<Selector>,
    title: Vec<Selector>,
    link: Vec<Selector>,
    date: Vec<Selector>,
    category: Vec<Selector>,
    excerpt: Vec<Selector>,
    link_include: Vec<String>,
    link_exclude: Vec<String>,
    min_title_chars: usize,
}

impl CompiledSelectors {
    pub fn compile(table: &SelectorTable, min_title_chars: usize) -> Result<Self, ScrapeError> {
        Ok(Self {
            card: compile_all(&table.card)?,
            title: compile_all(&table.title)?,
            link: compile_all(&table.link)?,
            date: compile_all(&table.date)?,
            category: compile_all(&table.category)?,
            excerpt: compile_all(&table.excerpt)?,
            link_include: table.link_include.clone(),
            link_exclude: table.link_exclude.clone(),
            min_title_chars,
        })
    }
}

/// Result of scanning one listing page.
#[derive(Debug)]
pub struct CardScan {
    /// Elements matched by the winning card selector.
    pub matched: usize,
    /// One entry per matched element, in page order.
    pub cards: Vec<Result<RawCard, ItemExtractionError>>,
}

/// Locate the cards on a listing page and extract each one independently.
///
/// The first card selector that matches anything wins; the others are not
/// consulted.
pub fn extract_cards(html: &str, selectors: &CompiledSelectors, base: &Url) -> CardScan {
    let document = Html::parse_document(html);

    for card_selector in &selectors.card {
        let elements: Vec<ElementRef> = document.select(card_selector).collect();
        if elements.is_empty() {
            continue;
        }
        let cards = elements
            .iter()
            .map(|el| extract_card(*el, selectors, base))
            .collect();
        return CardScan {
            matched: elements.len(),
            cards,
        };
    }

    CardScan {
        matched: 0,
        cards: Vec::new(),
    }
}

fn element_text(el: ElementRef) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first element any selector matches with non-empty text.
fn first_text(card: ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        card.select(sel)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn extract_card(
    card: ElementRef,
    selectors: &CompiledSelectors,
    base: &Url,
) -> Result<RawCard, ItemExtractionError> {
    let link_el = selectors
        .link
        .iter()
        .find_map(|sel| card.select(sel).find(|el| el.value().attr("href").is_some()))
        .or_else(|| (card.value().name() == "a" && card.value().attr("href").is_some()).then_some(card))
        .ok_or(ItemExtractionError::MissingLink)?;
    let href = link_el.value().attr("href").unwrap_or_default().trim();
    if href.is_empty() {
        return Err(ItemExtractionError::MissingLink);
    }
    let url = resolve_link(href, selectors, base)?;

    let title = first_text(card, &selectors.title)
        .or_else(|| Some(element_text(link_el)).filter(|t| !t.is_empty()))
        .ok_or(ItemExtractionError::MissingTitle)?;
    if title.chars().count() < selectors.min_title_chars {
        trace!(%title, "Title too short");
        return Err(ItemExtractionError::MissingTitle);
    }
    if dates::is_date_only(&title) {
        trace!(%title, "Title is only a date");
        return Err(ItemExtractionError::MissingTitle);
    }
    let lowered = title.to_lowercase();
    if lowered == "404" || ERROR_PAGE_TITLES.iter().any(|p| lowered.contains(p)) {
        return Err(ItemExtractionError::ErrorPageTitle(title));
    }

    let raw_date = selectors.date.iter().find_map(|sel| {
        card.select(sel).find_map(|el| {
            el.value()
                .attr("datetime")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| Some(element_text(el)).filter(|t| !t.is_empty()))
        })
    });

    Ok(RawCard {
        title,
        url,
        raw_date,
        category: first_text(card, &selectors.category),
        excerpt: first_text(card, &selectors.excerpt)
            .map(|text| truncate_chars(&text, EXCERPT_MAX_CHARS)),
    })
}

fn resolve_link(href: &str, selectors: &CompiledSelectors, base: &Url) -> Result<String, ItemExtractionError> {
    if selectors.link_exclude.iter().any(|p| href.contains(p.as_str())) {
        return Err(ItemExtractionError::RejectedLink(href.to_string()));
    }

    let resolved = base.join(href).map_err(|e| ItemExtractionError::BadLink {
        href: href.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return Err(ItemExtractionError::RejectedLink(href.to_string()));
    }

    let url = resolved.to_string();
    if selectors.link_exclude.iter().any(|p| url.contains(p.as_str())) {
        return Err(ItemExtractionError::RejectedLink(url));
    }
    if !selectors.link_include.is_empty()
        && !selectors.link_include.iter().any(|p| url.contains(p.as_str()))
    {
        return Err(ItemExtractionError::RejectedLink(url));
    }
    Ok(url)
}

/// A [`DetailSelectors`] block with every selector parsed.
#[derive(Debug)]
pub struct CompiledDetail {
    summary: Vec<Selector>,
    content: Vec<Selector>,
    date: Vec<Selector>,
    max_paragraphs: usize,
    min_paragraph_chars: usize,
    ignore: Vec<String>,
}

impl CompiledDetail {
    pub fn compile(detail: &DetailSelectors) -> Result<Self, ScrapeError> {
        Ok(Self {
            summary: compile_all(&detail.summary)?,
            content: compile_all(&detail.content)?,
            date: compile_all(&detail.date)?,
            max_paragraphs: detail.max_paragraphs,
            min_paragraph_chars: detail.min_paragraph_chars,
            ignore: detail.ignore.clone(),
        })
    }

    fn is_boilerplate(&self, text: &str) -> bool {
        self.ignore.iter().any(|phrase| text.contains(phrase.as_str()))
    }
}

/// Build a summary seed from an article page.
///
/// The lead (a meta description or the first summary element) comes first,
/// followed by up to `max_paragraphs` body paragraphs from the first content
/// selector that yields any. Boilerplate and repeated text is skipped.
/// Returns `None` when nothing usable is found.
pub fn extract_detail(html: &str, detail: &CompiledDetail) -> Option<String> {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();

    let lead = detail.summary.iter().find_map(|sel| {
        document.select(sel).find_map(|el| {
            let text = match el.value().attr("content") {
                Some(content) => clean_text(content),
                None => element_text(el),
            };
            (!text.is_empty() && !detail.is_boilerplate(&text)).then_some(text)
        })
    });
    parts.extend(lead);

    for sel in &detail.content {
        let paragraphs: Vec<String> = document
            .select(sel)
            .map(element_text)
            .filter(|p| p.chars().count() >= detail.min_paragraph_chars)
            .filter(|p| !detail.is_boilerplate(p))
            .filter(|p| !parts.contains(p))
            .take(detail.max_paragraphs)
            .collect();
        if !paragraphs.is_empty() {
            parts.extend(paragraphs);
            break;
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(truncate_chars(&parts.join("\n\n"), SEED_MAX_CHARS))
    }
}

/// Candidate publication dates on an article page, in selector order.
///
/// Each matched element contributes its `datetime` attribute, else its
/// `content` attribute, else its text. Callers keep the first that parses.
pub fn extract_detail_dates(html: &str, detail: &CompiledDetail) -> Vec<String> {
    let document = Html::parse_document(html);
    detail
        .date
        .iter()
        .flat_map(|sel| document.select(sel).collect::<Vec<_>>())
        .filter_map(|el| {
            el.value()
                .attr("datetime")
                .or_else(|| el.value().attr("content"))
                .map(clean_text)
                .filter(|v| !v.is_empty())
                .or_else(|| Some(element_text(el)).filter(|t| !t.is_empty()))
        })
        .collect()
}
