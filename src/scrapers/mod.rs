//! Source adapters for the regulatory agencies' news listings.
//!
//! Every agency is scraped the same way: one listing page is retrieved, its
//! "cards" are located with a selector table, and each card is converted into
//! a [`NewsItem`](crate::models::NewsItem) on its own. What differs per agency
//! is data, not code: the default [`SourceConfig`](crate::config::SourceConfig)
//! built by each agency module.
//!
//! # Supported Sources
//!
//! | Agency | Module | Listing | Retrieval | Notes |
//! |--------|--------|---------|-----------|-------|
//! | EMA | [`ema`] | `/en/news` | HTTP | ECL cards, `<time datetime>` |
//! | PMDA | [`pmda`] | `/0017.html` | HTTP | Japanese dates, categories |
//! | FDA | [`fda`] | guidance search | WebDriver | DataTables, 30s crawl delay |
//! | WHO | [`who`] | `/news` | WebDriver | JS list widget |
//!
//! # Layers
//!
//! - [`fetch`]: plain HTTP retrieval ([`fetch::PageFetcher`])
//! - [`renderer`]: browser retrieval over WebDriver ([`renderer::PageRenderer`])
//! - [`cards`]: selector-driven extraction from HTML, no I/O
//! - [`adapter`]: ties the above together with politeness delays and
//!   per-card failure isolation

pub mod adapter;
pub mod cards;
pub mod ema;
pub mod fda;
pub mod fetch;
pub mod pmda;
pub mod renderer;
pub mod who;

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
