//! HTML parser for extracting links
//!
//! Links come from `<a href>` tags and `<link rel="canonical">`, resolved
//! against the page URL. They are returned as absolute URLs in document
//! order; normalization is left to the frontier.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Turns page content into the links it references
pub trait LinkExtractor {
    /// Returns absolute http(s) URLs found in `body`
    ///
    /// Relative references are resolved against `base_url`. A body that
    /// cannot be parsed, or a base URL that is invalid, yields no links.
    fn extract_links(&self, body: &str, base_url: &str) -> Vec<String>;
}

/// `LinkExtractor` for HTML documents
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, body: &str, base_url: &str) -> Vec<String> {
        match Url::parse(base_url) {
            Ok(base) => parse_links(body, &base),
            Err(e) => {
                tracing::debug!("Not extracting links, bad base URL {}: {}", base_url, e);
                Vec::new()
            }
        }
    }
}

/// Extracts links from an HTML document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// Exact duplicates are collapsed; the first occurrence keeps its position.
pub fn parse_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(absolute_url) = resolve_link(href, base_url) {
            if seen.insert(absolute_url.clone()) {
                links.push(absolute_url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
