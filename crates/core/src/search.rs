//! Web Search via DuckDuckGo's HTML endpoint
//!
//! No API key. Each `result` block is scraped for its anchor and snippet, and
//! DuckDuckGo's redirect links (`...?uddg=<encoded>`) are unwrapped.

use regex::Regex;
use reqwest::blocking::Client;
use std::sync::OnceLock;

use crate::config::SearchSettings;
use crate::types::{SearchHit, ServiceError};

/// Search capability used by the dispatcher
pub trait SearchBackend {
    /// At most `max_results` hits; a failure yields one error hit
    fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        match self.try_search(query, max_results) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                vec![SearchHit::from_error(&e)]
            }
        }
    }

    fn try_search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ServiceError>;
}

// ============================================================================
// HTML Parsing
// ============================================================================

fn result_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"class="result(?:\s[^"]*)?""#).expect("Invalid regex"))
}

fn result_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)class="result__a"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).expect("Invalid regex")
    })
}

fn result_snippet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</a>"#).expect("Invalid regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"))
}

/// Strip tags, collapse whitespace and decode the common entities
fn html_to_text(html: &str) -> String {
    let text = tag_re().replace_all(html, "");
    let text = whitespace_re().replace_all(&text, " ");

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Unwrap a DuckDuckGo redirect link to its target
fn clean_result_url(href: &str) -> String {
    let href = href.replace("&amp;", "&");

    if let Some(encoded) = href.split("uddg=").nth(1) {
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }

    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    href
}

/// Split a result page into one slice per `result` block
fn result_blocks(html: &str) -> Vec<&str> {
    let starts: Vec<usize> = result_block_re().find_iter(html).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            &html[start..end]
        })
        .collect()
}

/// Title, link and snippet from one result block; blocks without a link are skipped
fn parse_block(block: &str) -> Option<SearchHit> {
    let link = result_link_re().captures(block)?;
    let snippet = result_snippet_re()
        .captures(block)
        .map(|cap| html_to_text(cap.get(1).map_or("", |m| m.as_str())))
        .unwrap_or_default();

    Some(SearchHit {
        title: html_to_text(link.get(2).map_or("", |m| m.as_str())),
        url: clean_result_url(link.get(1).map_or("", |m| m.as_str())),
        snippet,
    })
}

/// Extract up to `max_results` hits from a result page
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    result_blocks(html)
        .into_iter()
        .filter_map(parse_block)
        .take(max_results)
        .collect()
}

// ============================================================================
// Client
// ============================================================================

pub struct SearchClient {
    client: Client,
    settings: SearchSettings,
}

impl SearchClient {
    pub fn new(client: Client, settings: SearchSettings) -> Self {
        Self { client, settings }
    }
}

impl SearchBackend for SearchClient {
    fn try_search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ServiceError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        tracing::debug!(query, region = %self.settings.region, "Searching");

        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&[("q", query), ("kl", self.settings.region.as_str())])
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(ServiceError::bad_status("Search failed", status.as_u16(), body));
        }

        Ok(parse_results(&body, max_results))
    }
}

// ============================================================================
// Tests
// ============================================================================
