//! Domain models shared by the router, the adapters and the front end
//!
//! This module contains:
//! - The `Intent` produced by classification
//! - The user-facing `Feature` labels recorded in history
//! - Search hits
//! - The adapter error taxonomy (`ServiceError`) and `ServiceResult`

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Intents
// ============================================================================

/// Classified purpose of a user query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    WeatherCurrent,
    WeatherLocated { location: String },
    WebSearch { query: String },
    ImageSearchRedirect,
    PictureExplainRedirect,
    GenericCompletion { prompt: String },
}

impl Intent {
    /// Stable snake_case label, matches the serialized tag
    pub fn label(&self) -> &'static str {
        match self {
            Intent::WeatherCurrent => "weather_current",
            Intent::WeatherLocated { .. } => "weather_located",
            Intent::WebSearch { .. } => "web_search",
            Intent::ImageSearchRedirect => "image_search_redirect",
            Intent::PictureExplainRedirect => "picture_explain_redirect",
            Intent::GenericCompletion { .. } => "generic_completion",
        }
    }
}

// ============================================================================
// Features
// ============================================================================

/// User-facing features, one per menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    QueryProcessing,
    WeatherInformation,
    PdfSummarization,
    ImageSearch,
    PictureExplanation,
}

impl Feature {
    pub fn display_name(&self) -> &'static str {
        match self {
            Feature::QueryProcessing => "Query Processing",
            Feature::WeatherInformation => "Weather Information",
            Feature::PdfSummarization => "PDF Summarization",
            Feature::ImageSearch => "Image Search",
            Feature::PictureExplanation => "Picture Explanation",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Search
// ============================================================================

/// A single web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchHit {
    /// Build the placeholder hit returned when the provider fails
    pub fn from_error(err: &ServiceError) -> Self {
        Self {
            title: "Search error".to_string(),
            url: String::new(),
            snippet: err.to_string(),
        }
    }

    /// Render as a numbered display block (numbering starts at 1)
    pub fn render(&self, index: usize) -> String {
        format!(
            "{}. {}\nURL: {}\nSnippet: {}",
            index, self.title, self.url, self.snippet
        )
    }
}

/// Render a list of hits, one block per line group
pub fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| hit.render(i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Adapter Errors
// ============================================================================

/// Failures an adapter can report at its boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Connection, DNS or timeout failure
    #[error("An error occurred: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("{context}. Status Code: {status}, Message: {message}")]
    BadStatus {
        context: String,
        status: u16,
        message: String,
    },

    /// Model backend refused a request; carries the backend's own message
    #[error("{context}: {message}")]
    Backend {
        context: String,
        status: u16,
        message: String,
    },

    /// Response body was missing an expected field or was not valid JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Required user input was blank
    #[error("{0} cannot be empty.")]
    EmptyInput(&'static str),

    /// Document could not be read or a page had no extractable text
    #[error("Error extracting text from PDF: {0}")]
    Extraction(String),
}

impl ServiceError {
    pub fn bad_status(context: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::BadStatus {
            context: context.into(),
            status,
            message: message.into(),
        }
    }

    pub fn backend(context: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            context: context.into(),
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::MalformedResponse(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

/// Outcome of an adapter call: rendered text or a typed error
pub type ServiceResult = Result<String, ServiceError>;

/// Text shown to the user for either outcome
pub fn render_result(result: &ServiceResult) -> String {
    match result {
        Ok(text) => text.clone(),
        Err(e) => e.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_label_matches_serialized_tag() {
        let intent = Intent::WeatherLocated {
            location: "Delhi".to_string(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["intent"], intent.label());
        assert_eq!(json["location"], "Delhi");

        let json = serde_json::to_value(Intent::ImageSearchRedirect).unwrap();
        assert_eq!(json["intent"], "image_search_redirect");
    }

    #[test]
    fn test_feature_display_names() {
        assert_eq!(Feature::QueryProcessing.to_string(), "Query Processing");
        assert_eq!(Feature::PdfSummarization.to_string(), "PDF Summarization");
    }

    #[test]
    fn test_bad_status_message_contains_code() {
        let err = ServiceError::bad_status("Failed to fetch weather data", 401, "invalid key");
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid key"));
    }

    #[test]
    fn test_backend_message_is_colon_prefixed() {
        let err = ServiceError::backend("Error during summarization", 402, "Insufficient credits");
        assert_eq!(err.to_string(), "Error during summarization: Insufficient credits");
    }

    #[test]
    fn test_empty_input_message() {
        let err = ServiceError::EmptyInput("Location");
        assert_eq!(err.to_string(), "Location cannot be empty.");
    }

    #[test]
    fn test_error_hit_mentions_error() {
        let hit = SearchHit::from_error(&ServiceError::Network("connection refused".to_string()));
        assert!(hit.render(1).to_lowercase().contains("error"));
    }

    #[test]
    fn test_render_hits_numbers_from_one() {
        let hits = vec![
            SearchHit {
                title: "Rust".to_string(),
                url: "https://www.rust-lang.org/".to_string(),
                snippet: "A language".to_string(),
            },
            SearchHit {
                title: "Cargo".to_string(),
                url: "https://doc.rust-lang.org/cargo/".to_string(),
                snippet: "The package manager".to_string(),
            },
        ];
        let text = render_hits(&hits);
        assert!(text.starts_with("1. Rust\nURL: https://www.rust-lang.org/\nSnippet: A language"));
        assert!(text.contains("\n2. Cargo\n"));
    }

    #[test]
    fn test_render_result_both_outcomes() {
        assert_eq!(render_result(&Ok("sunny".to_string())), "sunny");
        let err: ServiceResult = Err(ServiceError::EmptyInput("Location"));
        assert_eq!(render_result(&err), "Location cannot be empty.");
    }
}
