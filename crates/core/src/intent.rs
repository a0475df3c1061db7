//! Keyword Intent Classification
//!
//! Maps a raw query to an `Intent` with a fixed keyword priority:
//! weather, then "/", then image, then picture explain, then completion.
//! Matching is ASCII case-insensitive so byte offsets in the lowered
//! string line up with the original.

use crate::types::Intent;

/// Extract the location after the last "in" of a weather query.
/// `lower` must be the ASCII-lowercased form of `original`.
fn extract_weather_location(lower: &str, original: &str) -> Option<String> {
    let idx = lower.rfind("in")?;
    Some(original[idx + 2..].trim().to_string())
}

/// Classify a user query. Total: every input yields exactly one intent.
///
/// A query mentioning both "weather" and "/" is a weather query, since
/// weather is checked first.
pub fn classify(query: &str) -> Intent {
    let t = query.to_ascii_lowercase();

    if t.contains("weather") {
        return match extract_weather_location(&t, query) {
            Some(location) => Intent::WeatherLocated { location },
            None => Intent::WeatherCurrent,
        };
    }

    if t.contains('/') {
        return Intent::WebSearch {
            query: query.to_string(),
        };
    }

    if t.contains("image") {
        return Intent::ImageSearchRedirect;
    }

    if t.contains("picture explain") {
        return Intent::PictureExplainRedirect;
    }

    Intent::GenericCompletion {
        prompt: query.to_string(),
    }
}
