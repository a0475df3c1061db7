//! Realtime Weather Client
//!
//! Queries a Tomorrow.io-style realtime endpoint either by location name or by
//! coordinates resolved through an IP geolocation lookup.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::WeatherSettings;
use crate::types::{ServiceError, ServiceResult};

/// Weather capability used by the dispatcher
pub trait WeatherBackend {
    /// Weather at the caller's approximate position
    fn current_location_weather(&self) -> ServiceResult;

    /// Weather for a named location; blank names never reach the network
    fn located_weather(&self, location: &str) -> ServiceResult;
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    data: RealtimeData,
}

#[derive(Debug, Deserialize)]
struct RealtimeData {
    time: String,
    values: WeatherValues,
}

/// The fields rendered for every report
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherValues {
    pub temperature: f64,
    pub temperature_apparent: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,
    pub visibility: f64,
    pub uv_index: f64,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    loc: Option<String>,
}

// ============================================================================
// Formatting
// ============================================================================

/// Render the eight report fields under `heading`
pub fn format_report(heading: &str, time: &str, v: &WeatherValues) -> String {
    format!(
        "**{}:**\n\
         - Time: {}\n\
         - Temperature: {}\u{b0}C\n\
         - Apparent Temperature: {}\u{b0}C\n\
         - Humidity: {}%\n\
         - Wind Speed: {} m/s\n\
         - Cloud Cover: {}%\n\
         - Visibility: {} km\n\
         - UV Index: {}",
        heading,
        time,
        v.temperature,
        v.temperature_apparent,
        v.humidity,
        v.wind_speed,
        v.cloud_cover,
        v.visibility,
        v.uv_index
    )
}

/// Turn a realtime response into a report or a typed error.
/// `failure_context` prefixes non-success messages.
pub fn interpret_weather_response(
    status: StatusCode,
    body: &str,
    heading: &str,
    failure_context: &str,
) -> ServiceResult {
    if status != StatusCode::OK {
        return Err(ServiceError::bad_status(failure_context, status.as_u16(), body));
    }

    let resp: RealtimeResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(format!("weather data: {}", e)))?;

    Ok(format_report(heading, &resp.data.time, &resp.data.values))
}

/// Parse `"lat,lon"` from a geolocation body
pub fn parse_geolocation(body: &str) -> Result<(String, String), ServiceError> {
    let geo: GeoResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::MalformedResponse(format!("geolocation: {}", e)))?;

    let loc = geo
        .loc
        .ok_or_else(|| ServiceError::MalformedResponse("geolocation: missing field `loc`".to_string()))?;

    match loc.split_once(',') {
        Some((lat, lon)) if !lat.trim().is_empty() && !lon.trim().is_empty() => {
            Ok((lat.trim().to_string(), lon.trim().to_string()))
        }
        _ => Err(ServiceError::MalformedResponse(format!(
            "geolocation: expected \"lat,lon\", got {:?}",
            loc
        ))),
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct WeatherClient {
    client: Client,
    settings: WeatherSettings,
    api_key: String,
}

impl WeatherClient {
    pub fn new(client: Client, settings: WeatherSettings, api_key: impl Into<String>) -> Self {
        Self {
            client,
            settings,
            api_key: api_key.into(),
        }
    }

    fn realtime_url(&self) -> String {
        format!("{}/weather/realtime", self.settings.base_url.trim_end_matches('/'))
    }

    /// Resolve the caller's coordinates from their public IP
    fn geolocate(&self) -> Result<(String, String), ServiceError> {
        tracing::debug!("Geolocating via {}", self.settings.geolocation_url);
        let response = self.client.get(&self.settings.geolocation_url).send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ServiceError::bad_status(
                "Failed to resolve current location",
                status.as_u16(),
                body,
            ));
        }

        parse_geolocation(&body)
    }

    fn fetch_realtime(&self, location: &str, heading: &str, failure_context: &str) -> ServiceResult {
        tracing::debug!(location, "Fetching realtime weather");

        let response = self
            .client
            .get(self.realtime_url())
            .query(&[("location", location), ("apikey", self.api_key.as_str())])
            .header("accept", "application/json")
            .send()?;

        let status = response.status();
        let body = response.text()?;

        let result = interpret_weather_response(status, &body, heading, failure_context);
        if let Err(ref e) = result {
            tracing::warn!("Weather lookup failed: {}", e);
        }
        result
    }
}

impl WeatherBackend for WeatherClient {
    fn current_location_weather(&self) -> ServiceResult {
        let (lat, lon) = self.geolocate()?;
        self.fetch_realtime(
            &format!("{},{}", lat, lon),
            "Current Location Weather",
            "Failed to fetch weather data",
        )
    }

    fn located_weather(&self, location: &str) -> ServiceResult {
        let location = location.trim();
        if location.is_empty() {
            return Err(ServiceError::EmptyInput("Location"));
        }

        self.fetch_realtime(
            location,
            &format!("Weather in {}", location),
            &format!("Failed to fetch weather data for {}", location),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct client for tests that target a closed local port
    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    const LABELS: [&str; 8] = [
        "Time:",
        "Temperature:",
        "Apparent Temperature:",
        "Humidity:",
        "Wind Speed:",
        "Cloud Cover:",
        "Visibility:",
        "UV Index:",
    ];

    fn sample_body() -> String {
        serde_json::json!({
            "data": {
                "time": "2026-10-18T09:00:00Z",
                "values": {
                    "temperature": 21.4,
                    "temperatureApparent": 22,
                    "humidity": 64,
                    "windSpeed": 3.1,
                    "cloudCover": 12,
                    "visibility": 16,
                    "uvIndex": 4,
                    "weatherCode": 1100
                }
            },
            "location": { "lat": 28.61, "lon": 77.2 }
        })
        .to_string()
    }

    fn unreachable_client() -> WeatherClient {
        let settings = WeatherSettings {
            base_url: "http://127.0.0.1:9/v4".to_string(),
            geolocation_url: "http://127.0.0.1:9/json".to_string(),
        };
        WeatherClient::new(local_client(), settings, "test-key")
    }

    #[test]
    fn test_report_contains_all_fields_in_order() {
        let report =
            interpret_weather_response(StatusCode::OK, &sample_body(), "Weather in Delhi", "unused")
                .unwrap();

        assert!(report.starts_with("**Weather in Delhi:**"));
        let mut last = 0;
        for label in LABELS {
            let pos = report[last..]
                .find(label)
                .unwrap_or_else(|| panic!("missing or out of order: {}", label))
                + last;
            last = pos + label.len();
        }
    }

    #[test]
    fn test_report_values() {
        let report =
            interpret_weather_response(StatusCode::OK, &sample_body(), "Current Location Weather", "x")
                .unwrap();
        assert!(report.contains("- Time: 2026-10-18T09:00:00Z"));
        assert!(report.contains("- Temperature: 21.4\u{b0}C"));
        assert!(report.contains("- Apparent Temperature: 22\u{b0}C"));
        assert!(report.contains("- Humidity: 64%"));
        assert!(report.contains("- Wind Speed: 3.1 m/s"));
        assert!(report.contains("- Visibility: 16 km"));
        assert!(report.ends_with("- UV Index: 4"));
    }

    #[test]
    fn test_non_200_status_is_error_with_code() {
        let result = interpret_weather_response(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"code":429001,"message":"rate limited"}"#,
            "Weather in Delhi",
            "Failed to fetch weather data for Delhi",
        );
        let err = result.unwrap_err();
        assert!(matches!(err, ServiceError::BadStatus { status: 429, .. }));
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.starts_with("Failed to fetch weather data for Delhi"));
    }

    #[test]
    fn test_other_success_codes_are_not_ok() {
        let result = interpret_weather_response(StatusCode::NO_CONTENT, "", "h", "ctx");
        assert!(matches!(result, Err(ServiceError::BadStatus { status: 204, .. })));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let body = serde_json::json!({
            "data": {
                "time": "2026-10-18T09:00:00Z",
                "values": { "temperature": 20.0 }
            }
        })
        .to_string();
        let err = interpret_weather_response(StatusCode::OK, &body, "h", "ctx").unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_geolocation() {
        let body = r#"{"ip":"203.0.113.7","city":"Pune","loc":"18.5196,73.8553"}"#;
        let (lat, lon) = parse_geolocation(body).unwrap();
        assert_eq!(lat, "18.5196");
        assert_eq!(lon, "73.8553");
    }

    #[test]
    fn test_parse_geolocation_missing_loc() {
        assert!(matches!(
            parse_geolocation(r#"{"ip":"203.0.113.7"}"#),
            Err(ServiceError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_geolocation(r#"{"loc":"nowhere"}"#),
            Err(ServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_empty_location_makes_no_request() {
        // The client points at a closed port: a request would surface as Network
        let client = unreachable_client();
        assert_eq!(
            client.located_weather("   "),
            Err(ServiceError::EmptyInput("Location"))
        );
        assert_eq!(client.located_weather(""), Err(ServiceError::EmptyInput("Location")));
    }

    #[test]
    fn test_network_failure_is_error() {
        let client = unreachable_client();
        assert!(matches!(client.located_weather("Delhi"), Err(ServiceError::Network(_))));
        assert!(matches!(client.current_location_weather(), Err(ServiceError::Network(_))));
    }

    /// Live check against ipinfo.io and Tomorrow.io
    /// Run with: TOMORROW_API_KEY=... cargo test test_weather_live -- --ignored
    #[test]
    #[ignore]
    fn test_weather_live() {
        let key = std::env::var(crate::config::WEATHER_API_KEY_VAR).unwrap();
        let client = WeatherClient::new(Client::new(), WeatherSettings::default(), key);
        let report = client.located_weather("London").unwrap();
        assert!(report.contains("UV Index"));
    }
}
