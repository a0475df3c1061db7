//! Configuration
//!
//! Non-secret settings come from an optional TOML file; API keys come from
//! the environment (a `.env` file is loaded first if present). Missing keys
//! are a startup error.
//!
//! Settings file lookup order:
//! - an explicit path (the CLI `--config` flag)
//! - ./multitool.toml
//! - {config_dir}/multitool/config.toml

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the completion API key
pub const LLM_API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Environment variable holding the weather API key
pub const WEATHER_API_KEY_VAR: &str = "TOMORROW_API_KEY";

const LOCAL_CONFIG_FILE: &str = "multitool.toml";
const CONFIG_SUBDIR: &str = "multitool";
const CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Settings
// ============================================================================

/// All non-secret settings, every field optional in the file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub weather: WeatherSettings,
    pub search: SearchSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub completion_model: String,
    pub summary_model: String,
    pub completion_max_tokens: u32,
    pub summary_max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            completion_model: "openai/gpt-4o".to_string(),
            summary_model: "meta-llama/llama-3.2-11b-vision-instruct:free".to_string(),
            completion_max_tokens: 500,
            summary_max_tokens: 10000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub base_url: String,
    pub geolocation_url: String,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.tomorrow.io/v4".to_string(),
            geolocation_url: "https://ipinfo.io/json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub base_url: String,
    pub region: String,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://html.duckduckgo.com/html/".to_string(),
            region: "in-en".to_string(),
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings TOML")
    }

    /// Load settings from the first file found, or defaults if none exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        for path in default_locations() {
            if path.exists() {
                return Self::load_file(&path);
            }
        }

        tracing::debug!("No settings file found, using defaults");
        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Self::from_toml(&content).with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    /// Blocking HTTP client with the configured timeout
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .user_agent(concat!("multitool/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![std::env::current_dir()
        .map(|p| p.join(LOCAL_CONFIG_FILE))
        .unwrap_or_else(|_| PathBuf::from(LOCAL_CONFIG_FILE))];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_SUBDIR).join(CONFIG_FILE));
    }
    paths
}

// ============================================================================
// Secrets
// ============================================================================

/// API credentials, resolved once at startup
#[derive(Clone)]
pub struct Secrets {
    pub llm_api_key: String,
    pub weather_api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("llm_api_key", &"<redacted>")
            .field("weather_api_key", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    /// Resolve secrets through a lookup function (env in production)
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("Missing {} environment variable", name))
        };

        Ok(Self {
            llm_api_key: fetch(LLM_API_KEY_VAR)?,
            weather_api_key: fetch(WEATHER_API_KEY_VAR)?,
        })
    }

    /// Load `.env` if present, then read from the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::resolve(|name| std::env::var(name).ok())
    }
}

// ============================================================================
// Combined
// ============================================================================

/// Everything needed to build the adapters
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub secrets: Secrets,
}

impl Config {
    /// Load settings and secrets; fails if any secret is missing
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load(explicit)?;
        Ok(Self { settings, secrets })
    }
}

// ============================================================================
// Tests
// ============================================================================
