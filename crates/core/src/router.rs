//! Feature Dispatch
//!
//! Runs one user action end to end: classify (for free-text queries), call the
//! selected adapter, append exactly one history entry, return the display text.

use std::path::Path;

use anyhow::Result;

use crate::config::{Config, Settings};
use crate::history::Session;
use crate::intent::classify;
use crate::llm::{CompletionBackend, CompletionClient};
use crate::pdf;
use crate::search::{SearchBackend, SearchClient};
use crate::types::{render_hits, render_result, Feature, Intent, ServiceResult};
use crate::weather::{WeatherBackend, WeatherClient};

pub const IMAGE_SEARCH_URL: &str = "https://www.meta.ai";
pub const PICTURE_EXPLAIN_URL: &str = "https://copilot.microsoft.com/i";

const NO_INPUT: &str = "N/A";
const CURRENT_LOCATION: &str = "Current Location";

/// Holds the adapters and the tunables the dispatch needs
pub struct Dispatcher {
    completion: Box<dyn CompletionBackend>,
    weather: Box<dyn WeatherBackend>,
    search: Box<dyn SearchBackend>,
    completion_max_tokens: u32,
    search_max_results: usize,
}

impl Dispatcher {
    pub fn new(
        completion: Box<dyn CompletionBackend>,
        weather: Box<dyn WeatherBackend>,
        search: Box<dyn SearchBackend>,
        settings: &Settings,
    ) -> Self {
        Self {
            completion,
            weather,
            search,
            completion_max_tokens: settings.llm.completion_max_tokens,
            search_max_results: settings.search.max_results,
        }
    }

    /// Build the production adapters from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = &config.settings;
        let http = settings.http_client()?;

        let completion = CompletionClient::new(
            http.clone(),
            settings.llm.clone(),
            config.secrets.llm_api_key.clone(),
        );
        let weather = WeatherClient::new(
            http.clone(),
            settings.weather.clone(),
            config.secrets.weather_api_key.clone(),
        );
        let search = SearchClient::new(http, settings.search.clone());

        Ok(Self::new(
            Box::new(completion),
            Box::new(weather),
            Box::new(search),
            settings,
        ))
    }

    /// Run a classified intent against its adapter
    pub fn execute(&self, intent: &Intent) -> ServiceResult {
        tracing::debug!(intent = intent.label(), "Dispatching");

        match intent {
            Intent::WeatherCurrent => self.weather.current_location_weather(),
            Intent::WeatherLocated { location } => self.weather.located_weather(location),
            Intent::WebSearch { query } => {
                let hits = self.search.search(query, self.search_max_results);
                Ok(render_hits(&hits))
            }
            Intent::ImageSearchRedirect => Ok(format!(
                "Opened image search. [Click here]({})",
                IMAGE_SEARCH_URL
            )),
            Intent::PictureExplainRedirect => Ok(format!(
                "Opened picture explanation. [Click here]({})",
                PICTURE_EXPLAIN_URL
            )),
            Intent::GenericCompletion { prompt } => {
                self.completion.complete(prompt, self.completion_max_tokens)
            }
        }
    }

    /// Query Processing: free text through the intent router
    pub fn process_query(&self, session: &mut Session, query: &str) -> String {
        let result = self.execute(&classify(query));
        session.record_result(Feature::QueryProcessing, query, &result);
        render_result(&result)
    }

    /// Weather Information: blank location means the caller's position
    pub fn weather_information(&self, session: &mut Session, location: &str) -> String {
        let (input, result) = if location.trim().is_empty() {
            (CURRENT_LOCATION, self.weather.current_location_weather())
        } else {
            (location, self.weather.located_weather(location))
        };
        session.record_result(Feature::WeatherInformation, input, &result);
        render_result(&result)
    }

    /// PDF Summarization over already-extracted text. Questions are answered
    /// one at a time in order; the whole batch is one history entry.
    pub fn summarize_document(
        &self,
        session: &mut Session,
        document_text: &str,
        questions: &[String],
    ) -> Vec<ServiceResult> {
        let answers: Vec<ServiceResult> = questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                tracing::debug!(index = i + 1, total = questions.len(), "Answering document question");
                self.completion.summarize(document_text, question)
            })
            .collect();

        let output = answers
            .iter()
            .map(render_result)
            .collect::<Vec<_>>()
            .join("\n");
        session.record(
            Feature::PdfSummarization,
            questions.join("\n"),
            output,
            answers.iter().all(|a| a.is_ok()),
        );
        answers
    }

    /// PDF Summarization from a file. An unreadable document is recorded and
    /// returned as a single error instead of being sent to the model.
    pub fn summarize_pdf(
        &self,
        session: &mut Session,
        path: &Path,
        questions: &[String],
    ) -> Vec<ServiceResult> {
        match pdf::extract_text_from_path(path) {
            Ok(text) => self.summarize_document(session, &text, questions),
            Err(e) => {
                tracing::warn!("{}", e);
                let result = Err(e);
                session.record_result(Feature::PdfSummarization, questions.join("\n"), &result);
                vec![result]
            }
        }
    }

    pub fn image_search(&self, session: &mut Session) -> String {
        session.record(Feature::ImageSearch, NO_INPUT, "Opened image search.", true);
        format!("[Click here to open image search]({})", IMAGE_SEARCH_URL)
    }

    pub fn picture_explanation(&self, session: &mut Session) -> String {
        session.record(
            Feature::PictureExplanation,
            NO_INPUT,
            "Opened picture explanation.",
            true,
        );
        format!(
            "[Click here to open picture explanation]({})",
            PICTURE_EXPLAIN_URL
        )
    }
}

/// Split a block of questions into non-blank lines
pub fn split_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
