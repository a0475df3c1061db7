//! Session History
//!
//! A `Session` is created when an interactive session starts, passed by
//! `&mut` to every handler, and dropped when the session ends. Its history is
//! append-only: entries are never reordered, mutated or removed.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::types::{render_result, Feature, ServiceResult};

/// One past user action and its outcome
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub feature: Feature,
    pub input: String,
    pub output: String,
    /// False when the output is an error message
    pub success: bool,
    pub recorded_at: DateTime<Local>,
}

/// Per-session context holding the history log
#[derive(Debug, Default)]
pub struct Session {
    entries: Vec<HistoryEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plain-text record
    pub fn record(
        &mut self,
        feature: Feature,
        input: impl Into<String>,
        output: impl Into<String>,
        success: bool,
    ) {
        let entry = HistoryEntry {
            feature,
            input: input.into(),
            output: output.into(),
            success,
            recorded_at: Local::now(),
        };
        tracing::debug!(feature = %entry.feature, index = self.entries.len(), "history entry recorded");
        self.entries.push(entry);
    }

    /// Append the outcome of an adapter call
    pub fn record_result(&mut self, feature: Feature, input: impl Into<String>, result: &ServiceResult) {
        self.record(feature, input, render_result(result), result.is_ok());
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
