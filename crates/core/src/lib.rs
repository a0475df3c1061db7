//! Multitool Assistant Core Library
//!
//! This crate provides the core functionality behind the `multitool` CLI:
//! - Keyword intent classification
//! - Service adapters (LLM completion/summarization, weather, web search)
//! - PDF text extraction
//! - Per-session history and feature dispatch

pub mod types;

pub mod config;
pub mod history;
pub mod intent;
pub mod llm;
pub mod pdf;
pub mod router;
pub mod search;
pub mod weather;

// Re-export commonly used types at crate root
pub use types::{render_hits, render_result, Feature, Intent, SearchHit, ServiceError, ServiceResult};

pub use config::{Config, Secrets, Settings};
pub use history::{HistoryEntry, Session};
pub use intent::classify;
pub use router::{split_questions, Dispatcher};
