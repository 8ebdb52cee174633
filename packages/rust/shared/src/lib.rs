//! Shared types, error model, and configuration for Newsdesk.
//!
//! This crate is the foundation depended on by all other Newsdesk crates.
//! It provides:
//! - [`NewsdeskError`]: the unified error type
//! - Domain types ([`Topic`], [`Article`], [`AnalysisReport`], [`Sentiment`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading, credential checks)

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChannelKind, DEFAULT_TOPICS, DeliveryConfig, HttpConfig, LlmConfig,
    SearchConfig, TOPICS_ENV_VAR, config_dir, config_file_path, init_config, load_config,
    load_config_from, parse_topics, read_secret, resolve_topics, validate_credentials,
};
pub use error::{NewsdeskError, Result};
pub use text::{ERROR_BODY_EXCERPT, excerpt};
pub use types::{AnalysisReport, Article, RawAnalysis, RunId, SENTIMENT_VALUES, Sentiment, Topic};
