//! Error types for Newsdesk.
//!
//! Library crates use [`NewsdeskError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Newsdesk operations.
#[derive(Debug, thiserror::Error)]
pub enum NewsdeskError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP error (client build, connect, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The search provider rejected the request or returned an unreadable body.
    #[error("search error: {0}")]
    Search(String),

    /// Research produced no usable article content for the topic.
    #[error("degraded input: no usable articles found for topic '{topic}'")]
    DegradedInput { topic: String },

    /// The text-generation provider failed before producing output.
    #[error("generation error: {0}")]
    Generation(String),

    /// Generator output did not conform to the analysis report schema.
    #[error("structured output error: {message}")]
    StructuredOutput { message: String },

    /// The report could not be delivered to its channel.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad topic, invalid address, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NewsdeskError>;

impl NewsdeskError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a structured-output error from any displayable message.
    pub fn structured_output(msg: impl Into<String>) -> Self {
        Self::StructuredOutput {
            message: msg.into(),
        }
    }

    /// Signal that research yielded nothing usable for `topic`.
    pub fn degraded_input(topic: impl Into<String>) -> Self {
        Self::DegradedInput {
            topic: topic.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly label for summaries and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Network(_) => "network",
            Self::Search(_) => "search",
            Self::DegradedInput { .. } => "degraded_input",
            Self::Generation(_) => "generation",
            Self::StructuredOutput { .. } => "structured_output",
            Self::Delivery(_) => "delivery",
            Self::Io { .. } => "io",
            Self::Validation { .. } => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = NewsdeskError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = NewsdeskError::degraded_input("Topic B");
        assert!(err.to_string().contains("'Topic B'"));

        let err = NewsdeskError::structured_output("overall_sentiment 'meh' is not allowed");
        assert!(err.to_string().starts_with("structured output error"));
    }

    #[test]
    fn error_kind_labels() {
        assert_eq!(NewsdeskError::degraded_input("x").kind(), "degraded_input");
        assert_eq!(NewsdeskError::Delivery("503".into()).kind(), "delivery");
        assert_eq!(
            NewsdeskError::structured_output("bad").kind(),
            "structured_output"
        );
    }
}
