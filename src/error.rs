// src/error.rs

//! Unified error handling for the feed service.

use std::fmt;

use thiserror::Error;

/// Result type alias for feed service operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed (transport, timeout, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Listing page answered with a non-success status
    #[error("Fetch failed for {url}: status {status}")]
    Fetch { url: String, status: u16 },

    /// Required field missing or malformed in a listing page
    #[error("Parsing error: {0}")]
    Parsing(#[from] ParsingFault),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background crawl task panicked or was cancelled
    #[error("Crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No events could be produced for a performer
    #[error("Events unavailable for {actor}: {message}")]
    Unavailable { actor: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unavailable error for a performer.
    pub fn unavailable(actor: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Unavailable {
            actor: actor.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error came from talking to or reading the source site.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Fetch { .. } | Self::Parsing(_) | Self::Unavailable { .. }
        )
    }
}

/// Location-annotated parse failure.
///
/// `layers` records the path through the document (e.g. `li.clearfix[3]`)
/// where the fault happened. The same type describes both hard faults, which
/// abort a page, and soft faults, which are carried as warnings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("url={url} layers={layers:?} message={message}")]
pub struct ParsingFault {
    pub url: String,
    pub layers: Vec<String>,
    pub message: String,
}

impl ParsingFault {
    /// Create a fault rooted at a document URL with no layers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            layers: Vec::new(),
            message: String::new(),
        }
    }

    /// Return a copy with one more layer appended.
    pub fn layer(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.layers.push(name.into());
        next
    }

    /// Return a copy carrying the given message.
    pub fn with_message(&self, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..self.clone()
        }
    }
}
