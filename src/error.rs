//! Error types for the scraper, the store, and the translation pipeline.
//!
//! Each stage gets its own enum so callers can decide at the item boundary
//! whether a failure is recorded in the store (translation, extraction) or
//! stops the run (configuration).

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was supplied through `--api-key`, `TRANSLATE_API_KEY`, or `.env`.
    #[error("missing translation API key: set TRANSLATE_API_KEY in the environment or a .env file")]
    MissingApiKey,

    /// The settings file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid YAML for [`crate::config::Settings`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The HTTP client could not be built from the settings.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A single chat-completion call failed.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The endpoint answered with a non-200 status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport failure: DNS, connect, timeout, or body read.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// A 200 response without `choices[0].message.content`.
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

impl TranslateError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslateError::Http { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            TranslateError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TranslateError::UnexpectedResponse(_) => false,
        }
    }
}

/// Reading or writing the article store failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under this key.
    #[error("article not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fetching or parsing a page from the source site failed.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid selector {0}")]
    Selector(String),
}

/// A batch or single-article run could not proceed.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The record has nothing to translate.
    #[error("no source paragraphs in {0}")]
    NoSourceParagraphs(String),

    /// The translated record could not be written back.
    #[error("failed to save {key}: {source}")]
    Save {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The per-article deadline passed; finished paragraphs were saved.
    #[error("timed out translating {0}")]
    Timeout(String),
}
