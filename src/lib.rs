//! Catalog-Ripple: a concurrent catalog page harvester
//!
//! This crate fetches listing pages from a video-catalog site, extracts one
//! record per listing item, and resolves each record's stream link from its
//! detail page with bounded concurrency, retry, and backoff.

pub mod catalog;
pub mod config;
pub mod pipeline;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Ripple operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upstream fetch failed for {url}: {kind} ({message})")]
    UpstreamFetch {
        url: String,
        kind: FetchErrorKind,
        message: String,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport failure classification for a single fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    #[error("request timed out")]
    Timeout,

    #[error("connection error")]
    ConnectionError,

    #[error("HTTP status {0}")]
    HttpStatusError(u16),

    #[error("gave up after {attempts} attempts, last error: {last}")]
    ExhaustedRetries {
        attempts: u32,
        last: Box<FetchErrorKind>,
    },
}

impl FetchErrorKind {
    /// Returns the cause of the final attempt, unwrapping retry exhaustion
    pub fn root(&self) -> &FetchErrorKind {
        match self {
            Self::ExhaustedRetries { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid path template: {0}")]
    InvalidTemplate(String),
}

/// Result type alias for Catalog-Ripple operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{CatalogRecord, PageQuery, PageResult, SweepResult};
pub use config::Config;
pub use pipeline::{CatalogPipeline, FanOutCoordinator, FetchOutcome, PageFetcher, RetryPolicy};
