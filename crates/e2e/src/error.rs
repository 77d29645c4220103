//! Error types for E2E testing

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("All {methods} detection methods failed within {budget_ms}ms")]
    DetectionExhausted { methods: usize, budget_ms: u64 },

    #[error("Response detected but no content could be captured: {0}")]
    ContentUnavailable(String),

    #[error("Validation failed for {test}: {reasons}")]
    ValidationFailed { test: String, reasons: String },

    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Playwright not found. Install with: npm install playwright")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Failures reported by a [`crate::page::PageAccessor`].
///
/// The detector treats every variant as "this method did not fire" and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("driver error: {0}")]
    Driver(String),
}

pub type PageResult<T> = Result<T, PageError>;
