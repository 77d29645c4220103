//! Phase 2: scoring captured response content
//!
//! [`validate_base`] scores any text for generic financial signal. The
//! [`registry`] layers per-test keyword checks on top of it.

pub mod registry;
pub mod vocab;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use registry::{
    normalize_test_name, validate_response_by_test_name, Check, CheckOutcome, CheckRule,
    KeywordValidator, ResponseValidator, TestStatus, TestValidationResult, ValidatorRegistry,
};

/// Content must be longer than this many characters to be valid
pub const MIN_VALID_CONTENT_CHARS: usize = 50;

/// Distinct finance keywords needed for `has_financial_content`
pub const MIN_FINANCIAL_MATCHES: usize = 2;

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,5}\b").expect("ticker pattern is valid"));

/// Generic content score, independent of which test produced the response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub has_financial_content: bool,
    pub has_emoji_indicators: bool,
    /// Length in characters
    pub content_length: usize,
    pub detected_emojis: Vec<String>,
    pub detected_tickers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

/// Score `content` for financial keywords, emoji indicators and tickers.
pub fn validate_base(content: &str) -> ValidationResult {
    if content.trim().is_empty() {
        return ValidationResult {
            content_length: content.chars().count(),
            error_details: Some("Response content is empty".to_string()),
            ..Default::default()
        };
    }

    let lower = content.to_lowercase();
    let content_length = content.chars().count();

    let financial_matches = vocab::matched_terms(&lower, vocab::FINANCE_KEYWORDS);
    let has_financial_content = financial_matches.len() >= MIN_FINANCIAL_MATCHES;

    let detected_emojis: Vec<String> = vocab::FINANCIAL_EMOJIS
        .iter()
        .filter(|emoji| content.contains(*emoji))
        .map(|emoji| emoji.to_string())
        .collect();
    let has_emoji_indicators = !detected_emojis.is_empty();

    let detected_tickers = extract_tickers(content);

    let is_valid = has_financial_content
        && has_emoji_indicators
        && content_length > MIN_VALID_CONTENT_CHARS;

    let error_details = if is_valid {
        None
    } else {
        let mut missing = Vec::new();
        if !has_financial_content {
            missing.push(format!(
                "{} of {} finance keywords",
                financial_matches.len(),
                MIN_FINANCIAL_MATCHES
            ));
        }
        if !has_emoji_indicators {
            missing.push("no financial emoji".to_string());
        }
        if content_length <= MIN_VALID_CONTENT_CHARS {
            missing.push(format!("{} chars", content_length));
        }
        Some(missing.join(", "))
    };

    ValidationResult {
        is_valid,
        has_financial_content,
        has_emoji_indicators,
        content_length,
        detected_emojis,
        detected_tickers,
        error_details,
    }
}

/// Uppercase 2-5 letter tokens that are not common English words, first-seen order.
pub fn extract_tickers(content: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for token in TICKER_RE.find_iter(content).map(|m| m.as_str()) {
        if vocab::TICKER_STOP_WORDS.contains(&token) {
            continue;
        }
        if !tickers.iter().any(|t| t == token) {
            tickers.push(token.to_string());
        }
    }
    tickers
}
