//! Test-specific validators keyed by test id
//!
//! Every validator is a list of named checks. Required checks decide PASS/FAIL and
//! contribute a failure reason; advisory checks are recorded and logged only.
//! New categories are added with [`ValidatorRegistry::register`] without touching
//! detection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::vocab;
use super::{validate_base, ValidationResult};
use crate::detection::DetectionPreset;
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "PASS"),
            TestStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Verdict of a test-specific validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestValidationResult {
    pub test_name: String,
    pub status: TestStatus,
    pub response_content: String,
    pub validation_details: ValidationResult,
    pub specific_checks: BTreeMap<String, bool>,
    pub failure_reasons: Vec<String>,
}

impl TestValidationResult {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Pass
    }

    /// `Err(ValidationFailed)` for a FAIL verdict, for callers that want to use `?`
    pub fn into_result(self) -> E2eResult<Self> {
        if self.passed() {
            return Ok(self);
        }
        Err(E2eError::ValidationFailed {
            test: self.test_name,
            reasons: self.failure_reasons.join("; "),
        })
    }
}

/// How a single check is evaluated
#[derive(Debug, Clone, Copy)]
pub enum CheckRule {
    /// Content is not blank
    NotBlank,
    /// At least one term is present
    AnyTerm(&'static [&'static str]),
    /// At least `n` distinct terms are present
    MinTerms(&'static [&'static str], usize),
    /// At least `n` distinct tickers were detected
    MinTickers(usize),
    /// The base validator found financial content
    FinancialContent,
    /// At least one financial emoji
    EmojiPresent,
    /// Longer than `n` characters
    MinChars(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct Check {
    pub key: &'static str,
    pub rule: CheckRule,
    pub required: bool,
    pub reason: &'static str,
}

impl Check {
    pub const fn required(key: &'static str, rule: CheckRule, reason: &'static str) -> Self {
        Self { key, rule, required: true, reason }
    }

    pub const fn advisory(key: &'static str, rule: CheckRule) -> Self {
        Self { key, rule, required: false, reason: "" }
    }

    fn evaluate(&self, lower: &str, base: &ValidationResult) -> CheckOutcome {
        let passed = match self.rule {
            CheckRule::NotBlank => !lower.trim().is_empty(),
            CheckRule::AnyTerm(terms) => terms.iter().any(|t| vocab::contains_term(lower, t)),
            CheckRule::MinTerms(terms, n) => vocab::matched_terms(lower, terms).len() >= n,
            CheckRule::MinTickers(n) => base.detected_tickers.len() >= n,
            CheckRule::FinancialContent => base.has_financial_content,
            CheckRule::EmojiPresent => base.has_emoji_indicators,
            CheckRule::MinChars(n) => base.content_length > n,
        };

        let reason = match self.rule {
            CheckRule::MinChars(n) => format!(
                "Response too short: {} chars (need more than {})",
                base.content_length, n
            ),
            CheckRule::MinTickers(n) => format!(
                "Expected at least {} tickers, found {}",
                n,
                base.detected_tickers.len()
            ),
            _ => self.reason.to_string(),
        };

        CheckOutcome {
            key: self.key.to_string(),
            passed,
            required: self.required,
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub key: String,
    pub passed: bool,
    pub required: bool,
    pub reason: String,
}

/// A validator for one test category
pub trait ResponseValidator: Send + Sync {
    fn name(&self) -> &str;

    /// Detection preset tests of this kind run with
    fn category(&self) -> DetectionPreset;

    /// Evaluate every check against `content`. `base` is the generic score of the same text.
    fn evaluate(&self, content: &str, base: &ValidationResult) -> Vec<CheckOutcome>;
}

/// Validator defined entirely by a static check table
#[derive(Debug, Clone)]
pub struct KeywordValidator {
    name: &'static str,
    category: DetectionPreset,
    checks: &'static [Check],
}

impl KeywordValidator {
    pub const fn new(name: &'static str, category: DetectionPreset, checks: &'static [Check]) -> Self {
        Self { name, category, checks }
    }
}

impl ResponseValidator for KeywordValidator {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> DetectionPreset {
        self.category
    }

    fn evaluate(&self, content: &str, base: &ValidationResult) -> Vec<CheckOutcome> {
        let lower = content.to_lowercase();
        self.checks.iter().map(|check| check.evaluate(&lower, base)).collect()
    }
}

const HAS_CONTENT: Check = Check::required("hasContent", CheckRule::NotBlank, "Response content is empty");
const HAS_EMOJI: Check = Check::required(
    "hasEmojiIndicators",
    CheckRule::EmojiPresent,
    "No financial emoji indicators (📈 📉 💰 📊 ...)",
);

static MARKET_STATUS_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasMarketStatusContent",
        CheckRule::AnyTerm(vocab::MARKET_STATUS_TERMS),
        "No market status keywords (market open/closed, trading session, NYSE, NASDAQ)",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(50), ""),
    Check::advisory("hasExchangeInfo", CheckRule::AnyTerm(vocab::EXCHANGE_TERMS)),
    Check::advisory("hasTimeReference", CheckRule::AnyTerm(vocab::TIME_TERMS)),
];

static NVDA_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasNvdaReference",
        CheckRule::AnyTerm(vocab::NVDA_TERMS),
        "Response does not mention NVDA or NVIDIA",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(150), ""),
    Check::advisory("hasPriceInfo", CheckRule::AnyTerm(vocab::PRICE_TERMS)),
    Check::advisory("hasSemiconductorContext", CheckRule::AnyTerm(vocab::SEMICONDUCTOR_TERMS)),
    Check::advisory("hasVolumeInfo", CheckRule::AnyTerm(vocab::VOLUME_TERMS)),
    Check::advisory("hasSentiment", CheckRule::AnyTerm(vocab::SENTIMENT_TERMS)),
];

static SPY_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasSpyReference",
        CheckRule::AnyTerm(vocab::SPY_TERMS),
        "Response does not mention SPY, S&P 500 or SPDR",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(150), ""),
    Check::advisory("hasEtfContext", CheckRule::AnyTerm(vocab::ETF_TERMS)),
    Check::advisory("hasSectorInfo", CheckRule::AnyTerm(vocab::SECTOR_TERMS)),
    Check::advisory("hasPriceInfo", CheckRule::AnyTerm(vocab::PRICE_TERMS)),
];

static GME_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasGmeReference",
        CheckRule::AnyTerm(vocab::GME_TERMS),
        "Response does not mention GME or GameStop",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(150), ""),
    Check::advisory("hasVolatilityContext", CheckRule::AnyTerm(vocab::VOLATILITY_TERMS)),
    Check::advisory("hasPriceInfo", CheckRule::AnyTerm(vocab::PRICE_TERMS)),
    Check::advisory("hasSentiment", CheckRule::AnyTerm(vocab::SENTIMENT_TERMS)),
];

static MULTI_TICKER_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required("hasMultipleTickers", CheckRule::MinTickers(2), ""),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(200), ""),
    Check::advisory("hasComparison", CheckRule::AnyTerm(vocab::COMPARISON_TERMS)),
    Check::advisory("hasPriceInfo", CheckRule::AnyTerm(vocab::PRICE_TERMS)),
];

static STOCK_SNAPSHOT_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasSnapshotContent",
        CheckRule::MinTerms(vocab::SNAPSHOT_TERMS, 2),
        "Snapshot lacks quote fields (price, volume, open/close, high/low, market cap)",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(150), ""),
    Check::advisory("hasTicker", CheckRule::MinTickers(1)),
    Check::advisory("hasPercentChange", CheckRule::AnyTerm(vocab::PERCENT_TERMS)),
];

static SUPPORT_RESISTANCE_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasSupportResistance",
        CheckRule::MinTerms(vocab::SUPPORT_RESISTANCE_TERMS, 2),
        "Response must discuss both support and resistance",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(150), ""),
    Check::advisory("hasPriceLevels", CheckRule::AnyTerm(vocab::PRICE_LEVEL_TERMS)),
    Check::advisory("hasTechnicalContext", CheckRule::AnyTerm(vocab::TECHNICAL_TERMS)),
];

static TECHNICAL_ANALYSIS_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasTechnicalIndicators",
        CheckRule::MinTerms(vocab::TECHNICAL_TERMS, 2),
        "Fewer than two technical indicators (RSI, MACD, moving averages, momentum...)",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(200), ""),
    Check::advisory("hasTradingSignal", CheckRule::AnyTerm(vocab::SIGNAL_TERMS)),
    Check::advisory("hasSentiment", CheckRule::AnyTerm(vocab::SENTIMENT_TERMS)),
];

static GENERIC_CHECKS: &[Check] = &[
    HAS_CONTENT,
    Check::required(
        "hasFinancialContent",
        CheckRule::FinancialContent,
        "Fewer than two finance keywords",
    ),
    HAS_EMOJI,
    Check::required("hasSufficientLength", CheckRule::MinChars(50), ""),
];

/// Upper-case, dash-separated form of a test name.
///
/// `"test_b001 market status"` becomes `"TEST-B001-MARKET-STATUS"`.
pub fn normalize_test_name(name: &str) -> String {
    name.trim()
        .to_uppercase()
        .split(|c: char| !c.is_alphanumeric() && c != '&')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Maps test ids and aliases to validators
pub struct ValidatorRegistry {
    validators: Vec<Arc<dyn ResponseValidator>>,
    aliases: HashMap<String, usize>,
    fallback: Arc<dyn ResponseValidator>,
}

impl ValidatorRegistry {
    /// Registry with only a fallback validator
    pub fn new(fallback: Arc<dyn ResponseValidator>) -> Self {
        Self {
            validators: Vec::new(),
            aliases: HashMap::new(),
            fallback,
        }
    }

    /// Registry with the built-in FinChat test categories
    pub fn with_defaults() -> Self {
        use DetectionPreset::*;

        let mut registry = Self::new(Arc::new(KeywordValidator::new(
            "generic",
            TickerAnalysis,
            GENERIC_CHECKS,
        )));

        let builtin: [(&[&str], KeywordValidator); 8] = [
            (
                &["B001", "MARKET-STATUS"],
                KeywordValidator::new("market-status", MarketStatus, MARKET_STATUS_CHECKS),
            ),
            (
                &["B002", "NVDA", "NVDA-ANALYSIS"],
                KeywordValidator::new("nvda-analysis", TickerAnalysis, NVDA_CHECKS),
            ),
            (
                &["B003", "SPY", "SPY-ANALYSIS"],
                KeywordValidator::new("spy-analysis", TickerAnalysis, SPY_CHECKS),
            ),
            (
                &["B004", "GME", "GME-ANALYSIS"],
                KeywordValidator::new("gme-analysis", TickerAnalysis, GME_CHECKS),
            ),
            (
                &["B005", "MULTI-TICKER", "MULTI-TICKER-ANALYSIS"],
                KeywordValidator::new("multi-ticker", TickerAnalysis, MULTI_TICKER_CHECKS),
            ),
            (
                &["B006", "STOCK-SNAPSHOT", "BUTTON-SNAPSHOT"],
                KeywordValidator::new("stock-snapshot", ButtonTemplate, STOCK_SNAPSHOT_CHECKS),
            ),
            (
                &["B007", "SUPPORT-RESISTANCE", "BUTTON-SUPPORT-RESISTANCE"],
                KeywordValidator::new("support-resistance", ButtonTemplate, SUPPORT_RESISTANCE_CHECKS),
            ),
            (
                &["B008", "TECHNICAL-ANALYSIS", "BUTTON-TECHNICAL-ANALYSIS"],
                KeywordValidator::new("technical-analysis", ButtonTemplate, TECHNICAL_ANALYSIS_CHECKS),
            ),
        ];

        for (aliases, validator) in builtin {
            registry.register(aliases, Arc::new(validator));
        }
        registry
    }

    /// Add a validator reachable under each of `aliases`. Later registrations win.
    pub fn register(&mut self, aliases: &[&str], validator: Arc<dyn ResponseValidator>) {
        let index = self.validators.len();
        self.validators.push(validator);
        for alias in aliases {
            self.aliases.insert(normalize_test_name(alias), index);
        }
    }

    /// Validator for `test_name`, or the fallback.
    ///
    /// Tries the whole normalized name, then every contiguous run of dash-separated
    /// tokens after a `TEST-` prefix, longest run first and leftmost first among equals.
    /// `test_b003_spy_levels` resolves to B003 and `stock_snapshot_gme` to the
    /// snapshot validator rather than GME.
    pub fn resolve(&self, test_name: &str) -> &dyn ResponseValidator {
        let normalized = normalize_test_name(test_name);
        let unprefixed = normalized.strip_prefix("TEST-").unwrap_or(&normalized);
        let tokens: Vec<&str> = unprefixed.split('-').collect();

        let index = self.aliases.get(&normalized).or_else(|| {
            (1..=tokens.len()).rev().find_map(|len| {
                tokens
                    .windows(len)
                    .find_map(|run| self.aliases.get(&run.join("-")))
            })
        });

        match index {
            Some(&i) => self.validators[i].as_ref(),
            None => self.fallback.as_ref(),
        }
    }

    /// Run the base validator and the test-specific checks for `test_name`.
    pub fn validate(&self, test_name: &str, content: &str) -> TestValidationResult {
        let validator = self.resolve(test_name);
        let base = validate_base(content);
        let outcomes = validator.evaluate(content, &base);

        let mut specific_checks = BTreeMap::new();
        let mut failure_reasons = Vec::new();

        for outcome in outcomes {
            if !outcome.passed {
                if outcome.required {
                    warn!("[{}] {} failed: {}", test_name, outcome.key, outcome.reason);
                    failure_reasons.push(outcome.reason.clone());
                } else {
                    debug!("[{}] advisory check {} not met", test_name, outcome.key);
                }
            }
            specific_checks.insert(outcome.key, outcome.passed);
        }

        let status = if failure_reasons.is_empty() {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        };

        info!(
            "[{}] {} validator: {} ({} chars, {} failing check(s))",
            test_name,
            validator.name(),
            status,
            base.content_length,
            failure_reasons.len()
        );

        TestValidationResult {
            test_name: test_name.to_string(),
            status,
            response_content: content.to_string(),
            validation_details: base,
            specific_checks,
            failure_reasons,
        }
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

static DEFAULT_REGISTRY: Lazy<ValidatorRegistry> = Lazy::new(ValidatorRegistry::with_defaults);

/// Validate `content` with the built-in validator for `test_name`.
pub fn validate_response_by_test_name(test_name: &str, content: &str) -> TestValidationResult {
    DEFAULT_REGISTRY.validate(test_name, content)
}
