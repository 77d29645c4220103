//! Phase 1: deciding that a chat response has arrived
//!
//! The backend exposes no reliable "done" signal, so the detector walks an ordered
//! list of heuristics and stops at the first one that fires. All methods share one
//! budget: each attempt gets whatever is left of `max_timeout_ms`, and a method that
//! does not apply to the current page (no spinner, no loading class) is skipped
//! without waiting.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{E2eError, PageResult};
use crate::page::{PageAccessor, WaitPredicate, PAGE_TEXT_SCRIPT};

pub const DEFAULT_MAX_TIMEOUT_MS: u64 = 120_000;

/// A single response-arrival heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionMethod {
    /// A visible loading indicator disappears
    LoadingHidden,
    /// A response container shows more than a few characters of text
    ResponseVisible,
    /// One new message element is added to the conversation
    MessageCount,
    /// A completion marker string is rendered
    CompletionText,
    /// The loading class is removed from the chat root
    NoLoadingClass,
}

impl DetectionMethod {
    pub const ALL: [DetectionMethod; 5] = [
        DetectionMethod::LoadingHidden,
        DetectionMethod::NoLoadingClass,
        DetectionMethod::ResponseVisible,
        DetectionMethod::MessageCount,
        DetectionMethod::CompletionText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::LoadingHidden => "LOADING_HIDDEN",
            DetectionMethod::ResponseVisible => "RESPONSE_VISIBLE",
            DetectionMethod::MessageCount => "MESSAGE_COUNT",
            DetectionMethod::CompletionText => "COMPLETION_TEXT",
            DetectionMethod::NoLoadingClass => "NO_LOADING_CLASS",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-invocation detection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Budget shared by every method in the chain
    pub max_timeout_ms: u64,

    /// Methods in the order they are tried
    pub phase1_methods: Vec<DetectionMethod>,

    /// Score the captured content with the base validator
    #[serde(default = "default_true")]
    pub enable_phase2_validation: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_timeout_ms: DEFAULT_MAX_TIMEOUT_MS,
            phase1_methods: DetectionMethod::ALL.to_vec(),
            enable_phase2_validation: true,
        }
    }
}

impl DetectionConfig {
    pub fn new(methods: Vec<DetectionMethod>) -> Self {
        Self {
            phase1_methods: methods,
            ..Default::default()
        }
    }

    pub fn with_max_timeout_ms(mut self, ms: u64) -> Self {
        self.max_timeout_ms = ms;
        self
    }

    pub fn with_phase2_validation(mut self, enabled: bool) -> Self {
        self.enable_phase2_validation = enabled;
        self
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }
}

/// Named detection setups per test category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionPreset {
    MarketStatus,
    TickerAnalysis,
    ButtonTemplate,
}

impl DetectionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionPreset::MarketStatus => "market-status",
            DetectionPreset::TickerAnalysis => "ticker-analysis",
            DetectionPreset::ButtonTemplate => "button-template",
        }
    }

    /// Method order for this category.
    ///
    /// Market status answers are short and usually land before the spinner is
    /// noticed, so the content check runs first. Ticker analysis streams for a
    /// long time and uses every signal.
    pub fn methods(&self) -> Vec<DetectionMethod> {
        use DetectionMethod::*;
        match self {
            DetectionPreset::MarketStatus => {
                vec![ResponseVisible, LoadingHidden, MessageCount, CompletionText]
            }
            DetectionPreset::TickerAnalysis => {
                vec![LoadingHidden, NoLoadingClass, ResponseVisible, MessageCount, CompletionText]
            }
            DetectionPreset::ButtonTemplate => {
                vec![MessageCount, LoadingHidden, ResponseVisible, CompletionText]
            }
        }
    }

    pub fn config(&self) -> DetectionConfig {
        DetectionConfig::new(self.methods())
    }
}

impl fmt::Display for DetectionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionPreset {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "market-status" => Ok(DetectionPreset::MarketStatus),
            "ticker-analysis" => Ok(DetectionPreset::TickerAnalysis),
            "button-template" => Ok(DetectionPreset::ButtonTemplate),
            other => Err(E2eError::ConfigurationInvalid(format!(
                "unknown detection preset '{}'",
                other
            ))),
        }
    }
}

/// Selectors and marker strings the heuristics watch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSelectors {
    pub loading: Vec<String>,
    pub response: Vec<String>,
    pub message: String,
    pub completion_markers: Vec<String>,
    pub root: String,
    pub loading_class: String,
    pub min_response_text_len: usize,
}

impl Default for DetectionSelectors {
    fn default() -> Self {
        Self {
            loading: to_strings(&[
                r#"[data-testid="loading-indicator"]"#,
                ".loading-indicator",
                ".typing-indicator",
                ".spinner",
                r#"[aria-busy="true"]"#,
            ]),
            response: to_strings(&[
                r#"[data-testid="assistant-message"]:last-of-type"#,
                ".message.assistant:last-child",
                ".bot-message:last-child",
                r#"[data-role="assistant"]:last-child"#,
            ]),
            message: r#"[data-testid="chat-message"], .message"#.to_string(),
            completion_markers: to_strings(&[
                "Analysis complete",
                "Response complete",
                "Data as of",
                "Not financial advice",
            ]),
            root: r#"[data-testid="chat-container"]"#.to_string(),
            loading_class: "loading".to_string(),
            min_response_text_len: 10,
        }
    }
}

impl DetectionSelectors {
    /// Selector matching the chat root only while it carries the loading class
    pub fn loading_root_selector(&self) -> String {
        format!("{}.{}", self.root, self.loading_class)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Result of a Phase 1 run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOutcome {
    pub found: bool,
    /// Content snapshot taken right after the winning method fired
    pub content: Option<String>,
    pub detected_by: Option<DetectionMethod>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

enum MethodOutcome {
    Detected,
    NotApplicable,
}

/// Runs the Phase 1 fallback chain against a page
#[derive(Debug, Clone, Default)]
pub struct ResponseDetector {
    selectors: DetectionSelectors,
}

impl ResponseDetector {
    pub fn new(selectors: DetectionSelectors) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &DetectionSelectors {
        &self.selectors
    }

    /// Try each configured method in order until one signals a response.
    pub async fn detect<P>(&self, page: &P, config: &DetectionConfig) -> DetectionOutcome
    where
        P: PageAccessor + ?Sized,
    {
        let start = Instant::now();
        let budget = config.max_timeout();
        let total = config.phase1_methods.len();

        info!(
            "Phase 1: {} detection method(s), budget {}ms",
            total, config.max_timeout_ms
        );

        for (index, method) in config.phase1_methods.iter().enumerate() {
            let remaining = budget.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                warn!(
                    "Detection budget spent before {} ({}/{}), aborting chain",
                    method,
                    index + 1,
                    total
                );
                break;
            }

            debug!(
                "Trying {} ({}/{}) with {}ms remaining",
                method,
                index + 1,
                total,
                remaining.as_millis()
            );

            match self.attempt(page, *method, remaining).await {
                Ok(MethodOutcome::Detected) => {
                    let elapsed = start.elapsed();
                    info!("Response detected via {} after {}ms", method, elapsed.as_millis());
                    let content = self.snapshot(page).await;
                    return DetectionOutcome {
                        found: true,
                        content,
                        detected_by: Some(*method),
                        error: None,
                        elapsed,
                    };
                }
                Ok(MethodOutcome::NotApplicable) => {
                    debug!("{} not applicable, skipping", method);
                }
                Err(e) => {
                    debug!("{} did not fire: {}", method, e);
                }
            }
        }

        let error = E2eError::DetectionExhausted {
            methods: total,
            budget_ms: config.max_timeout_ms,
        }
        .to_string();
        warn!("{}", error);

        DetectionOutcome {
            found: false,
            content: None,
            detected_by: None,
            error: Some(error),
            elapsed: start.elapsed(),
        }
    }

    async fn attempt<P>(
        &self,
        page: &P,
        method: DetectionMethod,
        remaining: Duration,
    ) -> PageResult<MethodOutcome>
    where
        P: PageAccessor + ?Sized,
    {
        let selectors = &self.selectors;

        match method {
            DetectionMethod::LoadingHidden => {
                for selector in &selectors.loading {
                    if page.is_visible(selector, Duration::ZERO).await? {
                        debug!("Loading indicator '{}' visible, waiting for it to hide", selector);
                        let predicate = WaitPredicate::Hidden {
                            selector: selector.clone(),
                        };
                        page.wait_for_function(&predicate, remaining).await?;
                        return Ok(MethodOutcome::Detected);
                    }
                }
                Ok(MethodOutcome::NotApplicable)
            }
            DetectionMethod::ResponseVisible => {
                let predicate = WaitPredicate::VisibleWithText {
                    selectors: selectors.response.clone(),
                    min_text_len: selectors.min_response_text_len,
                };
                page.wait_for_function(&predicate, remaining).await?;
                Ok(MethodOutcome::Detected)
            }
            DetectionMethod::MessageCount => {
                let baseline = page.count(&selectors.message).await?;
                debug!("Message baseline: {}", baseline);
                let predicate = WaitPredicate::CountEquals {
                    selector: selectors.message.clone(),
                    expected: baseline + 1,
                };
                page.wait_for_function(&predicate, remaining).await?;
                Ok(MethodOutcome::Detected)
            }
            DetectionMethod::CompletionText => {
                let predicate = WaitPredicate::TextVisible {
                    texts: selectors.completion_markers.clone(),
                };
                page.wait_for_function(&predicate, remaining).await?;
                Ok(MethodOutcome::Detected)
            }
            DetectionMethod::NoLoadingClass => {
                let marked = selectors.loading_root_selector();
                if page.count(&marked).await? == 0 {
                    return Ok(MethodOutcome::NotApplicable);
                }
                page.wait_for_function(&WaitPredicate::Absent { selector: marked }, remaining)
                    .await?;
                Ok(MethodOutcome::Detected)
            }
        }
    }

    /// Capture the response text once; Phase 2 never re-reads the page.
    async fn snapshot<P>(&self, page: &P) -> Option<String>
    where
        P: PageAccessor + ?Sized,
    {
        for selector in &self.selectors.response {
            match page.text_content(selector).await {
                Ok(Some(text)) if !text.trim().is_empty() => return Some(text),
                Ok(_) => {}
                Err(e) => debug!("Snapshot via '{}' failed: {}", selector, e),
            }
        }

        match page.evaluate(PAGE_TEXT_SCRIPT).await {
            Ok(serde_json::Value::String(text)) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not read page text: {}", e);
                None
            }
        }
    }
}
