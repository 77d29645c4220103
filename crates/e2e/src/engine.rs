//! Two-phase response engine
//!
//! ```text
//! PENDING ──phase 1──▶ DETECTED ──phase 2──▶ VALIDATED_PASS | VALIDATED_FAIL
//!    │
//!    └──────────────▶ EXHAUSTED
//! ```
//!
//! Nothing here returns `Err`: every failure is folded into the result records so
//! test code can branch on data.

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::detection::{DetectionConfig, DetectionMethod, DetectionPreset, ResponseDetector};
use crate::error::E2eError;
use crate::page::PageAccessor;
use crate::performance::{
    classify, PerformanceClassification, PerformanceThresholds, SlowPerformancePolicy,
};
use crate::validation::{validate_base, TestValidationResult, ValidationResult, ValidatorRegistry};

/// Outcome of waiting for one chat response. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRetryResult {
    pub success: bool,
    pub response_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_content: Option<String>,
    pub phase1_time: u64,
    pub phase2_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_by: Option<DetectionMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationResult>,
}

/// Terminal state of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvocationState {
    Exhausted,
    ValidatedPass,
    ValidatedFail,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationState::Exhausted => write!(f, "EXHAUSTED"),
            InvocationState::ValidatedPass => write!(f, "VALIDATED_PASS"),
            InvocationState::ValidatedFail => write!(f, "VALIDATED_FAIL"),
        }
    }
}

/// Everything the harness needs to know about one test's response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Display name; the scenario runner puts the scenario name here
    pub name: String,
    pub test_id: String,
    pub category: DetectionPreset,
    pub state: InvocationState,
    pub performance: PerformanceClassification,
    pub passed: bool,
    pub retry: AutoRetryResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<TestValidationResult>,
}

impl ScenarioOutcome {
    /// Human-readable reasons this outcome did not pass
    pub fn failure_summary(&self) -> Option<String> {
        if self.passed {
            return None;
        }
        let mut reasons = Vec::new();
        if let Some(error) = &self.retry.error {
            reasons.push(error.clone());
        }
        if let Some(validation) = &self.validation {
            reasons.extend(validation.failure_reasons.iter().cloned());
        }
        if reasons.is_empty() {
            reasons.push(format!("performance {}", self.performance));
        }
        Some(reasons.join("; "))
    }
}

/// Detects, validates and classifies chat responses
#[derive(Clone)]
pub struct ResponseEngine {
    detector: ResponseDetector,
    registry: Arc<ValidatorRegistry>,
    thresholds: PerformanceThresholds,
    slow_policy: SlowPerformancePolicy,
}

impl Default for ResponseEngine {
    fn default() -> Self {
        Self::new(ResponseDetector::default(), Arc::new(ValidatorRegistry::with_defaults()))
    }
}

impl ResponseEngine {
    pub fn new(detector: ResponseDetector, registry: Arc<ValidatorRegistry>) -> Self {
        Self {
            detector,
            registry,
            thresholds: PerformanceThresholds::default(),
            slow_policy: SlowPerformancePolicy::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: PerformanceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_slow_policy(mut self, policy: SlowPerformancePolicy) -> Self {
        self.slow_policy = policy;
        self
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    /// Wait for a response and score it with the base validator.
    pub async fn wait_for_response<P>(&self, page: &P, config: &DetectionConfig) -> AutoRetryResult
    where
        P: PageAccessor + ?Sized,
    {
        let start = Instant::now();
        let detection = self.detector.detect(page, config).await;
        let phase1_time = detection.elapsed.as_millis() as u64;

        if !detection.found {
            return AutoRetryResult {
                success: false,
                response_time: start.elapsed().as_millis() as u64,
                response_content: None,
                phase1_time,
                phase2_time: 0,
                detected_by: None,
                error: detection.error,
                validation_result: None,
            };
        }

        let content = match detection.content {
            Some(content) if !content.trim().is_empty() => content,
            _ => {
                let method = detection
                    .detected_by
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "detection".to_string());
                let error = E2eError::ContentUnavailable(format!(
                    "{} fired but the page had no response text",
                    method
                ))
                .to_string();
                warn!("{}", error);
                return AutoRetryResult {
                    success: false,
                    response_time: start.elapsed().as_millis() as u64,
                    response_content: None,
                    phase1_time,
                    phase2_time: 0,
                    detected_by: detection.detected_by,
                    error: Some(error),
                    validation_result: None,
                };
            }
        };

        let phase2_start = Instant::now();
        let validation_result = if config.enable_phase2_validation {
            Some(validate_base(&content))
        } else {
            None
        };
        let phase2_time = phase2_start.elapsed().as_millis() as u64;

        info!(
            "Response captured: {} chars, phase 1 {}ms, phase 2 {}ms",
            content.chars().count(),
            phase1_time,
            phase2_time
        );

        AutoRetryResult {
            success: true,
            response_time: start.elapsed().as_millis() as u64,
            response_content: Some(content),
            phase1_time,
            phase2_time,
            detected_by: detection.detected_by,
            error: None,
            validation_result,
        }
    }

    /// Full pipeline for one test: detect, validate for `test_id`, classify.
    pub async fn evaluate<P>(&self, page: &P, test_id: &str, config: &DetectionConfig) -> ScenarioOutcome
    where
        P: PageAccessor + ?Sized,
    {
        let category = self.registry.resolve(test_id).category();
        let retry = self.wait_for_response(page, config).await;

        // A detected response is validated even when its text is missing, so the
        // verdict carries hasContent=false instead of nothing.
        let validation = retry.detected_by.map(|_| {
            self.registry
                .validate(test_id, retry.response_content.as_deref().unwrap_or(""))
        });

        let (state, performance) = match &validation {
            None => (InvocationState::Exhausted, PerformanceClassification::Timeout),
            Some(v) => {
                let state = if retry.success && v.passed() {
                    InvocationState::ValidatedPass
                } else {
                    InvocationState::ValidatedFail
                };
                (state, classify(retry.response_time, &self.thresholds))
            }
        };

        let passed = state == InvocationState::ValidatedPass && !performance.is_failing(self.slow_policy);

        match performance {
            PerformanceClassification::Success => {}
            PerformanceClassification::SlowPerformance => warn!(
                "[{}] slow response: {}ms (success threshold {}ms)",
                test_id, retry.response_time, self.thresholds.success_threshold_ms
            ),
            PerformanceClassification::Timeout => warn!(
                "[{}] no usable response within {}ms",
                test_id, self.thresholds.max_timeout_ms
            ),
        }

        info!(
            "[{}] {} via {} in {}ms ({})",
            test_id,
            state,
            retry
                .detected_by
                .map(|m| m.to_string())
                .unwrap_or_else(|| "none".to_string()),
            retry.response_time,
            performance
        );

        ScenarioOutcome {
            name: test_id.to_string(),
            test_id: test_id.to_string(),
            category,
            state,
            performance,
            passed,
            retry,
            validation,
        }
    }
}
