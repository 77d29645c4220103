//! FinChat E2E Response Engine
//!
//! This crate decides, for each FinChat end-to-end test, when the chat UI has
//! finished answering a prompt and whether the answer is any good:
//! - Detects response completion through an ordered fallback chain of DOM checks
//!   that share one timeout budget
//! - Scores captured text with a base financial-content validator
//! - Dispatches test-specific validators by test id (`B001`, `TEST-B003`, ...)
//! - Classifies latency as SUCCESS / SLOW_PERFORMANCE / TIMEOUT
//! - Runs declarative YAML scenarios against a live page via a Playwright bridge
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scenario Runner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner<P: PageAccessor + ChatInput>                │
//! │    ├── trigger(spec) via ChatInput                          │
//! │    ├── ResponseEngine::evaluate(page, test_id, config)      │
//! │    │     ├── phase 1: ResponseDetector::detect              │
//! │    │     │     LOADING_HIDDEN → NO_LOADING_CLASS →          │
//! │    │     │     RESPONSE_VISIBLE → MESSAGE_COUNT →           │
//! │    │     │     COMPLETION_TEXT   (shared budget)            │
//! │    │     ├── phase 2: validate_base(content)                │
//! │    │     ├── ValidatorRegistry::validate(test_id, content)  │
//! │    │     └── classify(response_time)                        │
//! │    └── ResultCollector → test-results.json                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageAccessor                                               │
//! │    ├── PlaywrightPage (node bridge over CDP)                │
//! │    └── any scripted page (tests)                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod page;
pub mod performance;
pub mod playwright;
pub mod runner;
pub mod spec;
pub mod validation;

pub use config::HarnessConfig;
pub use detection::{
    DetectionConfig, DetectionMethod, DetectionOutcome, DetectionPreset, DetectionSelectors,
    ResponseDetector,
};
pub use engine::{AutoRetryResult, InvocationState, ResponseEngine, ScenarioOutcome};
pub use error::{E2eError, E2eResult, PageError, PageResult};
pub use page::{ChatInput, PageAccessor, WaitPredicate};
pub use performance::{
    classify, PerformanceClassification, PerformanceThresholds, SlowPerformancePolicy,
};
pub use runner::{ResultCollector, ScenarioRunner, SuiteSummary};
pub use spec::{ScenarioSpec, Trigger};
pub use validation::{
    validate_base, validate_response_by_test_name, TestStatus, TestValidationResult,
    ValidationResult, ValidatorRegistry,
};
