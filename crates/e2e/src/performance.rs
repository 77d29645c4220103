//! Latency buckets for response times

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::detection::DEFAULT_MAX_TIMEOUT_MS;
use crate::error::{E2eError, E2eResult};

pub const DEFAULT_SUCCESS_THRESHOLD_MS: u64 = 45_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceClassification {
    Success,
    SlowPerformance,
    Timeout,
}

impl PerformanceClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceClassification::Success => "SUCCESS",
            PerformanceClassification::SlowPerformance => "SLOW_PERFORMANCE",
            PerformanceClassification::Timeout => "TIMEOUT",
        }
    }

    /// Whether this bucket fails a test under `policy`. TIMEOUT always does.
    pub fn is_failing(&self, policy: SlowPerformancePolicy) -> bool {
        match self {
            PerformanceClassification::Success => false,
            PerformanceClassification::SlowPerformance => policy == SlowPerformancePolicy::Fail,
            PerformanceClassification::Timeout => true,
        }
    }
}

impl fmt::Display for PerformanceClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a SLOW_PERFORMANCE response means for the test verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlowPerformancePolicy {
    /// Log and report, do not fail
    #[default]
    Report,
    /// Treat like a timeout
    Fail,
}

/// Latency bucket boundaries (inclusive upper bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub success_threshold_ms: u64,
    pub max_timeout_ms: u64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            success_threshold_ms: DEFAULT_SUCCESS_THRESHOLD_MS,
            max_timeout_ms: DEFAULT_MAX_TIMEOUT_MS,
        }
    }
}

impl PerformanceThresholds {
    pub fn new(success_threshold_ms: u64, max_timeout_ms: u64) -> Self {
        Self { success_threshold_ms, max_timeout_ms }
    }

    /// `classify` does not call this; inconsistent thresholds still classify, just oddly.
    pub fn validate(&self) -> E2eResult<()> {
        if self.success_threshold_ms >= self.max_timeout_ms {
            return Err(E2eError::ConfigurationInvalid(format!(
                "success threshold ({}ms) must be below max timeout ({}ms)",
                self.success_threshold_ms, self.max_timeout_ms
            )));
        }
        Ok(())
    }
}

/// Bucket a response time.
pub fn classify(response_time_ms: u64, thresholds: &PerformanceThresholds) -> PerformanceClassification {
    if response_time_ms <= thresholds.success_threshold_ms {
        PerformanceClassification::Success
    } else if response_time_ms <= thresholds.max_timeout_ms {
        PerformanceClassification::SlowPerformance
    } else {
        PerformanceClassification::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0 => PerformanceClassification::Success ; "instant")]
    #[test_case(45_000 => PerformanceClassification::Success ; "at success threshold")]
    #[test_case(45_001 => PerformanceClassification::SlowPerformance ; "just over success threshold")]
    #[test_case(120_000 => PerformanceClassification::SlowPerformance ; "at max timeout")]
    #[test_case(120_001 => PerformanceClassification::Timeout ; "just over max timeout")]
    fn test_default_boundaries(ms: u64) -> PerformanceClassification {
        classify(ms, &PerformanceThresholds::default())
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = PerformanceThresholds::new(1_000, 2_000);
        assert_eq!(classify(1_500, &thresholds), PerformanceClassification::SlowPerformance);
        assert_eq!(classify(2_001, &thresholds), PerformanceClassification::Timeout);
    }

    #[test]
    fn test_slow_policy() {
        let slow = PerformanceClassification::SlowPerformance;
        assert!(!slow.is_failing(SlowPerformancePolicy::Report));
        assert!(slow.is_failing(SlowPerformancePolicy::Fail));
        assert!(PerformanceClassification::Timeout.is_failing(SlowPerformancePolicy::Report));
        assert!(!PerformanceClassification::Success.is_failing(SlowPerformancePolicy::Fail));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(PerformanceThresholds::default().validate().is_ok());
        assert!(PerformanceThresholds::new(120_000, 45_000).validate().is_err());
        assert!(PerformanceThresholds::new(5_000, 5_000).validate().is_err());
    }
}
