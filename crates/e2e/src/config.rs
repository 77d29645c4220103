//! Harness configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::detection::{DetectionPreset, DetectionSelectors};
use crate::error::{E2eError, E2eResult};
use crate::performance::{PerformanceThresholds, SlowPerformancePolicy};
use crate::playwright::PlaywrightConfig;

/// Harness configuration, usually read from `finchat-e2e.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Scenario specs directory
    pub specs_dir: PathBuf,

    /// Output directory for results
    pub output_dir: PathBuf,

    /// Latency bucket boundaries
    pub performance: PerformanceThresholds,

    /// Whether SLOW_PERFORMANCE fails a scenario
    pub slow_policy: SlowPerformancePolicy,

    /// Detection budget per preset, keyed by preset name (`market-status = 60000`)
    pub preset_timeouts: BTreeMap<String, u64>,

    /// Selectors the detector waits on
    pub selectors: DetectionSelectors,

    /// Browser bridge settings
    pub playwright: PlaywrightConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("tests/scenarios"),
            output_dir: PathBuf::from("test-results"),
            performance: PerformanceThresholds::default(),
            slow_policy: SlowPerformancePolicy::default(),
            preset_timeouts: BTreeMap::new(),
            selectors: DetectionSelectors::default(),
            playwright: PlaywrightConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> E2eResult<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject thresholds and budgets that cannot classify anything sensibly
    pub fn validate(&self) -> E2eResult<()> {
        self.performance.validate()?;

        for (name, ms) in &self.preset_timeouts {
            let preset: DetectionPreset = name.parse()?;
            if *ms == 0 {
                return Err(E2eError::ConfigurationInvalid(format!(
                    "timeout for preset {} must be positive",
                    preset
                )));
            }
            if *ms > self.performance.max_timeout_ms {
                return Err(E2eError::ConfigurationInvalid(format!(
                    "timeout for preset {} ({}ms) exceeds performance max_timeout_ms ({}ms)",
                    preset, ms, self.performance.max_timeout_ms
                )));
            }
        }

        if self.selectors.response.is_empty() {
            return Err(E2eError::ConfigurationInvalid(
                "at least one response selector is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Detection budget configured for `preset`, if any
    pub fn preset_timeout(&self, preset: DetectionPreset) -> Option<u64> {
        self.preset_timeouts.get(preset.as_str()).copied()
    }
}
