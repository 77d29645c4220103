//! Declarative YAML scenario specification

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detection::{DetectionConfig, DetectionMethod, DetectionPreset};
use crate::error::{E2eError, E2eResult};

/// One chat scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Test id used to pick the validator (`B001`, `TEST-B003`, `market-status`, ...)
    pub test_id: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Detection preset; defaults to the validator's category
    #[serde(default)]
    pub preset: Option<DetectionPreset>,

    /// Explicit method order, overriding the preset
    #[serde(default)]
    pub methods: Option<Vec<DetectionMethod>>,

    /// Detection budget override
    #[serde(default)]
    pub max_timeout_ms: Option<u64>,

    /// Score captured content with the base validator
    #[serde(default = "default_validate_content")]
    pub validate_content: bool,

    /// What makes the chat produce a response
    pub trigger: Trigger,
}

fn default_validate_content() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Trigger {
    /// Type a prompt and submit it
    Prompt { text: String },

    /// Click a template button
    Button { selector: String },

    /// The response is already on its way
    Wait,
}

impl ScenarioSpec {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::SpecParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all scenarios from a directory, sorted by name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Detection settings for this scenario.
    ///
    /// `category` is used when no preset is given; `preset_timeout_ms` comes from the
    /// harness config and loses to the scenario's own `max_timeout_ms`.
    pub fn detection_config(
        &self,
        category: DetectionPreset,
        preset_timeout_ms: Option<u64>,
    ) -> DetectionConfig {
        let preset = self.preset.unwrap_or(category);
        let mut config = preset.config();

        if let Some(methods) = &self.methods {
            config.phase1_methods = methods.clone();
        }
        if let Some(ms) = self.max_timeout_ms.or(preset_timeout_ms) {
            config.max_timeout_ms = ms;
        }
        config.enable_phase2_validation = self.validate_content;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_scenario() {
        let yaml = r#"
name: nvda-analysis
test_id: TEST-B002
description: Single ticker analysis for NVDA
tags:
  - ticker
  - smoke
trigger:
  action: prompt
  text: Give me a technical analysis of NVDA
"#;
        let spec = ScenarioSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "nvda-analysis");
        assert!(spec.validate_content);
        assert!(matches!(spec.trigger, Trigger::Prompt { .. }));

        let config = spec.detection_config(DetectionPreset::TickerAnalysis, None);
        assert_eq!(config.phase1_methods, DetectionPreset::TickerAnalysis.methods());
        assert_eq!(config.max_timeout_ms, 120_000);
    }

    #[test]
    fn test_overrides_win() {
        let yaml = r#"
name: snapshot-button
test_id: B006
preset: button-template
methods: [MESSAGE_COUNT, COMPLETION_TEXT]
max_timeout_ms: 30000
validate_content: false
trigger:
  action: button
  selector: '[data-testid="btn-stock-snapshot"]'
"#;
        let spec = ScenarioSpec::from_yaml(yaml).unwrap();
        let config = spec.detection_config(DetectionPreset::TickerAnalysis, Some(90_000));
        assert_eq!(
            config.phase1_methods,
            vec![DetectionMethod::MessageCount, DetectionMethod::CompletionText]
        );
        assert_eq!(config.max_timeout_ms, 30_000);
        assert!(!config.enable_phase2_validation);
    }

    #[test]
    fn test_preset_timeout_applies_without_override() {
        let yaml = r#"
name: market-open
test_id: B001
trigger:
  action: wait
"#;
        let spec = ScenarioSpec::from_yaml(yaml).unwrap();
        let config = spec.detection_config(DetectionPreset::MarketStatus, Some(60_000));
        assert_eq!(config.max_timeout_ms, 60_000);
    }

    #[test]
    fn test_missing_trigger_is_an_error() {
        assert!(ScenarioSpec::from_yaml("name: x\ntest_id: B001\n").is_err());
    }
}
