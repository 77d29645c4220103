//! Scenario runner that triggers chat responses and collects engine outcomes

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::detection::DetectionPreset;
use crate::engine::{ResponseEngine, ScenarioOutcome};
use crate::error::{E2eError, E2eResult};
use crate::page::{ChatInput, PageAccessor};
use crate::performance::PerformanceClassification;
use crate::spec::{ScenarioSpec, Trigger};

/// A scenario that could not be run at all (trigger failed, spec unusable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioError {
    pub name: String,
    pub test_id: String,
    pub error: String,
}

/// Per-category counts in a suite summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub avg_response_ms: u64,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub by_classification: BTreeMap<PerformanceClassification, usize>,
    pub by_category: BTreeMap<DetectionPreset, CategorySummary>,
    pub results: Vec<ScenarioOutcome>,
    pub errors: Vec<ScenarioError>,
}

/// Accumulates outcomes for one run. Owned by the caller; nothing is shared between runs.
#[derive(Debug)]
pub struct ResultCollector {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    outcomes: Vec<ScenarioOutcome>,
    errors: Vec<ScenarioError>,
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCollector {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            outcomes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn record_error(&mut self, name: &str, test_id: &str, error: &E2eError) {
        self.errors.push(ScenarioError {
            name: name.to_string(),
            test_id: test_id.to_string(),
            error: error.to_string(),
        });
    }

    pub fn outcomes(&self) -> &[ScenarioOutcome] {
        &self.outcomes
    }

    pub fn errors(&self) -> &[ScenarioError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.outcomes.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate everything recorded so far
    pub fn summary(&self) -> SuiteSummary {
        let passed = self.outcomes.iter().filter(|o| o.passed).count();
        let failed = self.len() - passed;

        let mut by_classification = BTreeMap::new();
        let mut by_category: BTreeMap<DetectionPreset, CategorySummary> = BTreeMap::new();
        let mut response_totals: BTreeMap<DetectionPreset, u64> = BTreeMap::new();

        for outcome in &self.outcomes {
            *by_classification.entry(outcome.performance).or_insert(0) += 1;

            let entry = by_category.entry(outcome.category).or_default();
            entry.total += 1;
            if outcome.passed {
                entry.passed += 1;
            } else {
                entry.failed += 1;
            }
            *response_totals.entry(outcome.category).or_insert(0) += outcome.retry.response_time;
        }

        for (category, entry) in by_category.iter_mut() {
            let total_ms = response_totals.get(category).copied().unwrap_or(0);
            entry.avg_response_ms = total_ms / entry.total.max(1) as u64;
        }

        SuiteSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            total: self.len(),
            passed,
            failed,
            duration_ms: self.started.elapsed().as_millis() as u64,
            by_classification,
            by_category,
            results: self.outcomes.clone(),
            errors: self.errors.clone(),
        }
    }
}

/// Runs scenario specs against one chat page, strictly one at a time
pub struct ScenarioRunner<P> {
    page: P,
    engine: ResponseEngine,
    config: HarnessConfig,
}

impl<P> ScenarioRunner<P>
where
    P: PageAccessor + ChatInput,
{
    pub fn new(page: P, engine: ResponseEngine, config: HarnessConfig) -> Self {
        Self { page, engine, config }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Run all scenarios in the specs directory
    pub async fn run_all(&mut self, collector: &mut ResultCollector) -> E2eResult<()> {
        let specs = ScenarioSpec::load_all(&self.config.specs_dir)?;
        self.run_specs(&specs, collector).await;
        Ok(())
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&mut self, tag: &str, collector: &mut ResultCollector) -> E2eResult<()> {
        let specs = ScenarioSpec::load_all(&self.config.specs_dir)?;
        let filtered: Vec<ScenarioSpec> = ScenarioSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_specs(&filtered, collector).await;
        Ok(())
    }

    /// Run a specific scenario by name
    pub async fn run_named(&mut self, name: &str, collector: &mut ResultCollector) -> E2eResult<()> {
        let specs = ScenarioSpec::load_all(&self.config.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {}", name)))?;

        self.run_specs(std::slice::from_ref(&spec), collector).await;
        Ok(())
    }

    /// Run a list of scenarios, recording every outcome or error
    pub async fn run_specs(&mut self, specs: &[ScenarioSpec], collector: &mut ResultCollector) {
        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            match self.run_spec(spec).await {
                Ok(outcome) => {
                    if outcome.passed {
                        info!("✓ {} ({} ms, {})", outcome.name, outcome.retry.response_time, outcome.performance);
                    } else {
                        error!(
                            "✗ {} - {}",
                            outcome.name,
                            outcome.failure_summary().unwrap_or_else(|| "unknown failure".to_string())
                        );
                    }
                    collector.record(outcome);
                }
                Err(e) => {
                    error!("✗ {} - {}", spec.name, e);
                    collector.record_error(&spec.name, &spec.test_id, &e);
                }
            }
        }

        let summary = collector.summary();
        info!("");
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            summary.passed, summary.failed, summary.duration_ms
        );
    }

    /// Trigger one scenario and wait for its response
    pub async fn run_spec(&mut self, spec: &ScenarioSpec) -> E2eResult<ScenarioOutcome> {
        debug!("Running scenario: {}", spec.name);

        let category = spec
            .preset
            .unwrap_or_else(|| self.engine.registry().resolve(&spec.test_id).category());
        let detection = spec.detection_config(category, self.config.preset_timeout(category));

        // A reply detected past the classifier bound would be labelled TIMEOUT anyway
        let bound_ms = self.engine.thresholds().max_timeout_ms;
        if detection.max_timeout_ms > bound_ms {
            return Err(E2eError::ConfigurationInvalid(format!(
                "{}: detection budget {}ms exceeds max_timeout_ms {}ms",
                spec.name, detection.max_timeout_ms, bound_ms
            )));
        }

        match &spec.trigger {
            Trigger::Prompt { text } => self.page.send_prompt(text).await?,
            Trigger::Button { selector } => self.page.click(selector).await?,
            Trigger::Wait => {}
        }

        let mut outcome = self.engine.evaluate(&self.page, &spec.test_id, &detection).await;
        outcome.name = spec.name.clone();
        outcome.category = category;
        Ok(outcome)
    }

    /// Write a suite summary to `test-results.json` in the output directory
    pub fn write_results(&self, summary: &SuiteSummary) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, summary)
    }
}

/// Write a suite summary as pretty JSON into `output_dir`
pub fn write_results(output_dir: &Path, summary: &SuiteSummary) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
