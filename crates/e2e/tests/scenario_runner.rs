//! Scenario runner and result collection over a scripted page

mod common;

use std::path::Path;

use common::{ScriptedPage, MARKET_STATUS_REPLY};
use finchat_e2e::{
    DetectionPreset, E2eError, HarnessConfig, PerformanceClassification, ResponseEngine,
    ResultCollector, ScenarioRunner,
};

const MARKET_OPEN: &str = r#"
name: a-market-open
test_id: B001
tags: [smoke, market]
trigger:
  action: prompt
  text: Is the market open right now?
"#;

const MISSING_BUTTON: &str = r#"
name: b-missing-button
test_id: B006
tags: [buttons]
trigger:
  action: button
  selector: '[data-testid="missing-snapshot-button"]'
"#;

const NVDA_WAIT: &str = r#"
name: c-nvda-wait
test_id: TEST-B002
tags: [smoke]
trigger:
  action: wait
"#;

fn write_scenarios(dir: &Path) {
    std::fs::write(dir.join("market.yaml"), MARKET_OPEN).unwrap();
    std::fs::write(dir.join("button.yml"), MISSING_BUTTON).unwrap();
    std::fs::write(dir.join("nvda.yaml"), NVDA_WAIT).unwrap();
    std::fs::write(dir.join("README.md"), "not a scenario").unwrap();
}

fn runner_for(dir: &Path) -> ScenarioRunner<ScriptedPage> {
    let config = HarnessConfig {
        specs_dir: dir.join("scenarios"),
        output_dir: dir.join("out"),
        ..Default::default()
    };
    std::fs::create_dir_all(&config.specs_dir).unwrap();
    write_scenarios(&config.specs_dir);

    let page = ScriptedPage::replying_at(MARKET_STATUS_REPLY, 3_000);
    ScenarioRunner::new(page, ResponseEngine::default(), config)
}

#[tokio::test(start_paused = true)]
async fn test_run_all_collects_outcomes_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner_for(dir.path());
    let mut collector = ResultCollector::new();

    runner.run_all(&mut collector).await.unwrap();

    assert_eq!(
        runner.page().inputs(),
        vec!["prompt Is the market open right now?".to_string()]
    );

    let summary = collector.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].name, "b-missing-button");

    let names: Vec<&str> = summary.results.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["a-market-open", "c-nvda-wait"]);

    let market = &summary.by_category[&DetectionPreset::MarketStatus];
    assert_eq!((market.total, market.passed, market.failed), (1, 1, 0));
    assert_eq!(market.avg_response_ms, 3_000);

    let ticker = &summary.by_category[&DetectionPreset::TickerAnalysis];
    assert_eq!((ticker.total, ticker.passed, ticker.failed), (1, 0, 1));

    assert_eq!(
        summary.by_classification.get(&PerformanceClassification::Success),
        Some(&2)
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_tagged_filters_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner_for(dir.path());
    let mut collector = ResultCollector::new();

    runner.run_tagged("market", &mut collector).await.unwrap();

    assert_eq!(collector.len(), 1);
    assert!(collector.outcomes()[0].passed);
    assert!(collector.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_named_unknown_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner_for(dir.path());
    let mut collector = ResultCollector::new();

    let err = runner.run_named("does-not-exist", &mut collector).await.unwrap_err();

    assert!(matches!(err, E2eError::SpecParse(_)));
    assert!(collector.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_results_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner_for(dir.path());
    let mut collector = ResultCollector::new();

    runner.run_named("a-market-open", &mut collector).await.unwrap();
    let path = runner.write_results(&collector.summary()).unwrap();

    assert_eq!(path, dir.path().join("out").join("test-results.json"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["passed"], 1);
    assert_eq!(json["results"][0]["performance"], "SUCCESS");
    assert_eq!(json["results"][0]["retry"]["detected_by"], "RESPONSE_VISIBLE");
    assert_eq!(json["results"][0]["validation"]["status"], "PASS");
    assert_eq!(json["by_category"]["market-status"]["passed"], 1);
    assert_eq!(json["by_classification"]["SUCCESS"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_budget_beyond_classifier_bound_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner_for(dir.path());
    std::fs::write(
        dir.path().join("scenarios").join("slow.yaml"),
        "name: d-long-budget\ntest_id: B004\nmax_timeout_ms: 200000\ntrigger:\n  action: prompt\n  text: GME?\n",
    )
    .unwrap();
    let mut collector = ResultCollector::new();

    runner.run_named("d-long-budget", &mut collector).await.unwrap();

    assert!(collector.outcomes().is_empty());
    assert_eq!(collector.errors().len(), 1);
    assert!(collector.errors()[0].error.contains("exceeds max_timeout_ms"));
    assert!(runner.page().inputs().is_empty());
}

#[test]
fn test_empty_collector_summary() {
    let summary = ResultCollector::new().summary();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.failed, 0);
    assert!(summary.by_category.is_empty());
}

#[test]
fn test_shipped_scenarios_and_config_load() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));

    let config = HarnessConfig::load(&root.join("finchat-e2e.toml")).unwrap();
    assert_eq!(config.preset_timeout(DetectionPreset::MarketStatus), Some(60_000));

    let specs = finchat_e2e::ScenarioSpec::load_all(&root.join(&config.specs_dir)).unwrap();
    assert_eq!(specs.len(), 8);
    assert_eq!(specs[0].name, "b001-market-status");
    assert_eq!(finchat_e2e::ScenarioSpec::filter_by_tag(&specs, "buttons").len(), 3);
}
