//! E2E test harness entry point
//!
//! This file is the test binary that runs FinChat chat scenarios from YAML specs
//! against a browser reachable over CDP.
//! Run with: cargo test --package finchat-e2e --test e2e -- --cdp-endpoint http://127.0.0.1:9222

use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use finchat_e2e::playwright::PlaywrightPage;
use finchat_e2e::{
    E2eResult, HarnessConfig, ResponseDetector, ResponseEngine, ResultCollector, ScenarioRunner,
    SlowPerformancePolicy, ValidatorRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "finchat-e2e")]
#[command(about = "Chat response E2E runner for FinChat")]
struct Args {
    /// Path to harness configuration
    #[arg(short, long, default_value = "finchat-e2e.toml")]
    config: PathBuf,

    /// Path to scenario specs directory (overrides config)
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// CDP endpoint of the browser hosting the chat page
    #[arg(long, env = "FINCHAT_CDP_ENDPOINT")]
    cdp_endpoint: Option<String>,

    /// Treat SLOW_PERFORMANCE as a failure
    #[arg(long)]
    fail_on_slow: bool,

    /// Output directory for results (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let mut config = HarnessConfig::load(&args.config)?;
    if let Some(specs) = args.specs {
        config.specs_dir = specs;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(endpoint) = args.cdp_endpoint {
        config.playwright.cdp_endpoint = endpoint;
    }
    if args.fail_on_slow {
        config.slow_policy = SlowPerformancePolicy::Fail;
    }

    info!("Connecting to browser at {}", config.playwright.cdp_endpoint);
    let page = PlaywrightPage::connect(config.playwright.clone()).await?;

    let engine = ResponseEngine::new(
        ResponseDetector::new(config.selectors.clone()),
        Arc::new(ValidatorRegistry::with_defaults()),
    )
    .with_thresholds(config.performance)
    .with_slow_policy(config.slow_policy);

    let mut runner = ScenarioRunner::new(page, engine, config);
    let mut collector = ResultCollector::new();

    if let Some(name) = args.name {
        runner.run_named(&name, &mut collector).await?;
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&tag, &mut collector).await?;
    } else {
        runner.run_all(&mut collector).await?;
    }

    let summary = collector.summary();
    runner.write_results(&summary)?;

    Ok(summary.failed == 0)
}
