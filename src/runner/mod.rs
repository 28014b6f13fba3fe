pub mod artifact;
pub mod case;
pub mod context;
pub mod events;
pub mod orchestrator;
pub mod outcome;
pub mod session;
pub mod state;

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HarnessConfig;
use crate::driver::RemoteWebDriver;

pub use case::{TestCase, TestClass};
pub use context::TestContext;
pub use events::*;
pub use orchestrator::Orchestrator;
pub use outcome::{classify, Invocation, NotRunReason, TestOutcome};
pub use state::*;

/// Run test classes against the configured remote WebDriver endpoint
///
/// Prints live progress to the console and returns the finished run. An
/// error means the suite repeats a class or test name, or the report could
/// not be written.
pub async fn run_tests(config: &HarnessConfig, classes: Vec<TestClass>) -> Result<SuiteRun> {
    if classes.is_empty() {
        println!("{} No test classes to run.", "ℹ".blue());
    }

    let driver = RemoteWebDriver::new(Duration::from_secs(config.request_timeout_secs))
        .context("Failed to build WebDriver client")?;

    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    let result = Orchestrator::new(config, Arc::new(driver), emitter)
        .run(classes)
        .await;

    // The orchestrator owned the last emitter, so the listener drains and stops
    if let Err(e) = listener.await {
        log::warn!("Console listener stopped abnormally: {}", e);
    }

    let run = result.context("Test run failed")?;
    if run.has_failures() {
        println!(
            "\n{} {} of {} tests failed",
            "✗".red().bold(),
            run.summary.failed,
            run.summary.total
        );
    } else {
        println!(
            "\n{} All executed tests passed ({}% pass rate)",
            "✓".green().bold(),
            run.summary.pass_rate()
        );
    }
    Ok(run)
}
