use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::broadcast;

use super::outcome::TestOutcome;
use crate::report::TestSummary;

/// Lifecycle events for real-time updates
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Suite events
    SuiteStarted {
        run_id: String,
        browser: String,
        class_count: usize,
    },
    SuiteFinished {
        summary: TestSummary,
        report_files: Vec<PathBuf>,
    },

    // Class events
    ClassStarted {
        class_name: String,
        test_count: usize,
    },
    ClassSetupFailed {
        class_name: String,
        error: String,
    },
    ClassFinished {
        class_name: String,
        session_closed: bool,
    },

    // Test events
    TestStarted {
        class_name: String,
        test_name: String,
        title: String,
    },
    TestFinished {
        class_name: String,
        test_name: String,
        outcome: TestOutcome,
        duration_ms: u64,
        artifact: Option<PathBuf>,
    },

    Log {
        message: String,
    },
}

/// Event emitter for broadcasting lifecycle events
///
/// Clones share one channel, so every class scope can hold its own handle.
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

fn key(class_name: &str, test_name: &str) -> String {
    format!("{}::{}", class_name, test_name)
}

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    /// Print events until every emitter is dropped
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            // Piped output gets no escape codes
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        // Running tests by qualified name; parallel classes run several at once
        let mut spinners: HashMap<String, ProgressBar> = HashMap::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::debug!("Console listener skipped {} events", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::SuiteStarted {
                    run_id,
                    browser,
                    class_count,
                } => {
                    multi
                        .println(format!(
                            "\n{} Suite started: {} (browser: {}, {} classes)",
                            "▶".green().bold(),
                            run_id.cyan(),
                            browser.white().bold(),
                            class_count
                        ))
                        .ok();
                }

                TestEvent::SuiteFinished {
                    summary,
                    report_files,
                } => {
                    for (_, pb) in spinners.drain() {
                        pb.finish_and_clear();
                    }

                    println!("\n{} Suite finished", "■".blue().bold());
                    println!("  Total tests: {}", summary.total);
                    println!(
                        "  {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    if summary.artifacts > 0 {
                        println!("  Screenshots: {}", summary.artifacts);
                    }
                    for file in report_files {
                        println!("  Report: {}", file.display().to_string().cyan());
                    }
                }

                TestEvent::ClassStarted {
                    class_name,
                    test_count,
                } => {
                    multi
                        .println(format!(
                            "\n  {} Class: {} ({} tests)",
                            "→".blue(),
                            class_name.white().bold(),
                            test_count
                        ))
                        .ok();
                }

                TestEvent::ClassSetupFailed { class_name, error } => {
                    multi
                        .println(format!(
                            "  {} Setup of {} failed: {}",
                            "✗".red(),
                            class_name,
                            error.red()
                        ))
                        .ok();
                }

                TestEvent::ClassFinished {
                    class_name,
                    session_closed,
                } => {
                    let session = if session_closed {
                        "session closed".dimmed()
                    } else {
                        "no session".dimmed()
                    };
                    multi
                        .println(format!(
                            "  {} Class {} [{}]",
                            "←".blue(),
                            class_name,
                            session
                        ))
                        .ok();
                }

                TestEvent::TestStarted {
                    class_name,
                    test_name,
                    title,
                } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("      {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    pb.set_message(format!("{}... ", title.dimmed()));
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinners.insert(key(&class_name, &test_name), pb);
                }

                TestEvent::TestFinished {
                    class_name,
                    test_name,
                    outcome,
                    duration_ms,
                    artifact,
                } => {
                    if let Some(pb) = spinners.remove(&key(&class_name, &test_name)) {
                        pb.finish_and_clear();
                    }

                    let line = match &outcome {
                        TestOutcome::Passed => format!(
                            "      {} {} ({}ms)",
                            "✓".green(),
                            test_name,
                            duration_ms
                        ),
                        TestOutcome::Failed { cause } => format!(
                            "      {} {} ({}ms)\n        {}",
                            "✗".red(),
                            test_name,
                            duration_ms,
                            cause.red()
                        ),
                        TestOutcome::Skipped { reason } => format!(
                            "      {} {} ({})",
                            "○".yellow(),
                            test_name,
                            reason.dimmed()
                        ),
                    };
                    multi.println(line).ok();

                    if let Some(path) = artifact {
                        multi
                            .println(format!(
                                "        {} {}",
                                "📸".dimmed(),
                                path.display().to_string().dimmed()
                            ))
                            .ok();
                    }
                }

                TestEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }
}
