//! Suite, class and test lifecycle
//!
//! [`Orchestrator::run`] drives the phases in a fixed order:
//!
//! ```text
//! SuiteStart -> ClassSetup -> { TestStart -> TestBody -> TestEnd }* -> ClassTeardown -> SuiteEnd
//! ```
//!
//! Each phase is a named method. The class loop has no early exits, so
//! teardown runs for every class that entered setup. Every class runs on its
//! own task; if that task dies, the tests it had not recorded yet are
//! reported as failed.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::task::JoinHandle;

use super::artifact::ArtifactCapturer;
use super::case::{validate_suite, TestCase, TestClass};
use super::context::TestContext;
use super::events::{EventEmitter, TestEvent};
use super::outcome::{aborted, classify, contained, Invocation, NotRunReason, TestOutcome};
use super::session::{fatal_session_error, SessionManager};
use super::state::{ClassRun, Lifecycle, Phase, Scope, SuiteRun, TestRecord};
use crate::config::HarnessConfig;
use crate::driver::{BrowserDriver, BrowserSession, Capabilities};
use crate::error::{ReportSinkError, RunError, SessionError, TaskAborted};
use crate::report::{Report, ReportNode, ReportRegistry, ReportSettings, Status, TestSummary};

pub struct Orchestrator {
    registry: Arc<ReportRegistry>,
    emitter: EventEmitter,
    driver: Arc<dyn BrowserDriver>,
    capabilities: Capabilities,
    capturer: Arc<ArtifactCapturer>,
    base_url: String,
    parallel: bool,
}

impl Orchestrator {
    pub fn new(config: &HarnessConfig, driver: Arc<dyn BrowserDriver>, emitter: EventEmitter) -> Self {
        let capabilities = Capabilities::from_config(config);
        let registry = Arc::new(ReportRegistry::new(ReportSettings {
            output_dir: config.output_dir.clone(),
            formats: config.formats.clone(),
            title: config.report_title.clone(),
            browser: capabilities.browser.w3c_name().to_string(),
        }));

        Self {
            registry,
            emitter,
            driver,
            capabilities,
            capturer: Arc::new(ArtifactCapturer::new(
                &config.output_dir,
                &config.screenshot_dir,
            )),
            base_url: config.base_url.clone(),
            parallel: config.parallel,
        }
    }

    /// Run every class and flush the report
    ///
    /// Test failures are recorded in the returned [`SuiteRun`]. The run is an
    /// error when the suite repeats a class or test name, which is detected
    /// before any session is opened, or when the report cannot be written.
    pub async fn run(self, classes: Vec<TestClass>) -> Result<SuiteRun, RunError> {
        if let Err(e) = validate_suite(&classes) {
            log::error!("Refusing to run suite: {}", e);
            return Err(e.into());
        }

        let mut lifecycle = Lifecycle::new(Scope::Suite);

        advance(&mut lifecycle, Phase::SuiteStart);
        let report = self.suite_start(classes.len());

        let scope = ClassScope {
            driver: self.driver.clone(),
            capabilities: self.capabilities.clone(),
            capturer: self.capturer.clone(),
            base_url: self.base_url.clone(),
            emitter: self.emitter.clone(),
            report: report.clone(),
        };
        let class_runs = if self.parallel {
            run_parallel(&scope, classes).await
        } else {
            let mut runs = Vec::new();
            for class in classes {
                runs.push(ClassTask::spawn(&scope, class).join(&scope).await);
            }
            runs
        };

        advance(&mut lifecycle, Phase::SuiteEnd);
        let report_files = self.suite_end()?;

        let summary = TestSummary::from_nodes(&report.entries());
        self.emitter.emit(TestEvent::SuiteFinished {
            summary: summary.clone(),
            report_files: report_files.clone(),
        });

        Ok(SuiteRun {
            run_id: report.run_id(),
            summary,
            classes: class_runs,
            phases: lifecycle.history().to_vec(),
            report_files,
        })
    }

    fn suite_start(&self, class_count: usize) -> Report {
        let report = self.registry.instance().clone();
        log::info!(
            "Suite {} starting: {} classes on {}",
            report.run_id(),
            class_count,
            self.capabilities.browser.w3c_name()
        );
        self.emitter.emit(TestEvent::SuiteStarted {
            run_id: report.run_id(),
            browser: self.capabilities.browser.w3c_name().to_string(),
            class_count,
        });
        report
    }

    fn suite_end(&self) -> Result<Vec<PathBuf>, ReportSinkError> {
        self.registry.flush().map_err(|e| {
            log::error!("Failed to flush report: {}", e);
            e
        })
    }
}

/// All classes at once, each with its own session manager
async fn run_parallel(scope: &ClassScope, classes: Vec<TestClass>) -> Vec<ClassRun> {
    let tasks: Vec<_> = classes
        .into_iter()
        .map(|class| ClassTask::spawn(scope, class))
        .collect();

    let mut runs = Vec::with_capacity(tasks.len());
    for task in tasks {
        runs.push(task.join(scope).await);
    }
    runs
}

/// A class running on its own task
struct ClassTask {
    class_name: String,
    /// Test names in execution order
    test_names: Vec<String>,
    /// Records of the tests that reached the report
    progress: Arc<Mutex<Vec<TestRecord>>>,
    handle: JoinHandle<ClassRun>,
}

impl ClassTask {
    fn spawn(scope: &ClassScope, class: TestClass) -> Self {
        let class_name = class.name().to_string();
        let test_names = class
            .cases()
            .iter()
            .map(|case| case.name().to_string())
            .collect();
        let progress = Arc::new(Mutex::new(Vec::new()));

        let task_scope = scope.clone();
        let task_progress = progress.clone();
        let handle = tokio::spawn(async move { task_scope.run_class(class, &task_progress).await });

        Self {
            class_name,
            test_names,
            progress,
            handle,
        }
    }

    /// Wait for the class, reporting its unrecorded tests if the task died
    async fn join(self, scope: &ClassScope) -> ClassRun {
        match self.handle.await {
            Ok(run) => run,
            Err(e) => {
                let reason = aborted(e);
                log::error!("Class task {} did not complete: {}", self.class_name, reason);
                let recorded = std::mem::take(
                    &mut *self.progress.lock().unwrap_or_else(PoisonError::into_inner),
                );
                scope.abandon_class(&self.class_name, &self.test_names, recorded, &reason)
            }
        }
    }
}

/// Everything a class needs, cloneable into a spawned task
#[derive(Clone)]
struct ClassScope {
    driver: Arc<dyn BrowserDriver>,
    capabilities: Capabilities,
    capturer: Arc<ArtifactCapturer>,
    base_url: String,
    emitter: EventEmitter,
    report: Report,
}

impl ClassScope {
    async fn run_class(&self, class: TestClass, progress: &Mutex<Vec<TestRecord>>) -> ClassRun {
        let mut lifecycle = Lifecycle::new(Scope::Class);
        let mut manager = SessionManager::new(self.driver.clone());
        let cases = class.cases();

        self.emitter.emit(TestEvent::ClassStarted {
            class_name: class.name().to_string(),
            test_count: cases.len(),
        });

        advance(&mut lifecycle, Phase::ClassSetup);
        let setup_error = self.class_setup(class.name(), &mut manager).await;

        for case in cases {
            let record = self
                .run_test(
                    &mut lifecycle,
                    &mut manager,
                    class.name(),
                    case,
                    setup_error.as_deref(),
                )
                .await;
            progress
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record);
        }

        advance(&mut lifecycle, Phase::ClassTeardown);
        let session_closed = self.class_teardown(class.name(), &mut manager).await;
        let tests = std::mem::take(&mut *progress.lock().unwrap_or_else(PoisonError::into_inner));

        ClassRun {
            class_name: class.name().to_string(),
            setup_error,
            tests,
            phases: lifecycle.history().to_vec(),
            session_closed,
        }
    }

    /// Acquire the class session; the error text is returned on failure
    async fn class_setup(&self, class_name: &str, manager: &mut SessionManager) -> Option<String> {
        match manager.acquire(&self.capabilities).await {
            Ok(()) => {
                log::info!(
                    "Class {} ready on {}",
                    class_name,
                    self.capabilities.browser.w3c_name()
                );
                None
            }
            Err(e) => {
                log::error!("Setup of class {} failed: {}", class_name, e);
                self.emitter.emit(TestEvent::ClassSetupFailed {
                    class_name: class_name.to_string(),
                    error: e.to_string(),
                });
                Some(e.to_string())
            }
        }
    }

    async fn run_test(
        &self,
        lifecycle: &mut Lifecycle,
        manager: &mut SessionManager,
        class_name: &str,
        case: Arc<dyn TestCase>,
        setup_error: Option<&str>,
    ) -> TestRecord {
        advance(lifecycle, Phase::TestStart);
        let started = Instant::now();
        let node = self.test_start(class_name, case.as_ref());

        let (invocation, executed) = match test_precondition(setup_error, manager) {
            Ok(session) => {
                advance(lifecycle, Phase::TestBody);
                (self.test_body(case.clone(), session, node.clone()).await, true)
            }
            Err(reason) => (Invocation::NotRun(reason), false),
        };

        advance(lifecycle, Phase::TestEnd);
        let node = node.lock().unwrap_or_else(PoisonError::into_inner).clone();
        self.test_end(manager, node, invocation, executed, started)
            .await
    }

    fn test_start(&self, class_name: &str, case: &dyn TestCase) -> Arc<Mutex<ReportNode>> {
        log::info!("Starting {}::{}", class_name, case.name());
        self.emitter.emit(TestEvent::TestStarted {
            class_name: class_name.to_string(),
            test_name: case.name().to_string(),
            title: case.title().to_string(),
        });

        Arc::new(Mutex::new(self.report.create_entry(
            class_name,
            case.name(),
            case.title(),
        )))
    }

    /// Run the body on its own task so a panic is contained to this test
    async fn test_body(
        &self,
        case: Arc<dyn TestCase>,
        session: Arc<dyn BrowserSession>,
        node: Arc<Mutex<ReportNode>>,
    ) -> Invocation {
        let ctx = TestContext::new(session, node, &self.base_url);

        match contained(async move { case.run(&ctx).await }).await {
            Ok(Ok(())) => Invocation::Completed,
            Ok(Err(e)) => Invocation::Errored(e),
            Err(TaskAborted::Panicked(message)) => Invocation::Panicked(message),
            Err(cancelled) => Invocation::Errored(anyhow::anyhow!("test body {}", cancelled)),
        }
    }

    async fn test_end(
        &self,
        manager: &mut SessionManager,
        mut node: ReportNode,
        invocation: Invocation,
        executed: bool,
        started: Instant,
    ) -> TestRecord {
        if let Invocation::Errored(err) = &invocation {
            if let Some(fatal) = fatal_session_error(err) {
                manager.mark_unusable(fatal.to_string());
            }
        }

        let outcome = classify(&invocation);
        node.log(outcome.status(), outcome.summary_line());

        // A dead session cannot take a screenshot
        let session = match manager.unusable_reason() {
            Some(_) => None,
            None => manager.active(),
        };
        let artifact = self
            .capturer
            .capture_for(&outcome, session, &mut node)
            .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        node.finish(outcome.clone(), duration_ms);
        log::info!(
            "{} {} ({}ms)",
            node.qualified_name(),
            outcome.label(),
            duration_ms
        );

        let record = TestRecord {
            name: node.name.clone(),
            outcome: outcome.clone(),
            executed,
            artifact: artifact.map(|a| a.path),
        };

        self.emitter.emit(TestEvent::TestFinished {
            class_name: node.class_name.clone(),
            test_name: node.name.clone(),
            outcome,
            duration_ms,
            artifact: record.artifact.clone(),
        });

        self.report.append(node);
        record
    }

    /// Release the class session; returns whether one was closed
    async fn class_teardown(&self, class_name: &str, manager: &mut SessionManager) -> bool {
        let session_closed = manager.release().await;
        log::info!(
            "Class {} finished{}",
            class_name,
            if session_closed { ", session closed" } else { "" }
        );
        self.emitter.emit(TestEvent::ClassFinished {
            class_name: class_name.to_string(),
            session_closed,
        });
        session_closed
    }

    /// Close out a class whose task died
    ///
    /// Every test without a record gets a failed entry, so nothing the class
    /// declared is missing from the report.
    fn abandon_class(
        &self,
        class_name: &str,
        test_names: &[String],
        mut tests: Vec<TestRecord>,
        reason: &TaskAborted,
    ) -> ClassRun {
        let outcome = TestOutcome::Failed {
            cause: format!("class task {}", reason),
        };

        for name in test_names {
            if tests.iter().any(|t| &t.name == name) {
                continue;
            }
            let mut node = self.report.create_entry(class_name, name, name);
            node.log(Status::Fail, outcome.summary_line());
            node.finish(outcome.clone(), 0);
            log::info!("{} {}", node.qualified_name(), outcome.label());

            self.emitter.emit(TestEvent::TestFinished {
                class_name: class_name.to_string(),
                test_name: name.clone(),
                outcome: outcome.clone(),
                duration_ms: 0,
                artifact: None,
            });
            self.report.append(node);

            tests.push(TestRecord {
                name: name.clone(),
                outcome: outcome.clone(),
                executed: false,
                artifact: None,
            });
        }

        self.emitter.emit(TestEvent::ClassFinished {
            class_name: class_name.to_string(),
            session_closed: false,
        });

        ClassRun {
            class_name: class_name.to_string(),
            setup_error: None,
            tests,
            phases: Vec::new(),
            session_closed: false,
        }
    }
}

/// Decide whether a test may enter its body
fn test_precondition(
    setup_error: Option<&str>,
    manager: &SessionManager,
) -> Result<Arc<dyn BrowserSession>, NotRunReason> {
    if let Some(error) = setup_error {
        return Err(NotRunReason::SetupFailed(error.to_string()));
    }
    if let Some(reason) = manager.unusable_reason() {
        return Err(NotRunReason::SessionUnusable(reason.to_string()));
    }
    manager
        .active()
        .ok_or_else(|| NotRunReason::SessionUnusable(SessionError::NotAcquired.to_string()))
}

fn advance(lifecycle: &mut Lifecycle, phase: Phase) {
    if let Err(e) = lifecycle.enter(phase) {
        log::error!("{}", e);
    }
}
