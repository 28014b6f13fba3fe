pub mod html;
pub mod json;
pub mod junit;
pub mod types;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use crate::error::ReportSinkError;
pub use types::{LogEntry, ReportNode, Status, TestResults, TestSummary};

/// Rendered report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Html,
    Junit,
}

/// Settings the registry needs to render a report
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub formats: Vec<ReportFormat>,
    pub title: String,
    pub browser: String,
}

struct ReportState {
    run_id: String,
    started_at: String,
    started: Instant,
    entries: Vec<ReportNode>,
}

/// Aggregate test report shared by every class scope
///
/// Cloning yields another handle to the same report. Appends are serialized
/// behind a mutex so parallel classes never interleave entries.
#[derive(Clone)]
pub struct Report {
    inner: Arc<Mutex<ReportState>>,
}

impl Report {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ReportState {
                run_id: uuid::Uuid::new_v4().to_string(),
                started_at: chrono::Local::now().to_rfc3339(),
                started: Instant::now(),
                entries: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReportState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run_id(&self) -> String {
        self.state().run_id.clone()
    }

    /// Create a detached entry for one test; it joins the report on `append`
    pub fn create_entry(&self, class_name: &str, name: &str, title: &str) -> ReportNode {
        ReportNode::new(class_name, name, title)
    }

    /// Add a finished entry
    ///
    /// Names are unique once the suite is validated, so a second entry for
    /// the same test can only be a repeated append and is dropped.
    pub fn append(&self, node: ReportNode) {
        let mut state = self.state();
        if state
            .entries
            .iter()
            .any(|n| n.class_name == node.class_name && n.name == node.name)
        {
            log::warn!(
                "Report already holds {}, ignoring repeated append",
                node.qualified_name()
            );
            return;
        }
        log::debug!("Report entry added: {}", node.qualified_name());
        state.entries.push(node);
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<ReportNode> {
        self.state().entries.clone()
    }

    /// Point-in-time copy of the whole report
    pub fn snapshot(&self, title: &str, browser: &str) -> TestResults {
        let state = self.state();
        TestResults {
            run_id: state.run_id.clone(),
            title: title.to_string(),
            browser: browser.to_string(),
            started_at: state.started_at.clone(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            duration_ms: state.started.elapsed().as_millis() as u64,
            summary: TestSummary::from_nodes(&state.entries),
            tests: state.entries.clone(),
        }
    }
}

/// Owner of the run's report
///
/// The report itself is created lazily on the first `instance()` call and
/// reused afterwards. The registry is passed down explicitly; there is no
/// process-wide global.
pub struct ReportRegistry {
    settings: ReportSettings,
    report: OnceLock<Report>,
    flush_lock: Mutex<()>,
}

impl ReportRegistry {
    pub fn new(settings: ReportSettings) -> Self {
        Self {
            settings,
            report: OnceLock::new(),
            flush_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn instance(&self) -> &Report {
        self.report.get_or_init(|| {
            let report = Report::new();
            log::info!("Report {} initialized", report.run_id());
            report
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.report.get().is_some()
    }

    /// Render and persist the report in every configured format
    ///
    /// Each flush writes the complete current state, so repeated flushes
    /// never duplicate or drop entries.
    pub fn flush(&self) -> Result<Vec<PathBuf>, ReportSinkError> {
        let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let results = self
            .instance()
            .snapshot(&self.settings.title, &self.settings.browser);
        let dir = &self.settings.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| ReportSinkError::io(dir, e))?;

        let mut written = Vec::new();
        for format in &self.settings.formats {
            written.push(write_format(*format, &results, dir)?);
        }

        log::info!(
            "Report flushed: {} tests, {} file(s) in {}",
            results.tests.len(),
            written.len(),
            dir.display()
        );
        Ok(written)
    }
}

fn write_format(
    format: ReportFormat,
    results: &TestResults,
    dir: &Path,
) -> Result<PathBuf, ReportSinkError> {
    match format {
        ReportFormat::Json => json::write(results, &dir.join(json::FILE_NAME)),
        ReportFormat::Html => html::write(results, &dir.join(html::FILE_NAME)),
        ReportFormat::Junit => junit::write(results, &dir.join(junit::FILE_NAME)),
    }
}

/// Re-render a saved `results.json` into another format
pub fn generate_report(
    results_path: &Path,
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<PathBuf, ReportSinkError> {
    let results = json::read(results_path)?;
    let dir = results_path.parent().unwrap_or(Path::new("."));

    match output {
        Some(path) => match format {
            ReportFormat::Json => json::write(&results, path),
            ReportFormat::Html => html::write(&results, path),
            ReportFormat::Junit => junit::write(&results, path),
        },
        None => write_format(format, &results, dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::outcome::TestOutcome;

    fn settings(dir: &Path) -> ReportSettings {
        ReportSettings {
            output_dir: dir.to_path_buf(),
            formats: vec![ReportFormat::Json, ReportFormat::Html, ReportFormat::Junit],
            title: "Test Report".into(),
            browser: "chrome".into(),
        }
    }

    fn finished(class: &str, name: &str, outcome: TestOutcome) -> ReportNode {
        let mut node = ReportNode::new(class, name, name);
        node.finish(outcome, 5);
        node
    }

    #[test]
    fn test_instance_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ReportRegistry::new(settings(dir.path()));
        assert!(!registry.is_initialized());

        let first = registry.instance().run_id();
        let second = registry.instance().run_id();
        assert!(registry.is_initialized());
        assert_eq!(first, second);
    }

    #[test]
    fn test_flush_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ReportRegistry::new(settings(dir.path()));

        let files = registry.flush().unwrap();
        assert_eq!(files.len(), 3);

        let results = json::read(&dir.path().join(json::FILE_NAME)).unwrap();
        assert!(results.tests.is_empty());
        assert_eq!(results.summary.total, 0);
        assert!(dir.path().join(html::FILE_NAME).exists());
        assert!(dir.path().join(junit::FILE_NAME).exists());
    }

    #[test]
    fn test_flush_twice_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ReportRegistry::new(settings(dir.path()));
        let report = registry.instance();
        report.append(finished("A", "one", TestOutcome::Passed));
        report.append(finished(
            "A",
            "two",
            TestOutcome::Failed {
                cause: "boom".into(),
            },
        ));

        registry.flush().unwrap();
        registry.flush().unwrap();

        let results = json::read(&dir.path().join(json::FILE_NAME)).unwrap();
        assert_eq!(results.tests.len(), 2);
        assert_eq!(results.summary.passed, 1);
        assert_eq!(results.summary.failed, 1);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_repeated_append_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ReportRegistry::new(settings(dir.path()));
        let report = registry.instance();
        report.append(finished("A", "one", TestOutcome::Passed));
        report.append(finished(
            "A",
            "one",
            TestOutcome::Failed {
                cause: "again".into(),
            },
        ));
        assert_eq!(report.len(), 1);
        assert_eq!(report.entries()[0].outcome, Some(TestOutcome::Passed));
    }

    #[test]
    fn test_parallel_appends_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ReportRegistry::new(settings(dir.path()));
        let report = registry.instance().clone();

        let handles: Vec<_> = (0..8)
            .map(|class| {
                let report = report.clone();
                std::thread::spawn(move || {
                    for test in 0..25 {
                        report.append(finished(
                            &format!("Class{}", class),
                            &format!("test{}", test),
                            TestOutcome::Passed,
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(report.len(), 200);
    }

    #[test]
    fn test_flush_surfaces_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let registry = ReportRegistry::new(settings(&blocker.join("reports")));
        let err = registry.flush().unwrap_err();
        assert!(matches!(err, ReportSinkError::Io { .. }));
    }

    #[test]
    fn test_generate_report_from_saved_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.formats = vec![ReportFormat::Json];
        let registry = ReportRegistry::new(s);
        registry
            .instance()
            .append(finished("A", "one", TestOutcome::Passed));
        registry.flush().unwrap();

        let out = dir.path().join("custom.xml");
        let written = generate_report(
            &dir.path().join(json::FILE_NAME),
            ReportFormat::Junit,
            Some(&out),
        )
        .unwrap();
        assert_eq!(written, out);
        let xml = std::fs::read_to_string(out).unwrap();
        assert!(xml.contains(r#"<testcase name="one""#));
    }
}
