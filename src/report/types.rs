use crate::runner::outcome::TestOutcome;
use serde::{Deserialize, Serialize};

/// Severity attached to a report log entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
    Skip,
    Info,
    Warning,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
            Status::Info => "INFO",
            Status::Warning => "WARNING",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub status: Status,
    pub message: String,
    pub timestamp: String,
}

/// Report entry for one test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportNode {
    pub class_name: String,
    /// Method-style identifier, e.g. `testInvalidLogin`
    pub name: String,
    /// Human readable title shown in rendered reports
    pub title: String,
    pub logs: Vec<LogEntry>,
    /// Screenshot path relative to the report directory
    pub artifact_path: Option<String>,
    pub outcome: Option<TestOutcome>,
    pub started_at: String,
    pub duration_ms: Option<u64>,
}

impl ReportNode {
    pub fn new(class_name: &str, name: &str, title: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            name: name.to_string(),
            title: title.to_string(),
            logs: Vec::new(),
            artifact_path: None,
            outcome: None,
            started_at: chrono::Local::now().to_rfc3339(),
            duration_ms: None,
        }
    }

    pub fn log(&mut self, status: Status, message: impl Into<String>) {
        self.logs.push(LogEntry {
            status,
            message: message.into(),
            timestamp: chrono::Local::now().format("%H:%M:%S%.3f").to_string(),
        });
    }

    pub fn attach_artifact(&mut self, path: impl Into<String>) {
        self.artifact_path = Some(path.into());
    }

    /// Record the classified outcome; the first recorded outcome wins
    pub fn finish(&mut self, outcome: TestOutcome, duration_ms: u64) {
        if self.outcome.is_some() {
            log::warn!("Outcome for {}::{} already recorded", self.class_name, self.name);
            return;
        }
        self.outcome = Some(outcome);
        self.duration_ms = Some(duration_ms);
    }

    /// `class::name`, unique within a run
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.class_name, self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub artifacts: u32,
}

impl TestSummary {
    pub fn from_nodes(nodes: &[ReportNode]) -> Self {
        let mut summary = TestSummary::default();
        for node in nodes {
            summary.total += 1;
            match node.outcome {
                Some(TestOutcome::Passed) => summary.passed += 1,
                Some(TestOutcome::Failed { .. }) => summary.failed += 1,
                Some(TestOutcome::Skipped { .. }) => summary.skipped += 1,
                None => {}
            }
            if node.artifact_path.is_some() {
                summary.artifacts += 1;
            }
        }
        summary
    }

    pub fn pass_rate(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (self.passed as f64 / self.total as f64 * 100.0) as u32
        }
    }
}

/// Serialized form of a whole run, written as `results.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub run_id: String,
    pub title: String,
    pub browser: String,
    pub started_at: String,
    pub generated_at: String,
    pub duration_ms: u64,
    pub tests: Vec<ReportNode>,
    pub summary: TestSummary,
}
