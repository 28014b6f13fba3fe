//! Error taxonomy for the harness
//!
//! Each kind maps to one propagation rule in the runner:
//! session errors are class-scoped, assertion failures are test-scoped,
//! artifact errors are downgraded to warnings and report sink errors are
//! fatal to the run.

use std::path::PathBuf;
use thiserror::Error;

/// A browser session could not be acquired or used
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("WebDriver endpoint {endpoint} is unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("Session capabilities rejected: {0}")]
    Rejected(String),

    #[error("No active browser session")]
    NotAcquired,

    #[error("A browser session is already active for this class")]
    AlreadyAcquired,

    #[error("Browser session is no longer usable: {0}")]
    Invalid(String),

    #[error("No element found for {0}")]
    NoSuchElement(String),

    #[error("WebDriver command failed ({error}): {message}")]
    Command { error: String, message: String },

    #[error("Malformed WebDriver response: {0}")]
    Protocol(String),

    #[error("Browser task {0}")]
    Aborted(TaskAborted),
}

impl SessionError {
    /// Whether the session that produced this error can still serve commands
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Unreachable { .. }
                | SessionError::NotAcquired
                | SessionError::Invalid(_)
                | SessionError::Aborted(_)
        )
    }
}

/// A scripted expectation was not met
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AssertionFailure {
    pub message: String,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raised by a test body to record itself as skipped
#[derive(Debug, Error)]
#[error("skip requested: {reason}")]
pub struct SkipRequested {
    pub reason: String,
}

/// Screenshot capture or persistence failed
#[derive(Debug, Error)]
pub enum ArtifactCaptureError {
    #[error("no browser session available for screenshot")]
    NoSession,

    #[error("screenshot request failed: {0}")]
    Screenshot(#[source] SessionError),

    #[error("screenshot data was empty")]
    Empty,

    #[error("screenshot task {0}")]
    Aborted(TaskAborted),

    #[error("failed to persist screenshot to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A spawned task died before producing its result
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskAborted {
    #[error("panicked: {0}")]
    Panicked(String),

    #[error("was cancelled: {0}")]
    Cancelled(String),
}

/// The test classes handed to a run cannot be reported unambiguously
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SuiteDefinitionError {
    #[error("test class {0} is defined more than once")]
    DuplicateClass(String),

    #[error("test {class_name}::{test_name} is defined more than once")]
    DuplicateTest {
        class_name: String,
        test_name: String,
    },
}

/// A run that ended without a complete report
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid test suite: {0}")]
    Definition(#[from] SuiteDefinitionError),

    #[error(transparent)]
    Sink(#[from] ReportSinkError),
}

/// The report could not be rendered or persisted
#[derive(Debug, Error)]
pub enum ReportSinkError {
    #[error("report I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to render JUnit XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("rendered report is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl ReportSinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportSinkError::Io {
            path: path.into(),
            source,
        }
    }
}
