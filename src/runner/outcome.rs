//! Outcome classification
//!
//! Turns the raw result of one test invocation into exactly one
//! [`TestOutcome`]. Classification is pure: no I/O, no logging.
//! [`contained`] is how the harness gets a panic back as a value.

use crate::error::{SkipRequested, TaskAborted};
use crate::report::Status;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use tokio::task::JoinError;

/// Classified result of one test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed { cause: String },
    Skipped { reason: String },
}

impl TestOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TestOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestOutcome::Passed => "PASSED",
            TestOutcome::Failed { .. } => "FAILED",
            TestOutcome::Skipped { .. } => "SKIPPED",
        }
    }

    /// Report status used for the closing log line
    pub fn status(&self) -> Status {
        match self {
            TestOutcome::Passed => Status::Pass,
            TestOutcome::Failed { .. } => Status::Fail,
            TestOutcome::Skipped { .. } => Status::Skip,
        }
    }

    /// Closing log line written on the report node
    pub fn summary_line(&self) -> String {
        match self {
            TestOutcome::Passed => "PASSED ✅".to_string(),
            TestOutcome::Failed { cause } => format!("FAILED: {}", cause),
            TestOutcome::Skipped { reason } => format!("SKIPPED: {}", reason),
        }
    }
}

/// Why a test body was never entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotRunReason {
    /// Class setup could not acquire a session
    SetupFailed(String),
    /// An earlier test left the class session unusable
    SessionUnusable(String),
}

/// Raw result of one test invocation
#[derive(Debug)]
pub enum Invocation {
    Completed,
    Errored(anyhow::Error),
    Panicked(String),
    NotRun(NotRunReason),
}

/// Map an invocation result to its outcome
pub fn classify(invocation: &Invocation) -> TestOutcome {
    match invocation {
        Invocation::Completed => TestOutcome::Passed,
        Invocation::Errored(err) => match err.downcast_ref::<SkipRequested>() {
            Some(skip) => TestOutcome::Skipped {
                reason: skip.reason.clone(),
            },
            None => TestOutcome::Failed {
                cause: format!("{:#}", err),
            },
        },
        Invocation::Panicked(message) => TestOutcome::Failed {
            cause: format!("test body panicked: {}", message),
        },
        Invocation::NotRun(NotRunReason::SetupFailed(error)) => TestOutcome::Skipped {
            reason: format!("class setup failed: {}", error),
        },
        Invocation::NotRun(NotRunReason::SessionUnusable(error)) => TestOutcome::Failed {
            cause: format!("browser session unusable: {}", error),
        },
    }
}

/// Run a future on its own task so a panic inside it stays there
pub async fn contained<F>(future: F) -> Result<F::Output, TaskAborted>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future).await.map_err(aborted)
}

pub fn aborted(err: JoinError) -> TaskAborted {
    if err.is_panic() {
        TaskAborted::Panicked(panic_message(err.into_panic()))
    } else {
        TaskAborted::Cancelled(err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
