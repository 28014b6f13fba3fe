use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use super::outcome::TestOutcome;
use crate::report::TestSummary;

/// Lifecycle phases, strictly nested Suite ⊇ Class ⊇ Test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    SuiteStart,
    ClassSetup,
    TestStart,
    TestBody,
    TestEnd,
    ClassTeardown,
    SuiteEnd,
}

/// Which nesting level a tracker follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Suite,
    Class,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid lifecycle transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: Option<Phase>,
    pub to: Phase,
}

/// Phase tracker rejecting out-of-order transitions
///
/// The suite tracker only sees `SuiteStart` and `SuiteEnd`; each class owns
/// its own tracker so parallel classes never interleave in one history.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    scope: Scope,
    current: Option<Phase>,
    history: Vec<Phase>,
}

impl Lifecycle {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            current: None,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn enter(&mut self, next: Phase) -> Result<(), InvalidTransition> {
        if !allowed(self.scope, self.current, next) {
            return Err(InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        self.current = Some(next);
        self.history.push(next);
        Ok(())
    }

    /// Whether the tracker reached its terminal phase
    pub fn is_finished(&self) -> bool {
        match self.scope {
            Scope::Suite => self.current == Some(Phase::SuiteEnd),
            Scope::Class => self.current == Some(Phase::ClassTeardown),
        }
    }
}

fn allowed(scope: Scope, from: Option<Phase>, to: Phase) -> bool {
    use Phase::*;
    match scope {
        Scope::Suite => matches!(
            (from, to),
            (None, SuiteStart) | (Some(SuiteStart), SuiteEnd)
        ),
        Scope::Class => matches!(
            (from, to),
            (None, ClassSetup)
                | (Some(ClassSetup), TestStart)
                | (Some(TestEnd), TestStart)
                | (Some(TestStart), TestBody)
                // Tests of a class whose setup failed, or whose session is
                // unusable, go straight to TestEnd
                | (Some(TestStart), TestEnd)
                | (Some(TestBody), TestEnd)
                | (Some(ClassSetup), ClassTeardown)
                | (Some(TestEnd), ClassTeardown)
        ),
    }
}

/// Record of one test inside a class run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub name: String,
    pub outcome: TestOutcome,
    /// Whether the test body was entered
    pub executed: bool,
    pub artifact: Option<PathBuf>,
}

/// Result of running one test class
#[derive(Debug, Clone)]
pub struct ClassRun {
    pub class_name: String,
    pub setup_error: Option<String>,
    pub tests: Vec<TestRecord>,
    pub phases: Vec<Phase>,
    /// Whether a live session was closed at teardown
    pub session_closed: bool,
}

impl ClassRun {
    pub fn count(&self, label: &str) -> usize {
        self.tests
            .iter()
            .filter(|t| t.outcome.label() == label)
            .count()
    }
}

/// Result of a whole suite run
#[derive(Debug, Clone)]
pub struct SuiteRun {
    pub run_id: String,
    pub summary: TestSummary,
    pub classes: Vec<ClassRun>,
    pub phases: Vec<Phase>,
    pub report_files: Vec<PathBuf>,
}

impl SuiteRun {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}
