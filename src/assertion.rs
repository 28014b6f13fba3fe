//! Scenario assertions
//!
//! Each helper returns an [`AssertionFailure`] instead of panicking, so the
//! failure text becomes the cause of the FAILED outcome.

use std::fmt::Display;

use crate::error::AssertionFailure;

pub fn assert_equals<T>(actual: T, expected: T, message: &str) -> Result<(), AssertionFailure>
where
    T: PartialEq + Display,
{
    if actual == expected {
        return Ok(());
    }
    Err(AssertionFailure::new(with_message(
        message,
        format!("expected [{}] but found [{}]", expected, actual),
    )))
}

pub fn assert_true(condition: bool, message: &str) -> Result<(), AssertionFailure> {
    if condition {
        Ok(())
    } else {
        Err(AssertionFailure::new(with_message(
            message,
            "expected [true] but found [false]".to_string(),
        )))
    }
}

pub fn assert_contains(haystack: &str, needle: &str, message: &str) -> Result<(), AssertionFailure> {
    if haystack.contains(needle) {
        return Ok(());
    }
    Err(AssertionFailure::new(with_message(
        message,
        format!("expected [{}] to contain [{}]", haystack, needle),
    )))
}

fn with_message(message: &str, detail: String) -> String {
    if message.is_empty() {
        detail
    } else {
        format!("{} {}", message, detail)
    }
}
