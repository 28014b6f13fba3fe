use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use super::context::TestContext;
use crate::error::SuiteDefinitionError;

/// One scripted browser test
#[async_trait]
pub trait TestCase: Send + Sync {
    /// Identifier, unique within its class
    fn name(&self) -> &str;

    /// Display title for the report
    fn title(&self) -> &str {
        self.name()
    }

    /// Lower runs first; ties keep declaration order
    fn priority(&self) -> i32 {
        0
    }

    async fn run(&self, ctx: &TestContext) -> anyhow::Result<()>;
}

/// An ordered group of tests sharing one browser session
#[derive(Clone)]
pub struct TestClass {
    name: String,
    cases: Vec<Arc<dyn TestCase>>,
}

impl TestClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn with_case(mut self, case: impl TestCase + 'static) -> Self {
        self.cases.push(Arc::new(case));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tests in execution order
    pub fn cases(&self) -> Vec<Arc<dyn TestCase>> {
        let mut cases = self.cases.clone();
        cases.sort_by_key(|c| c.priority());
        cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Reject a class that declares two tests with the same name
    pub fn validate(&self) -> Result<(), SuiteDefinitionError> {
        let mut seen = HashSet::new();
        for case in &self.cases {
            if !seen.insert(case.name()) {
                return Err(SuiteDefinitionError::DuplicateTest {
                    class_name: self.name.clone(),
                    test_name: case.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Reject a suite with duplicate class names or duplicate tests in a class
///
/// Report entries are keyed by `class::test`, so every pair must be unique.
pub fn validate_suite(classes: &[TestClass]) -> Result<(), SuiteDefinitionError> {
    let mut seen = HashSet::new();
    for class in classes {
        if !seen.insert(class.name()) {
            return Err(SuiteDefinitionError::DuplicateClass(class.name().to_string()));
        }
        class.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, i32);

    #[async_trait]
    impl TestCase for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }

        async fn run(&self, _ctx: &TestContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_cases_sorted_by_priority() {
        let class = TestClass::new("Ordered")
            .with_case(Named("late", 2))
            .with_case(Named("first", 0))
            .with_case(Named("second", 0))
            .with_case(Named("early", -1));

        let names: Vec<String> = class.cases().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["early", "first", "second", "late"]);
        assert_eq!(class.len(), 4);
    }

    #[test]
    fn test_title_defaults_to_name() {
        let case = Named("plain", 0);
        assert_eq!(case.title(), "plain");
    }

    #[test]
    fn test_duplicate_test_name_is_rejected() {
        let class = TestClass::new("Login")
            .with_case(Named("same", 0))
            .with_case(Named("other", 1))
            .with_case(Named("same", 2));

        assert_eq!(
            class.validate(),
            Err(SuiteDefinitionError::DuplicateTest {
                class_name: "Login".into(),
                test_name: "same".into(),
            })
        );
    }

    #[test]
    fn test_suite_names_must_be_unique() {
        let unique = vec![
            TestClass::new("A").with_case(Named("t", 0)),
            TestClass::new("B").with_case(Named("t", 0)),
        ];
        assert!(validate_suite(&unique).is_ok());

        let repeated = vec![TestClass::new("A"), TestClass::new("B"), TestClass::new("A")];
        assert_eq!(
            validate_suite(&repeated),
            Err(SuiteDefinitionError::DuplicateClass("A".into()))
        );
    }
}
