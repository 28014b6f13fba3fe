//! Failure screenshots
//!
//! Capture is best effort: every failure path ends in a logged warning and a
//! `Warning` entry on the report node, never in a changed outcome. A driver
//! that panics while taking the screenshot is treated the same way.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::BrowserSession;
use crate::error::ArtifactCaptureError;
use crate::report::{ReportNode, Status};
use crate::runner::outcome::{contained, TestOutcome};

/// A persisted failure screenshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Location on disk
    pub path: PathBuf,
    /// Path relative to the report directory, as linked in the report
    pub link: String,
    pub size: usize,
}

/// Deterministic file name for a test's screenshot
///
/// The readable part is sanitized; the hash suffix is computed over the
/// raw `class::test` identifier so sanitizing never makes two tests collide.
pub fn artifact_file_name(class_name: &str, test_name: &str) -> String {
    let raw = format!("{}::{}", class_name, test_name);
    let digest = Sha256::digest(raw.as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();

    let safe: String = format!("{}.{}", class_name, test_name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{}-{}.png", safe, hash)
}

#[derive(Debug, Clone)]
pub struct ArtifactCapturer {
    output_dir: PathBuf,
    screenshot_dir: String,
}

impl ArtifactCapturer {
    pub fn new(output_dir: &Path, screenshot_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            screenshot_dir: screenshot_dir.trim_matches('/').to_string(),
        }
    }

    /// Capture and persist a screenshot for one test
    pub async fn capture(
        &self,
        session: Option<&dyn BrowserSession>,
        class_name: &str,
        test_name: &str,
    ) -> Result<Artifact, ArtifactCaptureError> {
        let session = session.ok_or(ArtifactCaptureError::NoSession)?;
        let bytes = session
            .screenshot()
            .await
            .map_err(ArtifactCaptureError::Screenshot)?;
        if bytes.is_empty() {
            return Err(ArtifactCaptureError::Empty);
        }

        let file_name = artifact_file_name(class_name, test_name);
        let dir = self.output_dir.join(&self.screenshot_dir);
        let path = dir.join(&file_name);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ArtifactCaptureError::Persist {
                path: dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ArtifactCaptureError::Persist {
                path: path.clone(),
                source,
            })?;

        Ok(Artifact {
            path,
            link: format!("{}/{}", self.screenshot_dir, file_name),
            size: bytes.len(),
        })
    }

    /// Capture for a classified test, but only when it failed
    ///
    /// Links the artifact into `node` on success. Never returns an error.
    pub async fn capture_for(
        &self,
        outcome: &TestOutcome,
        session: Option<Arc<dyn BrowserSession>>,
        node: &mut ReportNode,
    ) -> Option<Artifact> {
        if !outcome.is_failed() {
            return None;
        }

        let capturer = self.clone();
        let class_name = node.class_name.clone();
        let test_name = node.name.clone();
        let captured = contained(async move {
            capturer
                .capture(session.as_deref(), &class_name, &test_name)
                .await
        })
        .await
        .map_err(ArtifactCaptureError::Aborted)
        .and_then(|result| result);

        match captured {
            Ok(artifact) => {
                log::info!(
                    "Saved screenshot for {}: {}",
                    node.qualified_name(),
                    artifact.path.display()
                );
                node.attach_artifact(artifact.link.clone());
                Some(artifact)
            }
            Err(e) => {
                log::warn!("Screenshot for {} not captured: {}", node.qualified_name(), e);
                node.log(Status::Warning, format!("Screenshot not captured: {}", e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeBrowser, PNG_BYTES};
    use crate::driver::{BrowserDriver, Capabilities};

    async fn session(browser: &FakeBrowser) -> std::sync::Arc<dyn BrowserSession> {
        browser
            .acquire(&Capabilities::for_browser("chrome", "http://localhost:4444/"))
            .await
            .unwrap()
    }

    #[test]
    fn test_file_name_is_deterministic() {
        let a = artifact_file_name("SwagLabsTest", "testInvalidLogin");
        let b = artifact_file_name("SwagLabsTest", "testInvalidLogin");
        assert_eq!(a, b);
        assert!(a.starts_with("SwagLabsTest.testInvalidLogin-"));
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), "SwagLabsTest.testInvalidLogin-".len() + 8 + ".png".len());
    }

    #[test]
    fn test_sanitized_names_do_not_collide() {
        let a = artifact_file_name("Suite", "login/logout");
        let b = artifact_file_name("Suite", "login_logout");
        assert_ne!(a, b);
        assert!(a.starts_with("Suite.login_logout-"));
    }

    #[tokio::test]
    async fn test_failed_outcome_links_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        let session = session(&browser).await;
        let capturer = ArtifactCapturer::new(dir.path(), "screenshots");
        let mut node = ReportNode::new("SwagLabsTest", "testValidLoginAndAddToCart", "Valid");

        let outcome = TestOutcome::Failed {
            cause: "wrong item".into(),
        };
        let artifact = capturer
            .capture_for(&outcome, Some(session.clone()), &mut node)
            .await
            .expect("artifact");

        assert_eq!(std::fs::read(&artifact.path).unwrap(), PNG_BYTES.to_vec());
        assert_eq!(node.artifact_path.as_deref(), Some(artifact.link.as_str()));
        assert!(artifact.link.starts_with("screenshots/SwagLabsTest.testValidLoginAndAddToCart-"));
    }

    #[tokio::test]
    async fn test_never_captured_for_passed_or_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        let session = session(&browser).await;
        let capturer = ArtifactCapturer::new(dir.path(), "screenshots");

        for outcome in [
            TestOutcome::Passed,
            TestOutcome::Skipped {
                reason: "setup".into(),
            },
        ] {
            let mut node = ReportNode::new("A", "t", "t");
            let artifact = capturer
                .capture_for(&outcome, Some(session.clone()), &mut node)
                .await;
            assert!(artifact.is_none());
            assert!(node.artifact_path.is_none());
        }

        assert_eq!(browser.state().screenshots, 0);
        assert!(!dir.path().join("screenshots").exists());
    }

    #[tokio::test]
    async fn test_capture_failure_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        browser.state().screenshot_fails = true;
        let session = session(&browser).await;
        let capturer = ArtifactCapturer::new(dir.path(), "screenshots");
        let mut node = ReportNode::new("A", "t", "t");

        let outcome = TestOutcome::Failed { cause: "x".into() };
        let artifact = capturer
            .capture_for(&outcome, Some(session.clone()), &mut node)
            .await;

        assert!(artifact.is_none());
        assert!(node.artifact_path.is_none());
        assert_eq!(node.logs.len(), 1);
        assert_eq!(node.logs[0].status, Status::Warning);
        assert!(node.logs[0].message.contains("screenshot request failed"));
    }

    #[tokio::test]
    async fn test_missing_session_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = ArtifactCapturer::new(dir.path(), "screenshots");
        let mut node = ReportNode::new("A", "t", "t");

        let err = capturer.capture(None, "A", "t").await.unwrap_err();
        assert!(matches!(err, ArtifactCaptureError::NoSession));

        let outcome = TestOutcome::Failed { cause: "x".into() };
        assert!(capturer.capture_for(&outcome, None, &mut node).await.is_none());
        assert_eq!(node.logs[0].status, Status::Warning);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("screenshots");
        std::fs::write(&blocker, "not a directory").unwrap();

        let browser = FakeBrowser::new();
        let session = session(&browser).await;
        let capturer = ArtifactCapturer::new(dir.path(), "screenshots");

        let err = capturer
            .capture(Some(session.as_ref()), "A", "t")
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactCaptureError::Persist { .. }));
    }

    #[tokio::test]
    async fn test_panicking_screenshot_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::new();
        browser.state().screenshot_panics = true;
        let session = session(&browser).await;
        let capturer = ArtifactCapturer::new(dir.path(), "screenshots");
        let mut node = ReportNode::new("A", "t", "t");

        let outcome = TestOutcome::Failed { cause: "x".into() };
        let artifact = capturer
            .capture_for(&outcome, Some(session.clone()), &mut node)
            .await;

        assert!(artifact.is_none());
        assert!(node.artifact_path.is_none());
        assert_eq!(node.logs.len(), 1);
        assert_eq!(node.logs[0].status, Status::Warning);
        assert_eq!(
            node.logs[0].message,
            "Screenshot not captured: screenshot task panicked: screenshot buffer overflow"
        );
        assert_eq!(browser.state().screenshots, 0);
    }
}
