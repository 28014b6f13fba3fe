use std::sync::{Arc, Mutex, PoisonError};

use crate::driver::{BrowserSession, Element, Locator};
use crate::error::{SessionError, SkipRequested};
use crate::report::{ReportNode, Status};

/// Runtime view handed to a test body
///
/// Holds a non-owning share of the class session and the report node of the
/// running test. The session stays owned by the class's session manager.
pub struct TestContext {
    session: Arc<dyn BrowserSession>,
    node: Arc<Mutex<ReportNode>>,
    base_url: String,
}

impl TestContext {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        node: Arc<Mutex<ReportNode>>,
        base_url: &str,
    ) -> Self {
        Self {
            session,
            node,
            base_url: base_url.to_string(),
        }
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            target.trim_start_matches('/')
        )
    }

    /// Navigate to a URL or a path under the base URL
    pub async fn open(&self, target: &str) -> Result<(), SessionError> {
        let url = self.resolve_url(target);
        log::debug!("Opening {}", url);
        self.session.navigate(&url).await
    }

    pub async fn find(&self, locator: Locator) -> Result<Element<'_>, SessionError> {
        Element::locate(self.session.as_ref(), locator).await
    }

    /// Append a log line to the running test's report node
    pub fn log(&self, status: Status, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[{}] {}", status.label(), message);
        self.node
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .log(status, message);
    }

    pub fn pass(&self, message: impl Into<String>) {
        self.log(Status::Pass, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Status::Info, message);
    }

    /// Error to return from a body that decides to skip itself
    pub fn skip(&self, reason: impl Into<String>) -> anyhow::Error {
        SkipRequested {
            reason: reason.into(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeBrowser;
    use crate::driver::{BrowserDriver, Capabilities};

    async fn context(base_url: &str) -> (TestContext, Arc<Mutex<ReportNode>>) {
        let session = FakeBrowser::new()
            .acquire(&Capabilities::for_browser("chrome", "http://localhost:4444/"))
            .await
            .unwrap();
        let node = Arc::new(Mutex::new(ReportNode::new("A", "t", "t")));
        (TestContext::new(session, node.clone(), base_url), node)
    }

    #[tokio::test]
    async fn test_resolve_url() {
        let (ctx, _) = context("https://www.saucedemo.com/").await;
        assert_eq!(
            ctx.resolve_url("/cart.html"),
            "https://www.saucedemo.com/cart.html"
        );
        assert_eq!(ctx.resolve_url(""), "https://www.saucedemo.com/");
        assert_eq!(
            ctx.resolve_url("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[tokio::test]
    async fn test_logs_land_on_node() {
        let (ctx, node) = context("https://www.saucedemo.com/").await;
        ctx.info("opening login page");
        ctx.pass("done");

        let node = node.lock().unwrap();
        assert_eq!(node.logs.len(), 2);
        assert_eq!(node.logs[0].status, Status::Info);
        assert_eq!(node.logs[1].message, "done");
    }

    #[tokio::test]
    async fn test_find_uses_session() {
        let (ctx, _) = context("https://www.saucedemo.com/").await;
        ctx.open("").await.unwrap();
        let button = ctx.find(Locator::id("login-button")).await.unwrap();
        assert_eq!(button.text().await.unwrap(), "Login");
        assert!(ctx.find(Locator::id("missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_skip_error_downcasts() {
        let (ctx, _) = context("https://www.saucedemo.com/").await;
        let err = ctx.skip("not today");
        assert_eq!(
            err.downcast_ref::<SkipRequested>().map(|s| s.reason.as_str()),
            Some("not today")
        );
    }
}
