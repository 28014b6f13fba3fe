use std::sync::Arc;

use super::outcome::contained;
use crate::driver::{BrowserDriver, BrowserSession, Capabilities};
use crate::error::SessionError;

/// Owns the single browser session of one test class
pub struct SessionManager {
    driver: Arc<dyn BrowserDriver>,
    session: Option<Arc<dyn BrowserSession>>,
    unusable: Option<String>,
    released: bool,
}

impl SessionManager {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            session: None,
            unusable: None,
            released: false,
        }
    }

    /// Establish the class session
    pub async fn acquire(&mut self, capabilities: &Capabilities) -> Result<(), SessionError> {
        if self.released {
            return Err(SessionError::Invalid(
                "session manager was already released".into(),
            ));
        }
        if self.session.is_some() {
            return Err(SessionError::AlreadyAcquired);
        }

        let driver = self.driver.clone();
        let requested = capabilities.clone();
        let session = contained(async move { driver.acquire(&requested).await })
            .await
            .map_err(SessionError::Aborted)??;

        if capabilities.maximize_window {
            let target = session.clone();
            let maximized = contained(async move { target.maximize_window().await })
                .await
                .map_err(SessionError::Aborted)
                .and_then(|result| result);
            if let Err(e) = maximized {
                log::warn!(
                    "Could not maximize window for session {}: {}",
                    session.session_id(),
                    e
                );
            }
        }

        log::debug!("Session {} acquired", session.session_id());
        self.session = Some(session);
        Ok(())
    }

    /// The current session, if one was acquired and not yet released
    pub fn active(&self) -> Option<Arc<dyn BrowserSession>> {
        self.session.clone()
    }

    pub fn mark_unusable(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Browser session marked unusable: {}", reason);
        self.unusable.get_or_insert(reason);
    }

    pub fn unusable_reason(&self) -> Option<&str> {
        self.unusable.as_deref()
    }

    /// Tear down the session if one exists
    ///
    /// Safe to call when nothing was acquired. Returns whether a session was
    /// actually closed. A failing or panicking close is logged; the session
    /// is dropped either way.
    pub async fn release(&mut self) -> bool {
        self.released = true;
        match self.session.take() {
            Some(session) => {
                let target = session.clone();
                let closed = contained(async move { target.close().await })
                    .await
                    .map_err(SessionError::Aborted)
                    .and_then(|result| result);
                if let Err(e) = closed {
                    log::warn!("Failed to close session {}: {}", session.session_id(), e);
                }
                true
            }
            None => {
                log::debug!("No session to release");
                false
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // Only reached with a live session when the class scope unwound early
        let Some(session) = self.session.take() else {
            return;
        };
        log::warn!(
            "Session {} still open at class exit, closing in background",
            session.session_id()
        );
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = session.close().await {
                    log::warn!("Background close of session failed: {}", e);
                }
            });
        }
    }
}

/// Find a session error in an error chain that leaves the session unusable
pub fn fatal_session_error(err: &anyhow::Error) -> Option<&SessionError> {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<SessionError>())
        .find(|e| e.is_fatal())
}
