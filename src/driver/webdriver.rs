//! W3C WebDriver HTTP client
//!
//! Talks to a Selenium Grid / standalone server (or any W3C compliant remote
//! end) over plain HTTP. Only the endpoints the harness needs are covered.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::driver::capabilities::Capabilities;
use crate::driver::traits::{BrowserDriver, BrowserSession, ElementRef, Locator};
use crate::error::SessionError;

/// Default Selenium standalone / grid endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4444/";

/// W3C web element identifier key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Generic W3C response envelope
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
    /// Pre-W3C servers put the session id next to `value`
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// W3C error payload found under `value`
#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// Low level request helper bound to one endpoint
#[derive(Clone)]
struct WireClient {
    /// Endpoint without trailing slash
    endpoint: String,
    client: reqwest::Client,
}

impl WireClient {
    fn new(endpoint: &str, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<WireResponse, SessionError> {
        let url = format!("{}/{}", self.endpoint, path);
        log::trace!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SessionError::Unreachable {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| SessionError::Unreachable {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let payload: WireResponse = serde_json::from_str(&text).map_err(|_| {
            SessionError::Protocol(format!(
                "HTTP {} from {} is not a WebDriver response",
                status, url
            ))
        })?;

        if status.is_success() {
            Ok(payload)
        } else {
            Err(map_wire_error(status, &payload.value))
        }
    }
}

fn map_wire_error(status: StatusCode, value: &Value) -> SessionError {
    match serde_json::from_value::<WireError>(value.clone()) {
        Ok(err) => match err.error.as_str() {
            "invalid session id" => SessionError::Invalid(err.message),
            "no such element" => SessionError::NoSuchElement(err.message),
            "session not created" => SessionError::Rejected(err.message),
            _ => SessionError::Command {
                error: err.error,
                message: err.message,
            },
        },
        Err(_) => SessionError::Protocol(format!("HTTP {} without W3C error payload", status)),
    }
}

/// Remote WebDriver session factory
pub struct RemoteWebDriver {
    client: reqwest::Client,
}

impl RemoteWebDriver {
    /// Create a driver whose HTTP requests time out after `request_timeout`
    pub fn new(request_timeout: Duration) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SessionError::Protocol(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserDriver for RemoteWebDriver {
    async fn acquire(
        &self,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn BrowserSession>, SessionError> {
        let wire = WireClient::new(&capabilities.endpoint, self.client.clone());

        let response = wire
            .call(Method::POST, "session", Some(capabilities.to_w3c_payload()))
            .await
            .map_err(|e| match e {
                SessionError::Command { error, message } => {
                    SessionError::Rejected(format!("{}: {}", error, message))
                }
                other => other,
            })?;

        let session_id = response
            .value
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(response.session_id)
            .ok_or_else(|| SessionError::Protocol("new session response has no sessionId".into()))?;

        log::info!(
            "Created {} session {} at {}",
            capabilities.browser.w3c_name(),
            session_id,
            wire.endpoint
        );

        Ok(Arc::new(RemoteSession {
            wire,
            session_id,
            capabilities: capabilities.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// One live W3C session
pub struct RemoteSession {
    wire: WireClient,
    session_id: String,
    capabilities: Capabilities,
    closed: AtomicBool,
}

impl RemoteSession {
    async fn command(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Invalid(format!(
                "session {} was closed",
                self.session_id
            )));
        }

        let path = if suffix.is_empty() {
            format!("session/{}", self.session_id)
        } else {
            format!("session/{}/{}", self.session_id, suffix)
        };
        Ok(self.wire.call(method, &path, body).await?.value)
    }
}

#[async_trait]
impl BrowserSession for RemoteSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, SessionError> {
        let (using, value) = locator.to_w3c();
        let found = self
            .command(
                Method::POST,
                "element",
                Some(json!({ "using": using, "value": value })),
            )
            .await
            .map_err(|e| match e {
                SessionError::NoSuchElement(_) => SessionError::NoSuchElement(locator.to_string()),
                other => other,
            })?;

        found
            .get(ELEMENT_KEY)
            .or_else(|| found.get("ELEMENT"))
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| SessionError::Protocol(format!("element response for {} has no id", locator)))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), SessionError> {
        self.command(
            Method::POST,
            &format!("element/{}/click", element.0),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), SessionError> {
        self.command(
            Method::POST,
            &format!("element/{}/value", element.0),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String, SessionError> {
        let value = self
            .command(Method::GET, &format!("element/{}/text", element.0), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SessionError::Protocol("element text is not a string".into()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let value = self.command(Method::GET, "screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| SessionError::Protocol("screenshot is not a base64 string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SessionError::Protocol(format!("screenshot is not valid base64: {}", e)))
    }

    async fn maximize_window(&self) -> Result<(), SessionError> {
        self.command(Method::POST, "window/maximize", Some(json!({})))
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let path = format!("session/{}", self.session_id);
        self.wire.call(Method::DELETE, &path, None).await?;
        log::info!("Closed session {}", self.session_id);
        Ok(())
    }
}
