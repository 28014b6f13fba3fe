//! Browser capability sets requested at class setup

use crate::config::HarnessConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Browsers with a known W3C capability mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
    Safari,
    /// Passed to the remote end verbatim
    Other(String),
}

impl BrowserKind {
    pub const KNOWN: [&'static str; 4] = ["chrome", "firefox", "edge", "safari"];

    /// `browserName` value expected by the remote end
    pub fn w3c_name(&self) -> &str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Edge => "MicrosoftEdge",
            BrowserKind::Safari => "safari",
            BrowserKind::Other(name) => name,
        }
    }
}

impl FromStr for BrowserKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('"').trim_matches('\'');
        Ok(match trimmed.to_lowercase().as_str() {
            "chrome" | "chromium" | "googlechrome" => BrowserKind::Chrome,
            "firefox" | "ff" | "gecko" => BrowserKind::Firefox,
            "edge" | "msedge" | "microsoftedge" => BrowserKind::Edge,
            "safari" => BrowserKind::Safari,
            _ => BrowserKind::Other(trimmed.to_string()),
        })
    }
}

/// Capability set for one browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub browser: BrowserKind,
    pub browser_version: Option<String>,
    /// Remote WebDriver endpoint, e.g. `http://localhost:4444/`
    pub endpoint: String,
    pub headless: bool,
    pub maximize_window: bool,
}

impl Capabilities {
    pub fn for_browser(browser: &str, endpoint: &str) -> Self {
        let browser = browser
            .parse::<BrowserKind>()
            .unwrap_or_else(|never| match never {});
        Self {
            browser,
            browser_version: None,
            endpoint: endpoint.to_string(),
            headless: false,
            maximize_window: true,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        let mut caps = Self::for_browser(&config.browser, &config.endpoint);
        caps.browser_version = config.browser_version.clone();
        caps.headless = config.headless;
        caps.maximize_window = config.maximize_window;
        caps
    }

    /// Body of a W3C `POST /session` request
    pub fn to_w3c_payload(&self) -> Value {
        let mut always_match = Map::new();
        always_match.insert("browserName".into(), json!(self.browser.w3c_name()));
        if let Some(ref version) = self.browser_version {
            always_match.insert("browserVersion".into(), json!(version));
        }

        if self.headless {
            match self.browser {
                BrowserKind::Chrome => {
                    always_match.insert(
                        "goog:chromeOptions".into(),
                        json!({ "args": ["--headless=new"] }),
                    );
                }
                BrowserKind::Edge => {
                    always_match.insert(
                        "ms:edgeOptions".into(),
                        json!({ "args": ["--headless=new"] }),
                    );
                }
                BrowserKind::Firefox => {
                    always_match
                        .insert("moz:firefoxOptions".into(), json!({ "args": ["-headless"] }));
                }
                BrowserKind::Safari | BrowserKind::Other(_) => {
                    log::warn!(
                        "Headless mode is not supported for {}, ignoring",
                        self.browser.w3c_name()
                    );
                }
            }
        }

        json!({ "capabilities": { "alwaysMatch": Value::Object(always_match) } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_aliases() {
        assert_eq!("Chrome".parse::<BrowserKind>().unwrap(), BrowserKind::Chrome);
        assert_eq!("ff".parse::<BrowserKind>().unwrap(), BrowserKind::Firefox);
        assert_eq!("\"edge\"".parse::<BrowserKind>().unwrap(), BrowserKind::Edge);
        assert_eq!(
            "opera".parse::<BrowserKind>().unwrap(),
            BrowserKind::Other("opera".to_string())
        );
    }

    #[test]
    fn test_w3c_payload_plain() {
        let caps = Capabilities::for_browser("firefox", "http://localhost:4444/");
        let payload = caps.to_w3c_payload();
        assert_eq!(
            payload,
            json!({ "capabilities": { "alwaysMatch": { "browserName": "firefox" } } })
        );
    }

    #[test]
    fn test_w3c_payload_headless_chrome_with_version() {
        let mut caps = Capabilities::for_browser("chrome", "http://grid:4444");
        caps.headless = true;
        caps.browser_version = Some("120".into());
        let payload = caps.to_w3c_payload();
        let always = &payload["capabilities"]["alwaysMatch"];
        assert_eq!(always["browserName"], "chrome");
        assert_eq!(always["browserVersion"], "120");
        assert_eq!(always["goog:chromeOptions"]["args"][0], "--headless=new");
    }

    #[test]
    fn test_from_config() {
        let config = HarnessConfig {
            browser: "edge".into(),
            headless: true,
            maximize_window: false,
            ..HarnessConfig::default()
        };
        let caps = Capabilities::from_config(&config);
        assert_eq!(caps.browser, BrowserKind::Edge);
        assert_eq!(caps.endpoint, config.endpoint);
        assert!(caps.headless);
        assert!(!caps.maximize_window);
    }
}
