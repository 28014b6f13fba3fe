use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::driver::webdriver::DEFAULT_ENDPOINT;
use crate::report::ReportFormat;

/// Harness configuration
///
/// Resolved in three layers: YAML file, `LUMI_*` environment variables,
/// then command line flags (applied by the CLI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessConfig {
    /// Browser identifier selecting the capability set (chrome, firefox, ...)
    pub browser: String,

    /// Optional browser version constraint
    pub browser_version: Option<String>,

    /// Remote WebDriver endpoint
    pub endpoint: String,

    /// Application under test
    pub base_url: String,

    /// Root for reports and screenshots
    pub output_dir: PathBuf,

    /// Screenshot folder, relative to `output_dir`
    pub screenshot_dir: String,

    /// Report files written on flush
    pub formats: Vec<ReportFormat>,

    /// Title shown in rendered reports
    pub report_title: String,

    /// Run test classes concurrently, one session each
    pub parallel: bool,

    pub maximize_window: bool,

    pub headless: bool,

    /// Per-request timeout for WebDriver HTTP calls
    pub request_timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            browser: "chrome".to_string(),
            browser_version: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            base_url: "https://www.saucedemo.com/".to_string(),
            output_dir: PathBuf::from("target"),
            screenshot_dir: "screenshots".to_string(),
            formats: vec![ReportFormat::Json, ReportFormat::Html, ReportFormat::Junit],
            report_title: "Swag Labs Test Report".to_string(),
            parallel: false,
            maximize_window: true,
            headless: false,
            request_timeout_secs: 60,
        }
    }
}

impl HarnessConfig {
    /// Load from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file {}", p.display()))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", p.display()))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `LUMI_BROWSER`, `LUMI_ENDPOINT` and `LUMI_HEADLESS`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(browser) = lookup("LUMI_BROWSER").filter(|v| !v.trim().is_empty()) {
            self.browser = browser;
        }
        if let Some(endpoint) = lookup("LUMI_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(headless) = lookup("LUMI_HEADLESS") {
            self.headless = headless == "true" || headless == "1";
        }
    }

    /// Absolute screenshot folder
    pub fn screenshot_root(&self) -> PathBuf {
        self.output_dir.join(&self.screenshot_dir)
    }
}
