use super::types::TestResults;
use crate::error::ReportSinkError;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "results.json";

/// Write the canonical JSON report
pub fn write(results: &TestResults, path: &Path) -> Result<PathBuf, ReportSinkError> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json).map_err(|e| ReportSinkError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// Load a previously written JSON report
pub fn read(path: &Path) -> Result<TestResults, ReportSinkError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ReportSinkError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}
