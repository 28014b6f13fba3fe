use super::types::{ReportNode, TestResults, TestSummary};
use crate::error::ReportSinkError;
use crate::runner::outcome::TestOutcome;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "junit.xml";

/// Generate JUnit XML, one `<testsuite>` per test class
pub fn generate_junit_xml(results: &TestResults) -> Result<String, ReportSinkError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", results.title.as_str()));
    push_counts(&mut suites_start, &results.summary);
    suites_start.push_attribute(("time", seconds(results.duration_ms).as_str()));
    writer.write_event(Event::Start(suites_start))?;

    let mut classes: BTreeMap<&str, Vec<&ReportNode>> = BTreeMap::new();
    for node in &results.tests {
        classes.entry(node.class_name.as_str()).or_default().push(node);
    }

    for (class_name, nodes) in &classes {
        let owned: Vec<ReportNode> = nodes.iter().map(|n| (*n).clone()).collect();
        let summary = TestSummary::from_nodes(&owned);
        let duration: u64 = nodes.iter().map(|n| n.duration_ms.unwrap_or(0)).sum();

        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", *class_name));
        push_counts(&mut suite_start, &summary);
        suite_start.push_attribute(("id", results.run_id.as_str()));
        suite_start.push_attribute(("time", seconds(duration).as_str()));
        suite_start.push_attribute(("timestamp", results.started_at.as_str()));
        writer.write_event(Event::Start(suite_start))?;

        for node in nodes {
            write_test_case(&mut writer, node)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn push_counts(start: &mut BytesStart<'_>, summary: &TestSummary) {
    start.push_attribute(("tests", summary.total.to_string().as_str()));
    start.push_attribute(("failures", summary.failed.to_string().as_str()));
    start.push_attribute(("skipped", summary.skipped.to_string().as_str()));
    start.push_attribute(("errors", "0"));
}

fn seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    node: &ReportNode,
) -> Result<(), ReportSinkError> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", node.name.as_str()));
    case_start.push_attribute(("classname", node.class_name.as_str()));
    case_start.push_attribute(("time", seconds(node.duration_ms.unwrap_or(0)).as_str()));
    writer.write_event(Event::Start(case_start))?;

    match &node.outcome {
        Some(TestOutcome::Failed { cause }) => {
            let message = cause.lines().next().unwrap_or("Unknown error");
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", message));
            fail_start.push_attribute(("type", "AssertionError"));
            writer.write_event(Event::Start(fail_start))?;
            writer.write_event(Event::Text(BytesText::new(cause)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        Some(TestOutcome::Skipped { reason }) => {
            let mut skip = BytesStart::new("skipped");
            skip.push_attribute(("message", reason.as_str()));
            writer.write_event(Event::Empty(skip))?;
        }
        Some(TestOutcome::Passed) | None => {}
    }

    // Log lines plus the Jenkins attachment marker for the screenshot
    let mut out = String::new();
    for entry in &node.logs {
        out.push_str(&format!(
            "[{}] {} {}\n",
            entry.timestamp,
            entry.status.label(),
            entry.message
        ));
    }
    if let Some(path) = &node.artifact_path {
        out.push_str(&format!("[[ATTACHMENT|{}]]\n", path));
    }
    if !out.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(&out)))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write JUnit XML to `path`
pub fn write(results: &TestResults, path: &Path) -> Result<PathBuf, ReportSinkError> {
    let xml = generate_junit_xml(results)?;
    std::fs::write(path, xml).map_err(|e| ReportSinkError::io(path, e))?;
    Ok(path.to_path_buf())
}
