use super::types::{ReportNode, Status, TestResults};
use crate::error::ReportSinkError;
use crate::runner::outcome::TestOutcome;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "report.html";

/// Write the self-contained HTML report
pub fn write(results: &TestResults, path: &Path) -> Result<PathBuf, ReportSinkError> {
    let html = generate_html(results);
    std::fs::write(path, html).map_err(|e| ReportSinkError::io(path, e))?;
    Ok(path.to_path_buf())
}

pub fn generate_html(results: &TestResults) -> String {
    let summary = &results.summary;

    // Group by class, keeping classes in name order and tests in run order
    let mut classes: BTreeMap<&str, Vec<&ReportNode>> = BTreeMap::new();
    for node in &results.tests {
        classes.entry(node.class_name.as_str()).or_default().push(node);
    }

    let mut classes_html = String::new();
    for (class_name, nodes) in &classes {
        let mut tests_html = String::new();
        for node in nodes {
            tests_html.push_str(&render_test(node));
        }
        classes_html.push_str(&format!(
            r#"
        <section class="class">
            <h2>{}</h2>
            {tests_html}
        </section>"#,
            html_escape(class_name)
        ));
    }

    if classes_html.is_empty() {
        classes_html = r#"<p class="empty">No tests were executed.</p>"#.to_string();
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        :root {{
            --bg: #0f172a; --panel: #1e293b; --border: #334155;
            --text: #f1f5f9; --muted: #94a3b8;
            --pass: #10b981; --fail: #ef4444; --skip: #f59e0b; --info: #3b82f6; --warn: #eab308;
        }}
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{ font-family: system-ui, sans-serif; background: var(--bg); color: var(--text); padding: 2rem 1rem; line-height: 1.5; }}
        .container {{ max-width: 1000px; margin: 0 auto; }}
        header {{ display: flex; justify-content: space-between; align-items: flex-end; margin-bottom: 2rem; }}
        h1 {{ font-size: 2rem; font-weight: 800; }}
        h2 {{ font-size: 1.1rem; margin-bottom: 1rem; color: var(--muted); font-family: monospace; }}
        .summary {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 1rem; margin-bottom: 2rem; }}
        .stat {{ background: var(--panel); border: 1px solid var(--border); border-radius: 0.75rem; padding: 1rem; }}
        .stat-value {{ font-size: 2rem; font-weight: 800; }}
        .stat-label {{ color: var(--muted); font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.05em; }}
        .stat.passed .stat-value {{ color: var(--pass); }}
        .stat.failed .stat-value {{ color: var(--fail); }}
        .stat.skipped .stat-value {{ color: var(--skip); }}
        .progress-bar {{ background: var(--panel); height: 10px; border-radius: 5px; overflow: hidden; margin-bottom: 2.5rem; border: 1px solid var(--border); }}
        .progress-fill {{ height: 100%; background: var(--pass); }}
        .class {{ margin-bottom: 2rem; }}
        .test {{ background: var(--panel); border: 1px solid var(--border); border-left: 4px solid var(--muted); border-radius: 0.75rem; margin-bottom: 1rem; overflow: hidden; }}
        .test.passed {{ border-left-color: var(--pass); }}
        .test.failed {{ border-left-color: var(--fail); }}
        .test.skipped {{ border-left-color: var(--skip); }}
        .test-header {{ display: flex; justify-content: space-between; align-items: center; padding: 1rem 1.25rem; }}
        .test-title {{ font-weight: 700; }}
        .test-name {{ color: var(--muted); font-size: 0.8rem; font-family: monospace; }}
        .badge {{ padding: 0.2rem 0.7rem; border-radius: 9999px; font-size: 0.7rem; font-weight: 700; }}
        .test.passed .badge {{ background: rgba(16,185,129,0.15); color: var(--pass); }}
        .test.failed .badge {{ background: rgba(239,68,68,0.15); color: var(--fail); }}
        .test.skipped .badge {{ background: rgba(245,158,11,0.15); color: var(--skip); }}
        table {{ width: 100%; border-collapse: collapse; font-size: 0.85rem; }}
        td {{ padding: 0.4rem 1.25rem; border-top: 1px solid var(--border); vertical-align: top; }}
        td.time {{ color: var(--muted); font-family: monospace; width: 8rem; }}
        td.status {{ font-weight: 700; width: 6rem; }}
        .log-pass {{ color: var(--pass); }} .log-fail {{ color: var(--fail); }} .log-skip {{ color: var(--skip); }}
        .log-info {{ color: var(--info); }} .log-warning {{ color: var(--warn); }}
        .error-message {{ margin: 0 1.25rem 1rem; padding: 0.75rem; border-radius: 0.5rem; background: rgba(239,68,68,0.1); color: #fca5a5; font-family: monospace; font-size: 0.8rem; white-space: pre-wrap; }}
        .screenshot {{ padding: 0 1.25rem 1rem; }}
        .screenshot img {{ max-width: 320px; border-radius: 0.5rem; border: 1px solid var(--border); cursor: zoom-in; }}
        .empty {{ color: var(--muted); text-align: center; padding: 3rem; }}
        .meta {{ margin-top: 3rem; padding-top: 1.5rem; border-top: 1px solid var(--border); color: var(--muted); font-size: 0.8rem; display: flex; gap: 2rem; justify-content: center; }}
        #modal {{ display: none; position: fixed; inset: 0; background: rgba(0,0,0,0.9); padding: 2rem; align-items: center; justify-content: center; z-index: 10; }}
        #modal.active {{ display: flex; }}
        #modal img {{ max-width: 100%; max-height: 100%; }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <div>
                <h1>{title}</h1>
                <div class="test-name">Browser: {browser}</div>
            </div>
            <div style="text-align: right;">
                <div class="stat-label">Run Duration</div>
                <div style="font-weight: 700;">{duration}</div>
            </div>
        </header>

        <div class="summary">
            <div class="stat"><div class="stat-value">{total}</div><div class="stat-label">Tests</div></div>
            <div class="stat passed"><div class="stat-value">{passed}</div><div class="stat-label">Passed</div></div>
            <div class="stat failed"><div class="stat-value">{failed}</div><div class="stat-label">Failed</div></div>
            <div class="stat skipped"><div class="stat-value">{skipped}</div><div class="stat-label">Skipped</div></div>
        </div>

        <div class="progress-bar"><div class="progress-fill" style="width: {pass_rate}%"></div></div>

        {classes_html}

        <div class="meta">
            <span>Run: {run_id}</span>
            <span>Started: {started}</span>
            <span>Generated: {generated}</span>
        </div>
    </div>

    <div id="modal" onclick="this.classList.remove('active')">
        <img id="modal-img" src="" alt="Screenshot">
    </div>

    <script>
        function showScreenshot(path) {{
            document.getElementById('modal-img').src = path;
            document.getElementById('modal').classList.add('active');
        }}
    </script>
</body>
</html>"#,
        title = html_escape(&results.title),
        browser = html_escape(&results.browser),
        duration = format_duration(results.duration_ms),
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        pass_rate = summary.pass_rate(),
        classes_html = classes_html,
        run_id = html_escape(&results.run_id),
        started = html_escape(&results.started_at),
        generated = html_escape(&results.generated_at),
    )
}

fn render_test(node: &ReportNode) -> String {
    let (badge, class) = match &node.outcome {
        Some(TestOutcome::Passed) => ("PASSED", "passed"),
        Some(TestOutcome::Failed { .. }) => ("FAILED", "failed"),
        Some(TestOutcome::Skipped { .. }) => ("SKIPPED", "skipped"),
        None => ("UNKNOWN", "unknown"),
    };

    let mut rows = String::new();
    for entry in &node.logs {
        let css = match entry.status {
            Status::Pass => "log-pass",
            Status::Fail => "log-fail",
            Status::Skip => "log-skip",
            Status::Info => "log-info",
            Status::Warning => "log-warning",
        };
        rows.push_str(&format!(
            r#"<tr><td class="time">{}</td><td class="status {css}">{}</td><td>{}</td></tr>"#,
            html_escape(&entry.timestamp),
            entry.status.label(),
            html_escape(&entry.message),
        ));
    }

    let error_html = match &node.outcome {
        Some(TestOutcome::Failed { cause }) => {
            format!(r#"<div class="error-message">{}</div>"#, html_escape(cause))
        }
        _ => String::new(),
    };

    let screenshot_html = match &node.artifact_path {
        Some(path) => {
            let path = html_escape(path);
            format!(
                r#"<div class="screenshot"><img src="{path}" alt="Failure screenshot" onclick="showScreenshot('{path}')"></div>"#
            )
        }
        None => String::new(),
    };

    let duration_html = node
        .duration_ms
        .map(|d| format!(r#"<span class="test-name">{}</span>"#, format_duration(d)))
        .unwrap_or_default();

    format!(
        r#"
            <div class="test {class}">
                <div class="test-header">
                    <div>
                        <div class="test-title">{}</div>
                        <div class="test-name">{}</div>
                    </div>
                    <div>{duration_html} <span class="badge">{badge}</span></div>
                </div>
                <table>{rows}</table>
                {error_html}
                {screenshot_html}
            </div>"#,
        html_escape(&node.title),
        html_escape(&node.name),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60000;
        let seconds = (ms % 60000) as f64 / 1000.0;
        format!("{}m {:.0}s", minutes, seconds)
    }
}
