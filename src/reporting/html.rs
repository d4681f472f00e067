//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders a suite run as a single self-contained HTML page with
//! summary counts, a results table and collapsible failure details.
//!
//! 此模块将一次套件运行渲染为独立的 HTML 页面，包含统计摘要、结果表格和可折叠的失败详情。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::collector::CollectedSuite;
use crate::core::scheduler::ResultTable;
use crate::infra::t;
use crate::reporting::ordered_results;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292e; }
h1 { font-size: 1.6em; }
.summary-container { display: flex; gap: 2em; margin-bottom: 1.5em; }
.summary-item { display: flex; flex-direction: column; align-items: center; }
.count { font-size: 2em; font-weight: bold; }
.passed-text { color: #22863a; }
.failed-text { color: #cb2431; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #e1e4e8; padding: 6px 10px; text-align: left; vertical-align: top; }
.status-cell { display: inline-block; padding: 2px 8px; border-radius: 4px; color: #fff; }
.status-Passed { background: #2ea44f; }
.status-Failed { background: #cb2431; }
.status-Timeout { background: #b08800; }
.status-Crashed { background: #6f42c1; }
.status-Unknown { background: #6a737d; }
.output-toggle { cursor: pointer; color: #0366d6; font-size: 0.85em; margin-top: 4px; }
.output-content { white-space: pre-wrap; background: #f6f8fa; padding: 1em; max-height: 40em; overflow: auto; }
"#;

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const HTML_SCRIPT: &str = r#"
function toggleOutput(id) {
  var row = document.getElementById(id);
  row.style.display = row.style.display === 'none' ? 'table-row' : 'none';
}
"#;

/// Renders the report page.
/// 渲染报告页面。
pub fn render_html_report(suite: &CollectedSuite, table: &ResultTable, locale: &str) -> Markup {
    let rows = ordered_results(suite, table);
    let failed = rows.iter().filter(|(_, r)| r.is_failure()).count();
    let passed = rows.len() - failed;

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) " - " (suite.name) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) ": " (suite.name) }
                div class="summary-container" {
                    div class="summary-item" {
                        span class="count" { (rows.len()) }
                        span class="label" { (t!("html_report.summary.total", locale = locale)) }
                    }
                    div class="summary-item" {
                        span class="count passed-text" { (passed) }
                        span class="label" { (t!("html_report.summary.passed", locale = locale)) }
                    }
                    div class="summary-item" {
                        span class="count failed-text" { (failed) }
                        span class="label" { (t!("html_report.summary.failed", locale = locale)) }
                    }
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.name", locale = locale)) }
                            th { (t!("html_report.table.header.status", locale = locale)) }
                            th { (t!("html_report.table.header.duration", locale = locale)) }
                            th { (t!("html_report.table.header.launches", locale = locale)) }
                        }
                    }
                    tbody {
                        @for (i, (item, result)) in rows.iter().enumerate() {
                            @let output_id = format!("output-{}", i);
                            tr {
                                td { (item.display_name) }
                                td {
                                    div class={ "status-cell " (result.get_status_class()) } {
                                        (result.get_status_str(locale))
                                    }
                                    @if let Some(message) = result.failure_message() {
                                        div { (message) }
                                        div class="output-toggle" onclick={ "toggleOutput('" (output_id) "')" } {
                                            (t!("html_report.toggle_output", locale = locale))
                                        }
                                    }
                                }
                                td { (format!("{:.2}s", result.duration.as_secs_f64())) }
                                td { (result.attempts) }
                            }
                            @if result.is_failure() {
                                tr id=(output_id) style="display:none;" {
                                    td colspan="4" {
                                        pre class="output-content" { (result.to_string()) }
                                    }
                                }
                            }
                        }
                    }
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    }
}

/// Writes the HTML report of a run to `output_path`.
///
/// # Errors
/// Fails when the file cannot be written.
pub fn generate_html_report(
    suite: &CollectedSuite,
    table: &ResultTable,
    output_path: &Path,
    locale: &str,
) -> Result<()> {
    let page = render_html_report(suite, table, locale);
    fs::write(output_path, page.into_string())
        .with_context(|| format!("Failed to write HTML report to {}", output_path.display()))?;
    Ok(())
}
