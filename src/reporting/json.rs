//! # JSON Reporting Module / JSON 报告模块
//!
//! Machine-readable report of a suite run.
//!
//! 套件运行的机器可读报告。

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::collector::CollectedSuite;
use crate::core::models::Outcome;
use crate::core::scheduler::ResultTable;
use crate::reporting::ordered_results;

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub suite: &'a str,
    pub generated_at: DateTime<Local>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<JsonCase<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonCase<'a> {
    pub name: &'a str,
    pub display_name: &'a str,
    pub status: &'static str,
    /// What a test framework shows as the failure message.
    pub message: Option<String>,
    pub outcome: &'a Outcome,
    pub duration_secs: f64,
    pub launches: u32,
    pub log_slice: Option<&'a PathBuf>,
}

/// Builds the report structure.
pub fn build_json_report<'a>(suite: &'a CollectedSuite, table: &'a ResultTable) -> JsonReport<'a> {
    let results: Vec<JsonCase<'a>> = ordered_results(suite, table)
        .into_iter()
        .map(|(item, result)| JsonCase {
            name: &result.name,
            display_name: &item.display_name,
            status: if result.is_pass() { "passed" } else { "failed" },
            message: result.failure_message(),
            outcome: &result.outcome,
            duration_secs: result.duration.as_secs_f64(),
            launches: result.attempts,
            log_slice: result.log_slice.as_ref(),
        })
        .collect();
    let passed = results.iter().filter(|r| r.status == "passed").count();

    JsonReport {
        suite: &suite.name,
        generated_at: Local::now(),
        total: results.len(),
        passed,
        failed: results.len() - passed,
        results,
    }
}

/// Writes the JSON report of a run to `output_path`.
pub fn write_json_report(suite: &CollectedSuite, table: &ResultTable, output_path: &Path) -> Result<()> {
    let report = build_json_report(suite, table);
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize JSON report")?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;
    Ok(())
}
