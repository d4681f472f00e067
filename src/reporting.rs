//! # Reporting Module / 报告模块
//!
//! This module defines the `Reporter` seam the scheduler talks to, and the
//! console, HTML and JSON outputs of a finished run.
//!
//! 此模块定义调度器使用的 `Reporter` 接口，以及运行结束后的控制台、HTML 和 JSON 输出。

pub mod console;
pub mod html;
pub mod json;

use colored::*;

use crate::core::collector::{CollectedItem, CollectedSuite};
use crate::core::models::TestResult;
use crate::core::scheduler::ResultTable;
use crate::infra::t;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
pub use html::generate_html_report;
pub use json::write_json_report;

/// Receives collection and results as the scheduler produces them.
///
/// `report_result` is called exactly once per collected case, as soon as its
/// result is final.
///
/// 在调度器产生结果时接收收集信息和结果。
/// 每个已收集的用例在其结果最终确定后恰好调用一次 `report_result`。
pub trait Reporter: Send + Sync {
    fn report_collected(&self, suite: &CollectedSuite);
    fn report_result(&self, item: &CollectedItem, result: &TestResult);
}

/// Prints one line per finished case.
/// 每完成一个用例打印一行。
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    locale: String,
}

impl ConsoleReporter {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report_collected(&self, suite: &CollectedSuite) {
        println!(
            "{}",
            t!(
                "run.collected",
                locale = &self.locale,
                count = suite.items.len(),
                suite = &suite.name
            )
            .cyan()
        );
        if suite.deselected > 0 {
            println!(
                "{}",
                t!("run.deselected", locale = &self.locale, count = suite.deselected).dimmed()
            );
        }
    }

    fn report_result(&self, item: &CollectedItem, result: &TestResult) {
        let status = result.get_status_str(&self.locale);
        let status = if result.is_pass() {
            status.green()
        } else {
            status.red()
        };
        let message = result
            .failure_message()
            .map(|m| format!(" - {}", m))
            .unwrap_or_default();
        println!(
            "  {:<10} {} ({:.2}s){}",
            status,
            item.display_name,
            result.duration.as_secs_f64(),
            message
        );
    }
}

/// Results in declaration order, paired with their items.
/// 按声明顺序排列的结果，与对应条目配对。
pub fn ordered_results<'a>(
    suite: &'a CollectedSuite,
    table: &'a ResultTable,
) -> Vec<(&'a CollectedItem, &'a TestResult)> {
    suite
        .items
        .iter()
        .filter_map(|item| table.get(item.name()).map(|result| (item, result)))
        .collect()
}
