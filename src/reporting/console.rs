//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the end-of-run summary and the failure details of a
//! suite run, with internationalization support.
//!
//! 此模块打印套件运行结束时的摘要和失败详情，支持国际化。

use colored::*;

use crate::core::collector::CollectedSuite;
use crate::core::scheduler::ResultTable;
use crate::infra::t;
use crate::reporting::ordered_results;

/// Prints a formatted summary of test results to the console.
/// Displays a table with test status, name, duration, and launch count,
/// using color coding to highlight different statuses.
///
/// 在控制台打印格式化的测试结果摘要。
/// 显示一个包含测试状态、名称、持续时间和启动次数的表格，
/// 使用颜色编码突出显示不同的状态。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test Summary ---
///   - Passed     | Suite::Foo                               |      1.23s
///   - Crashed    | Suite::Bar                               |      0.45s  (2 launches)
/// ```
pub fn print_summary(suite: &CollectedSuite, table: &ResultTable, locale: &str) {
    println!("\n{}", t!("test_summary_banner", locale = locale).bold());

    for (item, result) in ordered_results(suite, table) {
        let status_str = result.get_status_str(locale);
        let status_colored = if result.is_pass() {
            status_str.green()
        } else if result.is_ambiguous() {
            status_str.yellow()
        } else {
            status_str.red()
        };
        let launches = if result.attempts > 1 {
            format!(
                " ({})",
                t!("summary_launches", locale = locale, count = result.attempts)
            )
        } else {
            String::new()
        };

        println!(
            "  - {:<10} | {:<40} | {:>9.2}s {}",
            status_colored,
            item.display_name,
            result.duration.as_secs_f64(),
            launches
        );
    }

    let failed = table.values().filter(|r| r.is_failure()).count();
    let passed = table.len() - failed;
    println!(
        "\n{}",
        t!(
            "summary_counts",
            locale = locale,
            total = table.len(),
            passed = passed,
            failed = failed
        )
    );
}

/// Prints the full result banner of every case that did not pass.
///
/// 打印每个未通过用例的完整结果横幅。
pub fn print_failure_details(suite: &CollectedSuite, table: &ResultTable, locale: &str) {
    let failures: Vec<_> = ordered_results(suite, table)
        .into_iter()
        .filter(|(_, result)| result.is_failure())
        .collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, (item, result)) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report_header_failure", locale = locale).red(),
            item.display_name.cyan()
        );
        if let Some(slice) = &result.log_slice {
            println!("{}", t!("log_slice_saved", locale = locale, path = slice.display()).dimmed());
        }
        println!("\n{}", result);
        println!("{}", "-".repeat(80));
    }
}
