//! # List Command Module / 列表命令模块
//!
//! Prints what a run would execute: the collected items and, on request,
//! the hidden runner items with their buckets. Starts no process.
//!
//! 打印一次运行将执行的内容：已收集的条目，以及按需显示的隐藏运行器条目及其分组。
//! 不会启动任何进程。

use anyhow::Result;
use colored::*;
use std::path::Path;

use crate::core::{
    collector,
    config::{self, RunOptions},
    models::Bucket,
    planner,
};
use crate::infra::t;

pub fn execute(suite_path: &Path, options: &RunOptions, show_runners: bool, locale: &str) -> Result<()> {
    let suite = config::load_suite(suite_path)?;
    let collected = collector::collect(&suite, options)?;

    println!(
        "{}",
        t!(
            "run.collected",
            locale = locale,
            count = collected.items.len(),
            suite = &collected.name
        )
        .cyan()
    );
    for item in &collected.items {
        match &item.collection_failure {
            None => println!("  {} [{}]", item.display_name, item.case.bucket().runner_name().dimmed()),
            Some(reason) => println!("  {} {}", item.display_name, format!("({})", reason).red()),
        }
    }
    if collected.deselected > 0 {
        println!(
            "{}",
            t!("run.deselected", locale = locale, count = collected.deselected).dimmed()
        );
    }

    if show_runners {
        println!("\n{}", t!("list.runners_header", locale = locale).bold());
        for runner in &collected.runners {
            let k = match runner.bucket {
                Bucket::Parallel | Bucket::ParallelBatched => planner::resolve_parallelism(
                    collected.settings.parallel_executables,
                    runner.cases.len(),
                ),
                Bucket::Single | Bucket::Batched => 1,
            };
            println!(
                "  {} {}",
                runner.name.yellow(),
                t!("list.runner_detail", locale = locale, count = runner.cases.len(), parallel = k)
            );
            for case in &runner.cases {
                println!("    - {}", case);
            }
        }
    }
    Ok(())
}
