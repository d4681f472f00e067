//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: load and collect the suite,
//! drive it through the scheduler with the process launcher, then print the
//! summary and write the optional reports.
//!
//! 此模块实现 `run` 命令：加载并收集套件，通过调度器和进程启动器运行，
//! 然后打印摘要并写出可选的报告。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        collector,
        config::{self, RunOptions},
        errors::TestsFailed,
        scheduler::{RunEnvironment, Scheduler},
    },
    infra::{
        artifacts::{ArtifactManager, DirArtifactManager},
        command::ProcessLauncher,
        process::SystemProcessKiller,
        t,
        workspace::{LocalWorkspace, Workspace},
    },
    reporting::{ConsoleReporter, generate_html_report, print_failure_details, print_summary, write_json_report},
};

/// Arguments of the `run` command.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub suite: PathBuf,
    pub options: RunOptions,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    /// `--lang` from the command line; otherwise the suite's language is used.
    pub explicit_lang: Option<String>,
}

/// Executes the run command with the provided arguments.
///
/// # Errors
/// `FrameworkError` for unusable suites and workspaces, `TestsFailed` when any case did not pass.
pub async fn execute(args: RunArgs) -> Result<()> {
    let suite = config::load_suite(&args.suite)?;
    let locale = match &args.explicit_lang {
        Some(lang) => lang.clone(),
        None => {
            crate::set_language(&suite.language);
            rust_i18n::locale().to_string()
        }
    };

    println!(
        "{}",
        t!("loading_suite", locale = &locale, path = args.suite.display())
    );

    let collected = collector::collect(&suite, &args.options)?;
    if collected.is_empty() {
        println!("{}", t!("no_cases_to_run", locale = &locale).green());
        return Ok(());
    }

    let workspace = Arc::new(LocalWorkspace::from_suite(&suite));
    let artifacts = Arc::new(DirArtifactManager::for_run(&workspace.artifact_root(), &suite.name));
    tracing::info!(artifacts = %artifacts.root().display(), "artifact directory");

    let env = RunEnvironment {
        workspace,
        artifacts: artifacts.clone(),
        killer: Arc::new(SystemProcessKiller),
    };
    let launcher = ProcessLauncher::new(&collected.settings);
    let scheduler = Scheduler::new(launcher, env, collected.settings.bisect_depth)
        .with_cancel_token(setup_signal_handler(&locale));
    let reporter = ConsoleReporter::new(locale.clone());

    let table = scheduler.run(&collected, &reporter).await?;

    print_summary(&collected, &table, &locale);
    println!(
        "{}",
        t!("artifacts_saved", locale = &locale, path = artifacts.root().display()).dimmed()
    );

    if let Some(report_path) = &args.html {
        println!("\n{}", t!("generating_html_report", locale = &locale, path = report_path.display()));
        if let Err(e) = generate_html_report(&collected, &table, report_path, &locale) {
            eprintln!("{} {}", t!("html_report_failed", locale = &locale).red(), e);
        }
    }
    if let Some(report_path) = &args.json {
        if let Err(e) = write_json_report(&collected, &table, report_path) {
            eprintln!("{} {}", t!("json_report_failed", locale = &locale).red(), e);
        }
    }

    let failed = table.values().filter(|r| r.is_failure()).count();
    if failed > 0 {
        print_failure_details(&collected, &table, &locale);
        return Err(TestsFailed {
            failed,
            total: table.len(),
        }
        .into());
    }

    println!("\n{}", t!("all_tests_passed", locale = &locale).green().bold());
    Ok(())
}

/// Cancels the run on Ctrl-C.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}
