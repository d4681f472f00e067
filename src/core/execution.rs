//! # Plan Execution Module / 计划执行模块
//!
//! This module defines the `Launcher` seam and runs one launch plan end to
//! end: launch the host, classify the outcome of every case, keep the
//! aggregate log, the crash report and, for batched plans, the per-case log
//! slices as artifacts.
//!
//! 此模块定义 `Launcher` 接口，并完整执行一个启动计划：
//! 启动宿主、对每个用例的结果进行分类，并将聚合日志、崩溃报告
//! 以及批量计划的每用例日志切片保存为产物。

use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::core::classifier::{self, ClassifyOptions};
use crate::core::errors::LaunchError;
use crate::core::models::{LaunchOutcome, LaunchPlan, TestResult};
use crate::core::slicer;
use crate::infra::artifacts::ArtifactManager;

/// Turns a launch plan into a finished host process.
///
/// A launcher enforces the plan's wall-clock budget and honours the
/// cancellation token, but never retries and never reads meaning into the log.
///
/// 将启动计划转换为一次完成的宿主进程运行。
/// 启动器负责执行计划的时间预算并响应取消令牌，但从不重试，也不解释日志。
pub trait Launcher: Send + Sync {
    fn run(
        &self,
        plan: &LaunchPlan,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<LaunchOutcome, LaunchError>> + Send;
}

/// Runs a plan and returns one result per case, in plan order.
///
/// Artifact failures are logged and never change a result.
///
/// # Errors
/// Only `LaunchError::BinaryMissing`, which is fatal for the whole suite.
pub async fn execute_plan<L: Launcher>(
    launcher: &L,
    plan: &LaunchPlan,
    cancel: &CancellationToken,
    artifacts: &dyn ArtifactManager,
    options: ClassifyOptions,
) -> Result<Vec<TestResult>, LaunchError> {
    tracing::info!(
        plan = plan.id,
        cases = ?plan.case_names(),
        command = %plan.command.display(),
        "launching host"
    );
    let outcome = launcher.run(plan, cancel).await?;
    tracing::debug!(
        plan = plan.id,
        exit_code = ?outcome.exit_code,
        timed_out = outcome.timed_out,
        cancelled = outcome.cancelled,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "host finished"
    );

    let outcomes = classifier::classify(&outcome, plan, options);
    save_launch_artifacts(&outcome, plan, artifacts);

    let sliced = slicer::slice_log(&outcome.log);
    let slice_paths = if plan.batched {
        match slicer::persist(&sliced, plan, artifacts) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(plan = plan.id, error = %e, "failed to save log slices");
                vec![]
            }
        }
    } else {
        vec![]
    };

    let results = plan
        .cases
        .iter()
        .zip(outcomes)
        .map(|(case, case_outcome)| {
            let mut result = TestResult::new(case.name.clone(), case_outcome);
            result.output = outcome.output.clone();
            result.duration = outcome.elapsed;
            result.attempts = 1;
            if plan.batched {
                if let Some(slice) = sliced.slice_for(&case.script_arg()) {
                    result.log_output = slice.text.to_string();
                    result.log_slice = slice_paths.get(slice.index - 1).cloned();
                }
            } else {
                result.log_output = outcome.log.clone();
            }
            result
        })
        .collect();

    Ok(results)
}

fn save_launch_artifacts(outcome: &LaunchOutcome, plan: &LaunchPlan, artifacts: &dyn ArtifactManager) {
    if !outcome.log.is_empty() {
        if let Err(e) = artifacts.save_text(&outcome.log, &slicer::aggregate_artifact_name(plan)) {
            tracing::warn!(plan = plan.id, error = %e, "failed to save host log");
        }
    }

    let crash_files: [&Option<PathBuf>; 2] = [&outcome.crash_log_path, &outcome.crash_dump_path];
    for path in crash_files.into_iter().flatten() {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let dest = format!("plan-{}/{}", plan.id, file_name.to_string_lossy());
        if let Err(e) = artifacts.save(path, &dest) {
            tracing::warn!(plan = plan.id, error = %e, "failed to save crash report");
        }
    }
}
