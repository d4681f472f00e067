//! # Launch Planner Module / 启动计划模块
//!
//! This module decides how collected cases share host processes: the
//! concurrency bound, the split of a parallel-batched bucket into
//! sub-batches of similar cost, the halves of a bisection round, and the
//! command line of every launch plan.
//!
//! 此模块决定已收集的用例如何共享宿主进程：并发上限、
//! 将并行批量分组拆分为成本相近的子批次、二分轮次的两半，
//! 以及每个启动计划的命令行。

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::config::SuiteSettings;
use crate::core::models::{CommandLine, LaunchPlan, TestCaseDescriptor};
use crate::infra::workspace::Workspace;

/// Half of the logical cores, never less than one.
/// 逻辑核心数的一半，至少为 1。
pub static DEFAULT_PARALLEL_EXECUTABLES: Lazy<usize> =
    Lazy::new(|| std::cmp::max(1, num_cpus::get() / 2));

/// Number of host processes a bucket may run at once.
///
/// An explicit value wins over the default; the result is never larger than
/// the number of plans the bucket produces and never smaller than one.
pub fn resolve_parallelism(explicit: Option<usize>, bucket_len: usize) -> usize {
    let wanted = explicit.unwrap_or(*DEFAULT_PARALLEL_EXECUTABLES).max(1);
    wanted.min(bucket_len.max(1))
}

/// Splits cases into at most `k` sub-batches of roughly equal cost.
///
/// Cases are assigned greedily, most expensive first, to the cheapest
/// sub-batch so far. Each sub-batch keeps declaration order.
///
/// 将用例拆分为最多 `k` 个成本大致相等的子批次。
/// 按成本从高到低贪心地分配到当前成本最低的子批次；每个子批次内保持声明顺序。
pub fn split_by_cost(cases: Vec<TestCaseDescriptor>, k: usize) -> Vec<Vec<TestCaseDescriptor>> {
    let k = k.max(1).min(cases.len().max(1));
    if cases.is_empty() {
        return vec![];
    }
    if k == 1 {
        return vec![cases];
    }

    let mut order: Vec<usize> = (0..cases.len()).collect();
    // Stable sort keeps declaration order among equal costs.
    order.sort_by(|a, b| cases[*b].cost().cmp(&cases[*a].cost()));

    let mut loads = vec![Duration::ZERO; k];
    let mut bins: Vec<Vec<usize>> = vec![vec![]; k];
    for index in order {
        let (target, _) = loads
            .iter()
            .enumerate()
            .min_by_key(|(i, load)| (**load, *i))
            .unwrap_or((0, &Duration::ZERO));
        loads[target] += cases[index].cost();
        bins[target].push(index);
    }

    let mut slots: Vec<Option<TestCaseDescriptor>> = cases.into_iter().map(Some).collect();
    bins.into_iter()
        .filter(|bin| !bin.is_empty())
        .map(|mut bin| {
            bin.sort_unstable();
            bin.into_iter()
                .filter_map(|index| slots[index].take())
                .collect()
        })
        .collect()
}

/// Splits an ambiguous subset for the next bisection round.
///
/// A single case is re-run alone; more cases are split into two halves.
/// 单个用例单独重跑；多个用例拆分为两半。
pub fn bisect(cases: Vec<TestCaseDescriptor>) -> Vec<Vec<TestCaseDescriptor>> {
    match cases.len() {
        0 => vec![],
        1 => vec![cases],
        n => {
            let mut first = cases;
            let second = first.split_off(n / 2);
            vec![first, second]
        }
    }
}

/// Builds launch plans with unique ids and per-plan log locations.
/// 构建带有唯一 ID 和独立日志位置的启动计划。
pub struct PlanBuilder<'a> {
    settings: &'a SuiteSettings,
    workspace: &'a dyn Workspace,
    executable: PathBuf,
    next_id: AtomicU64,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(settings: &'a SuiteSettings, workspace: &'a dyn Workspace) -> Self {
        Self {
            settings,
            executable: workspace.executable_path(settings.kind),
            workspace,
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of plans built so far.
    pub fn built(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }

    pub fn build(&self, cases: Vec<TestCaseDescriptor>, batched: bool) -> LaunchPlan {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let log_path = self.workspace.log_path(self.settings.kind, id);
        let log_dir = log_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.workspace.project_log_dir());
        let timeout = plan_timeout(self.settings, &cases, batched);
        let args = command_args(self.settings, &cases, &log_path, &log_dir);

        LaunchPlan {
            id,
            kind: self.settings.kind,
            cases,
            command: CommandLine {
                program: self.executable.clone(),
                args,
            },
            log_dir,
            log_path,
            timeout,
            batched,
        }
    }
}

/// Wall-clock budget of a plan: the case timeouts plus the crash-log grace.
/// Any unbounded case makes the whole plan unbounded.
pub fn plan_timeout(
    settings: &SuiteSettings,
    cases: &[TestCaseDescriptor],
    batched: bool,
) -> Option<Duration> {
    let mut total = Duration::ZERO;
    for case in cases {
        total += case.timeout?;
    }
    if batched {
        if let Some(cap) = settings.max_batch_timeout {
            total = total.min(cap);
        }
    }
    Some(total + settings.crash_log_grace)
}

/// `<suite-wide flags> <per-plan flags> --runpythontest <scripts> [--test-timeout=<s>]`
pub fn command_args(
    settings: &SuiteSettings,
    cases: &[TestCaseDescriptor],
    log_path: &std::path::Path,
    log_dir: &std::path::Path,
) -> Vec<String> {
    let mut args = settings.global_args.clone();

    let null_renderer = cases
        .iter()
        .any(|c| c.use_null_renderer.unwrap_or(settings.use_null_renderer));
    if null_renderer {
        args.push("-rhi=null".to_string());
    }
    if cases.iter().any(|c| c.attach_debugger) {
        args.push("--attach-debugger".to_string());
    }
    if cases.iter().any(|c| c.wait_for_debugger) {
        args.push("--wait-for-debugger".to_string());
    }

    let mut seen: Vec<&[String]> = vec![];
    for case in cases {
        if case.extra_args.is_empty() || seen.contains(&case.extra_args.as_slice()) {
            continue;
        }
        seen.push(&case.extra_args);
        args.extend(case.extra_args.iter().cloned());
    }

    args.push("-logfile".to_string());
    args.push(log_path.to_string_lossy().to_string());
    args.push("-project-log-path".to_string());
    args.push(log_dir.to_string_lossy().to_string());

    args.push("--runpythontest".to_string());
    args.push(
        cases
            .iter()
            .map(TestCaseDescriptor::script_arg)
            .collect::<Vec<_>>()
            .join(";"),
    );

    let per_test = cases
        .iter()
        .map(|c| c.timeout)
        .try_fold(0u64, |acc, t| t.map(|t| acc.max(t.as_secs())));
    if let Some(secs) = per_test {
        args.push(format!("--test-timeout={}", secs));
    }
    args
}
