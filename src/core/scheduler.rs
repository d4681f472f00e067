//! # Scheduler Module / 调度模块
//!
//! The scheduler drives a collected suite to completion. It runs the buckets
//! in order, keeps at most K host processes alive, re-plans ambiguous cases
//! of batched launches in bisection rounds, and hands every final result to
//! the reporter.
//!
//! 调度器负责把已收集的套件运行到结束。它按顺序运行各分组，
//! 同时最多保持 K 个宿主进程，在二分轮次中重新计划批量启动里结果不确定的用例，
//! 并将每个最终结果交给报告器。
//!
//! All bookkeeping (result table, bisection ledger) happens on the driver
//! task between rounds; launches only ever return their results.

use futures::{StreamExt, stream};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::classifier::ClassifyOptions;
use crate::core::collector::CollectedSuite;
use crate::core::errors::FrameworkError;
use crate::core::execution::{Launcher, execute_plan};
use crate::core::config::SuiteSettings;
use crate::core::models::{
    Bucket, LaunchPlan, Outcome, TestCaseDescriptor, TestResult, UnknownCause,
};
use crate::core::planner::{self, PlanBuilder};
use crate::infra::artifacts::ArtifactManager;
use crate::infra::process::{ProcessKiller, Target};
use crate::infra::workspace::Workspace;
use crate::reporting::Reporter;

/// Bisection rounds an ambiguous case may take part in by default.
pub const DEFAULT_BISECT_DEPTH: u32 = 1;

/// Final results keyed by case name.
pub type ResultTable = BTreeMap<String, TestResult>;

/// The collaborators a scheduler needs besides its launcher.
/// 调度器除启动器外需要的协作者。
#[derive(Clone)]
pub struct RunEnvironment {
    pub workspace: Arc<dyn Workspace>,
    pub artifacts: Arc<dyn ArtifactManager>,
    pub killer: Arc<dyn ProcessKiller>,
}

/// Runs collected suites against a launcher.
/// 使用启动器运行已收集的套件。
pub struct Scheduler<L: Launcher> {
    launcher: L,
    env: RunEnvironment,
    bisect_depth: u32,
    cancel: CancellationToken,
}

/// Per-run mutable state, owned by the driver.
struct RunState<'r> {
    table: ResultTable,
    ledger: HashMap<String, u32>,
    attempts: HashMap<String, u32>,
    suite: &'r CollectedSuite,
    reporter: &'r dyn Reporter,
}

impl RunState<'_> {
    fn finalize(&mut self, mut result: TestResult) {
        result.attempts = self.attempts.get(&result.name).copied().unwrap_or(0);
        if let Some(item) = self.suite.item(&result.name) {
            self.reporter.report_result(item, &result);
        }
        self.table.insert(result.name.clone(), result);
    }
}

impl<L: Launcher> Scheduler<L> {
    /// Creates a scheduler. `bisect_depth` bounds how many recovery rounds a case may take part in.
    pub fn new(launcher: L, env: RunEnvironment, bisect_depth: u32) -> Self {
        Self {
            launcher,
            env,
            bisect_depth,
            cancel: CancellationToken::new(),
        }
    }

    /// Shares an external cancellation token, e.g. one fired on Ctrl-C.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Runs every collected case and returns the result table.
    ///
    /// Every collected case ends up in the table, including cases that failed
    /// collection and cases a cancellation never let run.
    ///
    /// 运行所有已收集的用例并返回结果表。每个已收集的用例都会出现在结果表中。
    ///
    /// # Errors
    /// `WorkspaceInvalid` and `BinaryMissing`; everything a host does wrong becomes a result.
    pub async fn run(
        &self,
        suite: &CollectedSuite,
        reporter: &dyn Reporter,
    ) -> Result<ResultTable, FrameworkError> {
        reporter.report_collected(suite);

        let mut state = RunState {
            table: ResultTable::new(),
            ledger: HashMap::new(),
            attempts: HashMap::new(),
            suite,
            reporter,
        };

        for item in &suite.items {
            if let Some(result) = item.collection_result() {
                state.finalize(result);
            }
        }

        if suite.runnable_count() == 0 {
            return Ok(state.table);
        }

        self.env.workspace.prepare()?;
        let executable = self.env.workspace.executable_path(suite.kind);
        if !executable.exists() {
            return Err(FrameworkError::BinaryMissing { path: executable });
        }

        self.kill_orphans(suite);
        let outcome = self.run_buckets(suite, &mut state).await;
        self.kill_orphans(suite);
        if let Err(e) = self.env.workspace.clean_temp() {
            tracing::warn!(error = %e, "failed to clean temporary directory");
        }
        outcome?;

        for item in &suite.items {
            if !state.table.contains_key(item.name()) {
                state.finalize(TestResult::unknown(item.name(), UnknownCause::Cancelled));
            }
        }
        Ok(state.table)
    }

    async fn run_buckets(
        &self,
        suite: &CollectedSuite,
        state: &mut RunState<'_>,
    ) -> Result<(), FrameworkError> {
        let settings = &suite.settings;
        let builder = PlanBuilder::new(settings, self.env.workspace.as_ref());

        for runner in &suite.runners {
            let cases = suite.bucket_cases(runner.bucket);
            if cases.is_empty() {
                continue;
            }
            for case in &cases {
                state.ledger.insert(case.name.clone(), self.bisect_depth);
            }

            let (groups, k): (Vec<Vec<TestCaseDescriptor>>, usize) = match runner.bucket {
                Bucket::Single => (cases.into_iter().map(|c| vec![c]).collect(), 1),
                Bucket::Parallel => {
                    let k = planner::resolve_parallelism(settings.parallel_executables, cases.len());
                    (cases.into_iter().map(|c| vec![c]).collect(), k)
                }
                Bucket::Batched => (vec![cases], 1),
                Bucket::ParallelBatched => {
                    let k = planner::resolve_parallelism(settings.parallel_executables, cases.len());
                    (planner::split_by_cost(cases, k), k)
                }
            };

            tracing::info!(
                runner = runner.name,
                plans = groups.len(),
                parallel = k,
                "running bucket"
            );
            let batched = runner.bucket.is_batched();
            let round = groups.into_iter().map(|g| (g, batched)).collect();
            self.run_rounds(round, k, &builder, state).await?;
        }
        Ok(())
    }

    /// Runs a round of plans, then keeps re-planning ambiguous cases until the ledger runs dry.
    async fn run_rounds(
        &self,
        mut round: Vec<(Vec<TestCaseDescriptor>, bool)>,
        k: usize,
        builder: &PlanBuilder<'_>,
        state: &mut RunState<'_>,
    ) -> Result<(), FrameworkError> {
        // Results of cases waiting for a recovery round; replaced when the round reports back.
        let mut provisional: HashMap<String, TestResult> = HashMap::new();
        let suite = state.suite;

        while !round.is_empty() {
            if self.cancel.is_cancelled() {
                break;
            }
            let plans: Vec<LaunchPlan> = round
                .drain(..)
                .map(|(cases, batched)| builder.build(cases, batched))
                .collect();
            let finished = self.launch_all(plans, k, &suite.settings).await?;

            for (plan, results) in finished {
                for case in &plan.cases {
                    *state.attempts.entry(case.name.clone()).or_insert(0) += 1;
                }

                let mut retry: Vec<TestCaseDescriptor> = vec![];
                for (case, result) in plan.cases.iter().zip(results) {
                    provisional.remove(&case.name);
                    if self.should_retry(&plan, &result, state) {
                        if let Some(left) = state.ledger.get_mut(&case.name) {
                            *left -= 1;
                        }
                        tracing::debug!(case = %case.name, outcome = result.outcome.label(), "scheduling recovery run");
                        retry.push(case.clone());
                        provisional.insert(case.name.clone(), result);
                    } else {
                        state.finalize(result);
                    }
                }

                if !retry.is_empty() {
                    tracing::info!(plan = plan.id, cases = retry.len(), "bisecting ambiguous cases");
                    round.extend(planner::bisect(retry).into_iter().map(|g| (g, true)));
                }
            }
        }

        // Recovery rounds a cancellation prevented keep the result of their last launch.
        let mut leftover: Vec<TestResult> = provisional.into_values().collect();
        leftover.sort_by(|a, b| a.name.cmp(&b.name));
        for result in leftover {
            state.finalize(result);
        }
        Ok(())
    }

    fn should_retry(&self, plan: &LaunchPlan, result: &TestResult, state: &RunState<'_>) -> bool {
        plan.batched
            && plan.len() > 1
            && result.is_ambiguous()
            && !matches!(
                result.outcome,
                Outcome::Unknown {
                    cause: UnknownCause::Cancelled
                }
            )
            && !self.cancel.is_cancelled()
            && state.ledger.get(&result.name).copied().unwrap_or(0) > 0
    }

    /// Runs plans with at most `k` in flight. Once cancelled, no new plan starts and
    /// in-flight plans get `cancel_deadline` before they are dropped.
    async fn launch_all(
        &self,
        plans: Vec<LaunchPlan>,
        k: usize,
        settings: &SuiteSettings,
    ) -> Result<Vec<(LaunchPlan, Vec<TestResult>)>, FrameworkError> {
        let options = ClassifyOptions {
            test_fail_retcode: settings.test_fail_retcode,
            startup_grace: settings.startup_grace,
        };
        let cancel = &self.cancel;
        let launcher = &self.launcher;
        let artifacts = self.env.artifacts.as_ref();

        let launches = stream::iter(plans)
            .map(|plan| async move {
                if cancel.is_cancelled() {
                    let results: Vec<TestResult> = plan
                        .cases
                        .iter()
                        .map(|c| TestResult::unknown(c.name.clone(), UnknownCause::Cancelled))
                        .collect();
                    return Ok::<_, FrameworkError>((plan, results));
                }
                let results = execute_plan(launcher, &plan, cancel, artifacts, options).await?;
                Ok::<_, FrameworkError>((plan, results))
            })
            .buffer_unordered(k.max(1));
        let mut launches = std::pin::pin!(launches);

        let deadline = async {
            cancel.cancelled().await;
            tokio::time::sleep(settings.cancel_deadline).await;
        };
        let mut deadline = std::pin::pin!(deadline);

        let mut finished = vec![];
        loop {
            tokio::select! {
                next = launches.next() => match next {
                    Some(Ok(done)) => finished.push(done),
                    Some(Err(e)) => return Err(e),
                    None => break,
                },
                _ = &mut deadline => {
                    tracing::warn!("cancel deadline reached, abandoning in-flight launches");
                    break;
                }
            }
        }
        Ok(finished)
    }

    fn kill_orphans(&self, suite: &CollectedSuite) {
        for name in &suite.settings.orphan_process_names {
            if let Err(e) = self.env.killer.kill_tree(&Target::Name(name.clone())) {
                tracing::debug!(process = %name, error = %e, "orphan cleanup failed");
            }
        }
    }
}
