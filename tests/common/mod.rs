// Shared test helpers: a scripted launcher, a throwaway workspace and recorders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use editor_test_runner::core::collector::{self, CollectedItem, CollectedSuite};
use editor_test_runner::core::config::{CaseConfig, RunOptions, SuiteConfig};
use editor_test_runner::core::errors::{FrameworkError, LaunchError};
use editor_test_runner::core::execution::Launcher;
use editor_test_runner::core::models::{
    ExecutableKind, LaunchOutcome, LaunchPlan, TestCaseDescriptor, TestResult,
};
use editor_test_runner::core::scheduler::{ResultTable, RunEnvironment, Scheduler};
use editor_test_runner::infra::artifacts::DirArtifactManager;
use editor_test_runner::infra::process::{ProcessKiller, Target};
use editor_test_runner::infra::workspace::Workspace;
use editor_test_runner::reporting::Reporter;
use tempfile::{TempDir, tempdir};
use tokio_util::sync::CancellationToken;

pub const SUITE_NAME: &str = "TestSuite";

/// What the scripted host does when it reaches a case.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Pass,
    Fail(&'static str),
    /// The host dies right after the run-start marker.
    Crash,
    /// The host never gets past the run-start marker.
    Hang,
    /// The host exits with the failure code before reporting a result.
    FailExit,
}

/// Builds the log a host would write for `cases` and the way the process ends.
pub fn scripted_outcome(cases: &[TestCaseDescriptor], behaviors: &HashMap<String, Behavior>) -> LaunchOutcome {
    let mut log = String::from("[Editor] starting up\n[Editor] project loaded\n");
    let mut outcome = LaunchOutcome {
        exit_code: Some(0),
        elapsed: Duration::from_secs(10),
        output: "host stdout\n".to_string(),
        ..Default::default()
    };
    let mut any_failed = false;

    for case in cases {
        let script = case.script_arg();
        log.push_str(&format!("Running automated test: {}\n", script));
        log.push_str(&format!("(python_test) - running {}\n", case.name));
        match behaviors.get(&case.name).cloned().unwrap_or(Behavior::Pass) {
            Behavior::Pass => log.push_str(&format!("SUCCESS {}\n", script)),
            Behavior::Fail(reason) => {
                any_failed = true;
                log.push_str(&format!("FAILURE {}\n{}\n  File \"{}\", line 3\n\n", script, reason, script));
            }
            Behavior::Crash => {
                // Killed by a signal.
                outcome.exit_code = None;
                outcome.crash_log = Some(format!("Exception in {}\n  at RenderFrame()", case.name));
                outcome.log = log;
                return outcome;
            }
            Behavior::Hang => {
                outcome.exit_code = None;
                outcome.timed_out = true;
                outcome.log = log;
                return outcome;
            }
            Behavior::FailExit => {
                outcome.exit_code = Some(0xF);
                outcome.log = log;
                return outcome;
            }
        }
    }
    if any_failed {
        outcome.exit_code = Some(0xF);
    }
    outcome.log = log;
    outcome
}

/// One launch the fake saw.
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub id: u64,
    pub cases: Vec<String>,
    pub batched: bool,
    pub args: Vec<String>,
}

/// A launcher that answers from a behavior table instead of starting a process.
pub struct FakeLauncher {
    behaviors: HashMap<String, Behavior>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    launches: Mutex<Vec<LaunchRecord>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            delays: HashMap::new(),
            default_delay: Duration::ZERO,
            launches: Mutex::new(vec![]),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    pub fn with(mut self, case: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(case.to_string(), behavior);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_case_delay(mut self, case: &str, delay: Duration) -> Self {
        self.delays.insert(case.to_string(), delay);
        self
    }

    /// Fires `token` as soon as `count` launches have finished.
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn delay_for(&self, plan: &LaunchPlan) -> Duration {
        plan.cases
            .iter()
            .filter_map(|c| self.delays.get(&c.name))
            .max()
            .copied()
            .unwrap_or(self.default_delay)
    }
}

impl Launcher for FakeLauncher {
    async fn run(&self, plan: &LaunchPlan, cancel: &CancellationToken) -> Result<LaunchOutcome, LaunchError> {
        self.launches.lock().unwrap().push(LaunchRecord {
            id: plan.id,
            cases: plan.case_names(),
            batched: plan.batched,
            args: plan.command.args.clone(),
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delay_for(plan);
        let outcome = tokio::select! {
            _ = tokio::time::sleep(delay) => scripted_outcome(&plan.cases, &self.behaviors),
            _ = cancel.cancelled() => {
                let first = plan.cases.first().map(|c| c.script_arg()).unwrap_or_default();
                LaunchOutcome {
                    exit_code: None,
                    elapsed: delay,
                    log: format!("Running automated test: {}\n", first),
                    cancelled: true,
                    ..Default::default()
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = &self.cancel_after {
            if done >= *count {
                token.cancel();
            }
        }
        Ok(outcome)
    }
}

/// A workspace rooted in a temporary directory, with empty host binaries.
pub struct FakeWorkspace {
    dir: TempDir,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        let dir = tempdir().expect("Failed to create temporary directory");
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        for kind in [ExecutableKind::Editor, ExecutableKind::MaterialEditor] {
            fs::write(bin.join(kind.file_name()), "").unwrap();
        }
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Creates `scripts/<name>.py` and returns its path.
    pub fn script(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("scripts").join(format!("{}.py", name));
        fs::write(&path, "# in-host test\n").unwrap();
        path
    }
}

impl Workspace for FakeWorkspace {
    fn executable_path(&self, kind: ExecutableKind) -> PathBuf {
        self.dir.path().join("bin").join(kind.file_name())
    }

    fn log_path(&self, kind: ExecutableKind, run_id: u64) -> PathBuf {
        self.project_log_dir()
            .join(format!("log_test_{}", run_id))
            .join(kind.log_file_name())
    }

    fn project_log_dir(&self) -> PathBuf {
        self.dir.path().join("log")
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    fn artifact_root(&self) -> PathBuf {
        self.dir.path().join("artifacts")
    }

    fn prepare(&self) -> Result<(), FrameworkError> {
        Ok(())
    }

    fn clean_temp(&self) -> Result<()> {
        Ok(())
    }
}

/// Remembers every kill request instead of killing anything.
#[derive(Default)]
pub struct RecordingKiller {
    pub targets: Mutex<Vec<Target>>,
}

impl ProcessKiller for RecordingKiller {
    fn kill_tree(&self, target: &Target) -> Result<()> {
        self.targets.lock().unwrap().push(target.clone());
        Ok(())
    }
}

/// Collects what the scheduler reports, in order.
#[derive(Default)]
pub struct RecordingReporter {
    pub collected: Mutex<usize>,
    pub results: Mutex<Vec<(String, TestResult)>>,
}

impl RecordingReporter {
    pub fn reported_names(&self) -> Vec<String> {
        self.results.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl Reporter for RecordingReporter {
    fn report_collected(&self, suite: &CollectedSuite) {
        *self.collected.lock().unwrap() += suite.items.len();
    }

    fn report_result(&self, item: &CollectedItem, result: &TestResult) {
        self.results
            .lock()
            .unwrap()
            .push((item.display_name.clone(), result.clone()));
    }
}

/// Everything a scheduler test needs, sharing one temporary workspace.
pub struct Harness {
    pub workspace: Arc<FakeWorkspace>,
    pub artifacts: Arc<DirArtifactManager>,
    pub killer: Arc<RecordingKiller>,
}

impl Harness {
    pub fn new() -> Self {
        let workspace = Arc::new(FakeWorkspace::new());
        let artifacts = Arc::new(DirArtifactManager::new(workspace.artifact_root()));
        Self {
            workspace,
            artifacts,
            killer: Arc::new(RecordingKiller::default()),
        }
    }

    pub fn env(&self) -> RunEnvironment {
        RunEnvironment {
            workspace: self.workspace.clone(),
            artifacts: self.artifacts.clone(),
            killer: self.killer.clone(),
        }
    }

    pub fn case(&self, name: &str, is_batchable: bool, is_parallelizable: bool) -> CaseConfig {
        CaseConfig {
            name: name.to_string(),
            script_path: self.workspace.script(name),
            is_batchable,
            is_parallelizable,
            ..CaseConfig::default()
        }
    }

    pub fn suite(&self, cases: Vec<CaseConfig>) -> SuiteConfig {
        let mut suite = SuiteConfig::new(SUITE_NAME, ExecutableKind::Editor);
        suite.cases = cases;
        suite
    }

    pub fn collect(&self, suite: &SuiteConfig, options: &RunOptions) -> CollectedSuite {
        collector::collect(suite, options).expect("suite should collect")
    }

    /// Collects and runs a suite with the default bisection depth.
    pub async fn run(
        &self,
        suite: &SuiteConfig,
        options: &RunOptions,
        launcher: FakeLauncher,
    ) -> (ResultTable, Scheduler<FakeLauncher>, RecordingReporter) {
        let collected = self.collect(suite, options);
        let scheduler = Scheduler::new(launcher, self.env(), collected.settings.bisect_depth);
        let reporter = RecordingReporter::default();
        let table = scheduler
            .run(&collected, &reporter)
            .await
            .expect("scheduler run should succeed");
        (table, scheduler, reporter)
    }
}

pub fn display_name(case: &str) -> String {
    format!("{}::{}", SUITE_NAME, case)
}
