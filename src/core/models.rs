//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the runner:
//! test case descriptors, launch plans and outcomes, and the per-case result
//! model with its user-visible rendering.
//!
//! 此模块定义了整个运行器中使用的核心数据结构：
//! 测试用例描述符、启动计划与启动结果，以及每个用例的结果模型及其用户可见的呈现。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::t;

/// Reason shown for an `Unknown` result once recovery gave up on it.
pub const INDETERMINATE_REASON: &str = "indeterminate; co-batched test crashed";
/// Reason shown for a case that was stopped by a cancellation.
pub const CANCELLED_REASON: &str = "cancelled";
/// Reason shown for a case whose script does not exist.
pub const SCRIPT_NOT_FOUND_REASON: &str = "script path not found";

/// The host executables a suite can drive.
/// 套件可以驱动的宿主可执行文件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutableKind {
    #[default]
    Editor,
    MaterialEditor,
}

impl ExecutableKind {
    /// Base name of the binary, without platform suffix.
    pub fn binary_name(&self) -> &'static str {
        match self {
            ExecutableKind::Editor => "Editor",
            ExecutableKind::MaterialEditor => "MaterialEditor",
        }
    }

    /// File name of the binary on the current platform.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.binary_name(), std::env::consts::EXE_SUFFIX)
    }

    /// Name of the log file the host writes.
    pub fn log_file_name(&self) -> &'static str {
        match self {
            ExecutableKind::Editor => "editor.log",
            ExecutableKind::MaterialEditor => "materialeditor.log",
        }
    }
}

impl fmt::Display for ExecutableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Scheduling bucket, keyed by (batchable, parallelizable).
/// 调度分组，由（可批量，可并行）决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Not batchable, not parallelizable: one process per case, one at a time.
    Single,
    /// Not batchable, parallelizable: one process per case, up to K at once.
    Parallel,
    /// Batchable, not parallelizable: one process for the whole bucket.
    Batched,
    /// Batchable and parallelizable: K processes, each with a sub-batch.
    ParallelBatched,
}

impl Bucket {
    pub fn from_flags(is_batchable: bool, is_parallelizable: bool) -> Self {
        match (is_batchable, is_parallelizable) {
            (false, false) => Bucket::Single,
            (false, true) => Bucket::Parallel,
            (true, false) => Bucket::Batched,
            (true, true) => Bucket::ParallelBatched,
        }
    }

    pub fn is_batched(&self) -> bool {
        matches!(self, Bucket::Batched | Bucket::ParallelBatched)
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Bucket::Parallel | Bucket::ParallelBatched)
    }

    /// Name of the hidden runner item that executes this bucket.
    pub fn runner_name(&self) -> &'static str {
        match self {
            Bucket::Single => "run_single_tests",
            Bucket::Parallel => "run_parallel_tests",
            Bucket::Batched => "run_batched_tests",
            Bucket::ParallelBatched => "run_parallel_batched_tests",
        }
    }
}

/// Immutable description of one test case, produced at collection time.
/// 测试用例的不可变描述，在收集阶段生成。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCaseDescriptor {
    /// Unique name within the suite.
    pub name: String,
    /// Absolute path to the script the host runs.
    pub script_path: PathBuf,
    /// Per-case budget; `None` means wait indefinitely (debugger sessions).
    pub timeout: Option<Duration>,
    pub extra_args: Vec<String>,
    pub is_batchable: bool,
    pub is_parallelizable: bool,
    pub attach_debugger: bool,
    pub wait_for_debugger: bool,
    pub use_null_renderer: Option<bool>,
}

impl TestCaseDescriptor {
    /// A batchable, parallelizable case with the default 180 s timeout.
    pub fn new(name: impl Into<String>, script_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            script_path: script_path.into(),
            timeout: Some(Duration::from_secs(180)),
            extra_args: vec![],
            is_batchable: true,
            is_parallelizable: true,
            attach_debugger: false,
            wait_for_debugger: false,
            use_null_renderer: None,
        }
    }

    pub fn bucket(&self) -> Bucket {
        Bucket::from_flags(self.is_batchable, self.is_parallelizable)
    }

    pub fn wants_debugger(&self) -> bool {
        self.attach_debugger || self.wait_for_debugger
    }

    /// The script path as handed to the host: forward slashes only.
    pub fn script_arg(&self) -> String {
        normalize_script_path(&self.script_path)
    }

    /// Scheduling cost, used to balance sub-batches.
    pub fn cost(&self) -> Duration {
        self.timeout.unwrap_or(Duration::from_secs(180))
    }
}

/// Renders a script path the way it appears on the host command line and in marker lines.
pub fn normalize_script_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// A resolved program invocation.
/// 已解析的程序调用。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Shell-quoted rendering, for logs and reports.
    pub fn display(&self) -> String {
        let program = self.program.to_string_lossy().to_string();
        let words: Vec<&str> = std::iter::once(program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect();
        shlex::try_join(words.iter().copied()).unwrap_or_else(|_| words.join(" "))
    }
}

/// One scheduled invocation of the host executable.
/// 宿主可执行文件的一次计划调用。
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    /// Unique per suite run; also names the per-plan log directory.
    pub id: u64,
    pub kind: ExecutableKind,
    /// Cases in the order the host executes them.
    pub cases: Vec<TestCaseDescriptor>,
    pub command: CommandLine,
    pub log_dir: PathBuf,
    pub log_path: PathBuf,
    /// Wall-clock budget for the whole process; `None` is unbounded.
    pub timeout: Option<Duration>,
    /// Whether the plan came from a batched bucket.
    pub batched: bool,
}

impl LaunchPlan {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn case_names(&self) -> Vec<String> {
        self.cases.iter().map(|c| c.name.clone()).collect()
    }

    pub fn log_file_name(&self) -> String {
        self.log_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.kind.log_file_name().to_string())
    }
}

/// What a launcher observed while running a plan. Carries no interpretation.
/// 启动器运行计划时观察到的内容，不包含任何解释。
#[derive(Debug, Clone, Default)]
pub struct LaunchOutcome {
    /// `None` when the process was killed by a signal or never exited.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    /// The host log file, decoded lossily.
    pub log: String,
    /// Combined stdout and stderr of the host.
    pub output: String,
    pub timed_out: bool,
    pub cancelled: bool,
    /// Set when the process could not be started at all.
    pub launch_error: Option<String>,
    pub crash_log: Option<String>,
    pub crash_log_path: Option<PathBuf>,
    pub crash_dump_path: Option<PathBuf>,
}

impl LaunchOutcome {
    /// An outcome for a process that exited by itself with `code`.
    pub fn exited(code: i32, log: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            exit_code: Some(code),
            elapsed,
            log: log.into(),
            ..Default::default()
        }
    }
}

/// Why a result could not be determined.
/// 结果无法确定的原因。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum UnknownCause {
    /// The host never printed a marker for this case.
    NoResultMarker,
    /// A sibling in the same process crashed before this case finished.
    CoBatchedCrash { offender: String },
    /// A sibling in the same process hung before this case finished.
    CoBatchedTimeout { offender: String },
    /// The run was cancelled before this case finished.
    Cancelled,
}

impl fmt::Display for UnknownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownCause::NoResultMarker => {
                f.write_str("found no test run information in the executable log")
            }
            UnknownCause::CoBatchedCrash { offender } => write!(
                f,
                "test '{}' crashed before this test could be executed",
                offender
            ),
            UnknownCause::CoBatchedTimeout { offender } => write!(
                f,
                "test '{}' timed out before this test could be executed",
                offender
            ),
            UnknownCause::Cancelled => f.write_str(CANCELLED_REASON),
        }
    }
}

/// Classified outcome of one test case.
/// 单个测试用例的分类结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail {
        reason: String,
        stack: Option<String>,
    },
    Timeout {
        #[serde(with = "duration_secs")]
        after: Duration,
    },
    Crash {
        return_code: Option<i32>,
        stack: Option<String>,
    },
    Unknown {
        cause: UnknownCause,
    },
}

impl Outcome {
    /// Crash, Timeout and Unknown can be resolved further by bisection.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            Outcome::Crash { .. } | Outcome::Timeout { .. } | Outcome::Unknown { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail { .. } => "fail",
            Outcome::Timeout { .. } => "timeout",
            Outcome::Crash { .. } => "crash",
            Outcome::Unknown { .. } => "unknown",
        }
    }
}

/// Represents the final result of a single test case.
/// 表示单个测试用例的最终结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub outcome: Outcome,
    /// Host stdout/stderr of the launch that produced this result.
    pub output: String,
    /// The part of the launcher log attributed to this case.
    pub log_output: String,
    /// Artifact path of the log slice, for batched runs.
    pub log_slice: Option<PathBuf>,
    /// Wall-clock of the launch that produced this result.
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Number of launches this case took part in.
    pub attempts: u32,
}

impl TestResult {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            output: String::new(),
            log_output: String::new(),
            log_slice: None,
            duration: Duration::ZERO,
            attempts: 0,
        }
    }

    pub fn pass(name: impl Into<String>) -> Self {
        Self::new(name, Outcome::Pass)
    }

    pub fn fail(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            name,
            Outcome::Fail {
                reason: reason.into(),
                stack: None,
            },
        )
    }

    pub fn unknown(name: impl Into<String>, cause: UnknownCause) -> Self {
        Self::new(name, Outcome::Unknown { cause })
    }

    pub fn is_pass(&self) -> bool {
        matches!(self.outcome, Outcome::Pass)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_pass()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.outcome.is_ambiguous()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.outcome, Outcome::Timeout { .. })
    }

    /// The failure message a test framework shows for this result, or `None` for a pass.
    /// Timeout and Crash carry a typed marker; Unknown collapses to a fixed reason.
    ///
    /// 测试框架为此结果显示的失败信息；通过时为 `None`。
    pub fn failure_message(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Pass => None,
            Outcome::Fail { reason, .. } => Some(reason.clone()),
            Outcome::Timeout { after } => Some(format!(
                "[TIMEOUT] test did not complete within {} seconds",
                after.as_secs()
            )),
            Outcome::Crash { return_code, .. } => Some(match return_code {
                Some(code) => format!("[CRASH] host exited with return code {:#x}", code),
                None => "[CRASH] host was terminated by a signal".to_string(),
            }),
            Outcome::Unknown {
                cause: UnknownCause::Cancelled,
            } => Some(CANCELLED_REASON.to_string()),
            Outcome::Unknown { .. } => Some(INDETERMINATE_REASON.to_string()),
        }
    }

    /// Gets the status of the test result as a localized string for display.
    /// 以本地化字符串形式获取测试结果的状态以供显示。
    pub fn get_status_str(&self, locale: &str) -> String {
        match &self.outcome {
            Outcome::Pass => t!("report.status_passed", locale = locale).to_string(),
            Outcome::Fail { .. } => t!("report.status_failed", locale = locale).to_string(),
            Outcome::Timeout { .. } => t!("report.status_timeout", locale = locale).to_string(),
            Outcome::Crash { .. } => t!("report.status_crashed", locale = locale).to_string(),
            Outcome::Unknown { .. } => t!("report.status_unknown", locale = locale).to_string(),
        }
    }

    /// Gets the appropriate CSS class for the test status.
    pub fn get_status_class(&self) -> &'static str {
        match &self.outcome {
            Outcome::Pass => "status-Passed",
            Outcome::Fail { .. } => "status-Failed",
            Outcome::Timeout { .. } => "status-Timeout",
            Outcome::Crash { .. } => "status-Crashed",
            Outcome::Unknown { .. } => "status-Unknown",
        }
    }

    fn output_str(&self) -> &str {
        if self.output.trim().is_empty() {
            "-- No output --"
        } else {
            &self.output
        }
    }

    fn log_str(&self) -> &str {
        if self.log_output.trim().is_empty() {
            "-- No log found --"
        } else {
            &self.log_output
        }
    }
}

const RULE: &str = "----------------------------------------------------";

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Pass => {
                writeln!(f, "Test Passed")?;
                writeln!(f, "------------\n|  Output  |\n------------")?;
                writeln!(f, "{}", self.output_str())
            }
            Outcome::Fail { reason, stack } => {
                writeln!(f, "Test FAILED: {}", reason)?;
                if let Some(stack) = stack {
                    writeln!(f, "---------------\n|  Stacktrace |\n---------------")?;
                    writeln!(f, "{}", stack)?;
                }
                writeln!(f, "------------\n|  Output  |\n------------")?;
                writeln!(f, "{}", self.output_str())?;
                writeln!(f, "{}\n| Application log  |\n{}", RULE, RULE)?;
                writeln!(f, "{}", self.log_str())
            }
            Outcome::Crash { return_code, stack } => {
                match return_code {
                    Some(code) => writeln!(f, "Test CRASHED, return code {:#x}", code)?,
                    None => writeln!(f, "Test CRASHED, terminated by signal")?,
                }
                writeln!(f, "---------------\n|  Stacktrace |\n---------------")?;
                writeln!(
                    f,
                    "{}",
                    stack.as_deref().unwrap_or("-- No stacktrace data found --")
                )?;
                writeln!(f, "------------\n|  Output  |\n------------")?;
                writeln!(f, "{}", self.output_str())?;
                writeln!(f, "{}\n| Application log  |\n{}", RULE, RULE)?;
                writeln!(f, "{}", self.log_str())
            }
            Outcome::Timeout { after } => {
                writeln!(
                    f,
                    "Test ABORTED after not completing within {} seconds",
                    after.as_secs()
                )?;
                writeln!(f, "------------\n|  Output  |\n------------")?;
                writeln!(f, "{}", self.output_str())?;
                writeln!(f, "{}\n| Application log  |\n{}", RULE, RULE)?;
                writeln!(f, "{}", self.log_str())
            }
            Outcome::Unknown { cause } => {
                writeln!(
                    f,
                    "Indeterminate test result interpreted as failure, possible cause: {}",
                    cause
                )?;
                writeln!(f, "------------\n|  Output  |\n------------")?;
                writeln!(f, "{}", self.output_str())?;
                writeln!(f, "{}\n| Application log  |\n{}", RULE, RULE)?;
                writeln!(f, "{}", self.log_str())
            }
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
