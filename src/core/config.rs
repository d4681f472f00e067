//! # Suite Configuration Module / 套件配置模块
//!
//! A suite is declared in a TOML file (by default `EditorSuite.toml`). The
//! file names the host executable, the suite-wide flags and every test case
//! with its script, timeout and batching/parallel capabilities.
//!
//! 套件在 TOML 文件中声明（默认 `EditorSuite.toml`）。该文件指定宿主可执行文件、
//! 套件级参数以及每个测试用例的脚本、超时和批量/并行能力。
//!
//! ```toml
//! name = "AtomSmokeSuite"
//! executable = "editor"
//!
//! [workspace]
//! project_root = "."
//!
//! [[cases]]
//! name = "Foo"
//! script_path = "scripts/foo.py"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::errors::FrameworkError;
use crate::core::models::{Bucket, ExecutableKind};

/// A single test case as written in the suite file.
/// 套件文件中声明的单个测试用例。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CaseConfig {
    /// Unique name of the case inside the suite.
    /// 用例在套件内的唯一名称。
    pub name: String,
    /// Path to the in-host script. Relative paths resolve against the suite file.
    /// 宿主内脚本路径。相对路径基于套件文件所在目录解析。
    pub script_path: PathBuf,
    /// Wall-clock budget in seconds when the case runs on its own.
    /// 单独运行时的墙钟时间预算（秒）。
    #[serde(default = "default_case_timeout")]
    pub timeout: u64,
    /// Host flags appended for this case.
    /// 为此用例追加的宿主参数。
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// May share a host process with other batchable cases.
    /// 是否可以与其他可批量用例共享宿主进程。
    #[serde(default = "default_true")]
    pub is_batchable: bool,
    /// Its host process may run concurrently with other host processes.
    /// 其宿主进程是否可以与其他宿主进程并发运行。
    #[serde(default = "default_true")]
    pub is_parallelizable: bool,
    #[serde(default)]
    pub attach_debugger: bool,
    #[serde(default)]
    pub wait_for_debugger: bool,
    /// Overrides the suite-level `use_null_renderer` for this case.
    /// 覆盖套件级的 `use_null_renderer` 设置。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_null_renderer: Option<bool>,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            script_path: PathBuf::new(),
            timeout: default_case_timeout(),
            extra_args: vec![],
            is_batchable: true,
            is_parallelizable: true,
            attach_debugger: false,
            wait_for_debugger: false,
            use_null_renderer: None,
        }
    }
}

/// Paths the local workspace derives everything else from.
/// 本地工作区用来推导其他所有路径的基础路径。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WorkspaceConfig {
    /// Root of the project under test.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// Directory holding the host executables, relative to the project root.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
    /// Explicit host executable; takes precedence over `bin_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
    /// Project log directory, relative to the project root.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Where artifacts (logs, slices, crash dumps) are stored.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Scratch directory; a fresh temporary directory is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            bin_dir: default_bin_dir(),
            executable_path: None,
            log_dir: default_log_dir(),
            artifact_dir: default_artifact_dir(),
            temp_dir: None,
        }
    }
}

/// Represents an entire suite, loaded from a TOML file.
/// It contains suite-wide settings and the list of all test cases.
///
/// 代表从 TOML 文件加载的整个套件。
/// 它包含套件级设置和所有测试用例的列表。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SuiteConfig {
    /// Suite name, used as the `<Suite>` part of every display name.
    /// 套件名称，作为每个显示名称中的 `<Suite>` 部分。
    pub name: String,

    /// Which host executable the suite drives.
    /// 套件驱动的宿主可执行文件。
    #[serde(default)]
    pub executable: ExecutableKind,

    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,

    /// Flags passed to every host process of the suite.
    /// 传递给套件中每个宿主进程的参数。
    #[serde(default = "default_global_extra_args")]
    pub global_extra_args: Vec<String>,

    /// Adds `-rhi=null` unless a case overrides it.
    #[serde(default = "default_true")]
    pub use_null_renderer: bool,

    /// Overrides the log file name derived from the executable kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_name: Option<String>,

    /// Seconds to wait for a crash dumper to finish writing.
    /// 等待崩溃转储写入完成的秒数。
    #[serde(default = "default_crash_log_grace")]
    pub crash_log_grace_secs: u64,

    /// A non-zero exit within this many seconds, before any test started,
    /// counts as a failed launch.
    #[serde(default = "default_startup_grace")]
    pub startup_grace_secs: u64,

    /// Seconds between the graceful terminate and the hard kill.
    #[serde(default = "default_kill_grace")]
    pub kill_grace_secs: u64,

    /// Seconds in-flight launches get to wind down after a cancel.
    #[serde(default = "default_cancel_deadline")]
    pub cancel_deadline_secs: u64,

    /// Exit code the host uses to signal an in-host assertion failure.
    /// 宿主用于表示宿主内断言失败的退出码。
    #[serde(default = "default_test_fail_retcode")]
    pub test_fail_retcode: i32,

    /// Upper bound for a batched launch, regardless of the summed case timeouts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_timeout_secs: Option<u64>,

    /// Number of host processes allowed at once; defaults to half the cores.
    /// 同时允许的宿主进程数；默认为 CPU 核心数的一半。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_executables: Option<usize>,

    /// How many bisection rounds an ambiguous case may go through.
    /// 一个结果不确定的用例最多可以经历的二分轮数。
    #[serde(default = "default_bisect_depth")]
    pub bisect_depth: u32,

    /// Order in which the buckets are executed.
    #[serde(default = "default_bucket_order")]
    pub bucket_order: Vec<Bucket>,

    /// When set, debugger cases keep their batch/parallel flags and only lose the timeout.
    #[serde(default)]
    pub debugger_keeps_grouping: bool,

    /// Executable names killed before and after the suite.
    /// 套件运行前后要清理的可执行文件名称。
    #[serde(default = "default_orphan_process_names")]
    pub orphan_process_names: Vec<String>,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// A vector containing all the test cases of the suite.
    /// 包含套件所有测试用例的向量。
    #[serde(default)]
    pub cases: Vec<CaseConfig>,
}

impl SuiteConfig {
    /// Builds a suite with default settings and no cases.
    pub fn new(name: impl Into<String>, executable: ExecutableKind) -> Self {
        Self {
            name: name.into(),
            executable,
            language: default_language(),
            global_extra_args: default_global_extra_args(),
            use_null_renderer: true,
            log_name: None,
            crash_log_grace_secs: default_crash_log_grace(),
            startup_grace_secs: default_startup_grace(),
            kill_grace_secs: default_kill_grace(),
            cancel_deadline_secs: default_cancel_deadline(),
            test_fail_retcode: default_test_fail_retcode(),
            max_batch_timeout_secs: None,
            parallel_executables: None,
            bisect_depth: default_bisect_depth(),
            bucket_order: default_bucket_order(),
            debugger_keeps_grouping: false,
            orphan_process_names: default_orphan_process_names(),
            workspace: WorkspaceConfig::default(),
            cases: vec![],
        }
    }

    /// The host log file name, e.g. `editor.log`.
    pub fn log_file_name(&self) -> String {
        self.log_name
            .clone()
            .unwrap_or_else(|| self.executable.log_file_name().to_string())
    }
}

/// Options coming from the command line that reshape a suite run.
/// 来自命令行、用于调整套件运行方式的选项。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// `--no-test-batch`: every case becomes non-batchable.
    pub no_batch: bool,
    /// `--no-test-parallel`: every case becomes non-parallelizable.
    pub no_parallel: bool,
    /// `--parallel-executables=N`, takes precedence over the suite file.
    pub parallel_executables: Option<usize>,
    /// Keeps only cases whose display name contains this substring.
    pub filter: Option<String>,
    /// Extra host flags appended to the suite-wide flags.
    pub extra_args: Vec<String>,
    /// Overrides the suite's bisection depth.
    pub bisect_depth: Option<u32>,
}

/// Loads a suite file and resolves every relative path against its directory.
///
/// 加载套件文件，并将所有相对路径基于该文件所在目录解析。
///
/// # Errors
/// `FrameworkError::Config` when the file cannot be read or parsed.
pub fn load_suite(path: &Path) -> Result<SuiteConfig, FrameworkError> {
    let content = fs::read_to_string(path).map_err(|e| FrameworkError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut suite = parse_suite(&content).map_err(|e| FrameworkError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let base = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    resolve_paths(&mut suite, &base).map_err(|message| FrameworkError::Config {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(suite)
}

/// Parses suite TOML without touching the filesystem.
pub fn parse_suite(content: &str) -> Result<SuiteConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Expands `~` and environment variables, then anchors relative paths at `base`.
/// 展开 `~` 与环境变量，再将相对路径锚定到 `base`。
pub fn resolve_path(base: &Path, raw: &Path) -> Result<PathBuf, String> {
    let raw_str = raw.to_string_lossy();
    let expanded = shellexpand::full(&raw_str).map_err(|e| e.to_string())?;
    let expanded = PathBuf::from(expanded.as_ref());
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

fn resolve_paths(suite: &mut SuiteConfig, base: &Path) -> Result<(), String> {
    let ws = &mut suite.workspace;
    ws.project_root = resolve_path(base, &ws.project_root)?;
    let root = ws.project_root.clone();
    ws.bin_dir = resolve_path(&root, &ws.bin_dir)?;
    ws.log_dir = resolve_path(&root, &ws.log_dir)?;
    ws.artifact_dir = resolve_path(&root, &ws.artifact_dir)?;
    if let Some(exe) = &ws.executable_path {
        ws.executable_path = Some(resolve_path(&root, exe)?);
    }
    if let Some(tmp) = &ws.temp_dir {
        ws.temp_dir = Some(resolve_path(&root, tmp)?);
    }
    for case in &mut suite.cases {
        if !case.script_path.as_os_str().is_empty() {
            case.script_path = resolve_path(base, &case.script_path)?;
        }
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_case_timeout() -> u64 {
    180
}

fn default_language() -> String {
    "en".to_string()
}

fn default_global_extra_args() -> Vec<String> {
    vec!["-BatchMode".to_string(), "-autotest_mode".to_string()]
}

fn default_crash_log_grace() -> u64 {
    20
}

fn default_startup_grace() -> u64 {
    5
}

fn default_kill_grace() -> u64 {
    5
}

fn default_cancel_deadline() -> u64 {
    30
}

fn default_test_fail_retcode() -> i32 {
    0xF
}

fn default_bisect_depth() -> u32 {
    1
}

pub fn default_bucket_order() -> Vec<Bucket> {
    vec![
        Bucket::Batched,
        Bucket::ParallelBatched,
        Bucket::Parallel,
        Bucket::Single,
    ]
}

fn default_orphan_process_names() -> Vec<String> {
    ["AssetProcessor", "AssetBuilder", "Editor", "MaterialEditor"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("build/bin/profile")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("user/log")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("TestResults")
}

/// Suite-wide launch settings, with command-line overrides already applied.
/// 套件级启动设置，已合并命令行覆盖项。
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteSettings {
    pub kind: ExecutableKind,
    /// `global_extra_args` followed by `--extra-args`.
    pub global_args: Vec<String>,
    pub use_null_renderer: bool,
    pub log_name: String,
    pub crash_log_grace: Duration,
    pub startup_grace: Duration,
    pub kill_grace: Duration,
    pub cancel_deadline: Duration,
    pub test_fail_retcode: i32,
    pub max_batch_timeout: Option<Duration>,
    pub parallel_executables: Option<usize>,
    pub bisect_depth: u32,
    pub bucket_order: Vec<Bucket>,
    pub orphan_process_names: Vec<String>,
}

impl SuiteConfig {
    /// Merges the suite file settings with the command-line options.
    /// 合并套件文件设置与命令行选项。
    pub fn settings(&self, options: &RunOptions) -> SuiteSettings {
        let mut global_args = self.global_extra_args.clone();
        global_args.extend(options.extra_args.iter().cloned());

        let mut bucket_order = Vec::with_capacity(4);
        for bucket in self.bucket_order.iter().chain(default_bucket_order().iter()) {
            if !bucket_order.contains(bucket) {
                bucket_order.push(*bucket);
            }
        }

        SuiteSettings {
            kind: self.executable,
            global_args,
            use_null_renderer: self.use_null_renderer,
            log_name: self.log_file_name(),
            crash_log_grace: Duration::from_secs(self.crash_log_grace_secs),
            startup_grace: Duration::from_secs(self.startup_grace_secs),
            kill_grace: Duration::from_secs(self.kill_grace_secs),
            cancel_deadline: Duration::from_secs(self.cancel_deadline_secs),
            test_fail_retcode: self.test_fail_retcode,
            max_batch_timeout: self.max_batch_timeout_secs.map(Duration::from_secs),
            parallel_executables: options.parallel_executables.or(self.parallel_executables),
            bisect_depth: options.bisect_depth.unwrap_or(self.bisect_depth),
            bucket_order,
            orphan_process_names: self.orphan_process_names.clone(),
        }
    }
}
