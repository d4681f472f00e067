//! End-to-end runs of the process launcher against a shell script standing in
//! for the host executable. The script understands `-logfile` and
//! `--runpythontest`, and each test script's first line tells it what to do.
#![cfg(unix)]

mod common;

use common::{RecordingKiller, RecordingReporter};
use editor_test_runner::core::collector;
use editor_test_runner::core::config::{self, RunOptions, SuiteConfig};
use editor_test_runner::core::errors::FrameworkError;
use editor_test_runner::core::models::{Outcome, UnknownCause};
use editor_test_runner::core::scheduler::{ResultTable, RunEnvironment, Scheduler};
use editor_test_runner::infra::artifacts::{ArtifactManager, DirArtifactManager};
use editor_test_runner::infra::command::ProcessLauncher;
use editor_test_runner::infra::workspace::LocalWorkspace;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::{TempDir, tempdir};
use tokio_util::sync::CancellationToken;

const HOST_SCRIPT: &str = r#"
log=""
tests=""
while [ $# -gt 0 ]; do
  case "$1" in
    -logfile) log="$2"; shift ;;
    --runpythontest) tests="$2"; shift ;;
  esac
  shift
done
mkdir -p "$(dirname "$log")"
echo "host booting" > "$log"
echo "stdout from host"
status=0
IFS=';'
for t in $tests; do
  echo "Running automated test: $t" >> "$log"
  action=$(head -n 1 "$t")
  case "$action" in
    pass) echo "SUCCESS $t" >> "$log" ;;
    fail) printf 'FAILURE %s\nassertion failed in host\n\n' "$t" >> "$log"; status=15 ;;
    hang) sleep 30 ;;
    crash) echo "fatal: access violation" > "$(dirname "$log")/error.log"; kill -9 $$ ;;
    exit15) exit 15 ;;
    binary)
      printf '\377\376 locale bytes\n'
      i=0
      while [ $i -lt 3000 ]; do echo "output line $i"; i=$((i + 1)); done
      echo "SUCCESS $t" >> "$log" ;;
  esac
done
exit $status
"#;

struct Project {
    dir: TempDir,
}

impl Project {
    /// `cases` are (name, action, timeout seconds, batchable).
    fn new(cases: &[(&str, &str, u64, bool)]) -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("host.sh"), HOST_SCRIPT).unwrap();
        fs::create_dir_all(root.join("scripts")).unwrap();

        let mut toml = format!(
            r#"name = "ProcessSuite"
global_extra_args = ['{host}']
crash_log_grace_secs = 1
kill_grace_secs = 1
startup_grace_secs = 0
cancel_deadline_secs = 5
orphan_process_names = []

[workspace]
project_root = "."
executable_path = "/bin/sh"
"#,
            host = root.join("host.sh").display()
        );
        for (name, action, timeout, batchable) in cases {
            let script = root.join("scripts").join(format!("{}.py", name));
            fs::write(&script, format!("{}\n", action)).unwrap();
            toml.push_str(&format!(
                "\n[[cases]]\nname = \"{name}\"\nscript_path = \"scripts/{name}.py\"\ntimeout = {timeout}\nis_batchable = {batchable}\nis_parallelizable = false\n"
            ));
        }
        fs::write(root.join("EditorSuite.toml"), toml).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn suite(&self) -> SuiteConfig {
        config::load_suite(&self.root().join("EditorSuite.toml")).unwrap()
    }

    async fn run_with(&self, suite: &SuiteConfig, cancel: CancellationToken) -> Result<(ResultTable, Arc<DirArtifactManager>), FrameworkError> {
        let collected = collector::collect(suite, &RunOptions::default())?;
        let artifacts = Arc::new(DirArtifactManager::new(self.root().join("artifacts")));
        let env = RunEnvironment {
            workspace: Arc::new(LocalWorkspace::from_suite(suite)),
            artifacts: artifacts.clone(),
            killer: Arc::new(RecordingKiller::default()),
        };
        let scheduler = Scheduler::new(ProcessLauncher::new(&collected.settings), env, collected.settings.bisect_depth)
            .with_cancel_token(cancel);
        let table = scheduler.run(&collected, &RecordingReporter::default()).await?;
        Ok((table, artifacts))
    }

    async fn run(&self) -> (ResultTable, Arc<DirArtifactManager>) {
        self.run_with(&self.suite(), CancellationToken::new()).await.unwrap()
    }
}

/// A batch with one failing script: one host process, one slice per case.
///
/// 包含一个失败脚本的批量：一个宿主进程，每个用例一个切片。
#[tokio::test]
async fn test_batched_run_with_failure() {
    let project = Project::new(&[("A", "pass", 30, true), ("B", "fail", 30, true), ("C", "pass", 30, true)]);

    let (table, artifacts) = project.run().await;

    assert_eq!(table["A"].outcome, Outcome::Pass);
    assert!(matches!(&table["B"].outcome, Outcome::Fail { reason, .. } if reason == "assertion failed in host"));
    assert_eq!(table["C"].outcome, Outcome::Pass);
    assert!(table["A"].output.contains("stdout from host"));

    for name in ["A", "B", "C"] {
        assert!(table[name].log_slice.as_ref().unwrap().is_file());
    }
    assert!(artifacts.root().join("(1)editor.log").is_file());
    assert!(project.root().join("user/log/log_test_1/editor.log").is_file());
}

#[tokio::test]
async fn test_single_pass() {
    let project = Project::new(&[("Solo", "pass", 30, false)]);

    let (table, _) = project.run().await;

    let result = &table["Solo"];
    assert_eq!(result.outcome, Outcome::Pass);
    assert!(result.log_output.contains("host booting"));
    assert_eq!(result.attempts, 1);
}

/// Output that is not valid UTF-8 is kept lossily and does not disturb the host.
///
/// 非 UTF-8 的输出以有损方式保留，且不会干扰宿主。
#[tokio::test]
async fn test_non_utf8_output_does_not_break_capture() {
    let project = Project::new(&[("Noisy", "binary", 30, false)]);

    let (table, _) = project.run().await;

    let result = &table["Noisy"];
    assert_eq!(result.outcome, Outcome::Pass);
    assert!(result.output.contains("\u{FFFD}\u{FFFD} locale bytes"));
    assert!(result.output.contains("output line 2999"));
}

/// A crash is pinned on the crashing script and its crash log is kept.
///
/// 崩溃被归咎于崩溃的脚本，并保留其崩溃日志。
#[tokio::test]
async fn test_crash_is_attributed_by_bisection() {
    let project = Project::new(&[("A", "pass", 30, true), ("B", "crash", 30, true), ("C", "pass", 30, true)]);

    let (table, artifacts) = project.run().await;

    assert_eq!(table["A"].outcome, Outcome::Pass);
    match &table["B"].outcome {
        Outcome::Crash { return_code, stack } => {
            assert_eq!(*return_code, None);
            assert!(stack.as_deref().unwrap_or("").contains("access violation"));
        }
        other => panic!("expected a crash, got {:?}", other),
    }
    assert_eq!(table["C"].outcome, Outcome::Pass);
    assert_eq!(table["C"].attempts, 2);
    assert!(artifacts.root().join("plan-1").join("error.log").is_file());
}

/// A hanging script is stopped once its budget runs out.
///
/// 挂起的脚本在预算耗尽后被停止。
#[tokio::test]
async fn test_hanging_script_times_out() {
    let project = Project::new(&[("Slow", "hang", 1, false)]);

    let started = Instant::now();
    let (table, _) = project.run().await;

    assert_eq!(
        table["Slow"].outcome,
        Outcome::Timeout {
            after: Duration::from_secs(1)
        }
    );
    assert!(table["Slow"].duration >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test]
async fn test_failure_exit_code_before_result() {
    let project = Project::new(&[("Abort", "exit15", 30, false)]);

    let (table, _) = project.run().await;

    assert_eq!(
        table["Abort"].outcome,
        Outcome::Fail {
            reason: "test exited with failure code 0xf before reporting a result".to_string(),
            stack: None,
        }
    );
}

#[tokio::test]
async fn test_cancel_stops_a_running_host() {
    let project = Project::new(&[("Slow", "hang", 60, false)]);
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let (table, _) = project.run_with(&project.suite(), token).await.unwrap();

    assert_eq!(
        table["Slow"].outcome,
        Outcome::Unknown {
            cause: UnknownCause::Cancelled
        }
    );
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_missing_executable_is_fatal() {
    let project = Project::new(&[("A", "pass", 30, false)]);
    let mut suite = project.suite();
    suite.workspace.executable_path = Some(project.root().join("no/such/Editor"));

    let err = project
        .run_with(&suite, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FrameworkError::BinaryMissing { .. }));
}

#[tokio::test]
async fn test_invalid_project_root_is_fatal() {
    let project = Project::new(&[("A", "pass", 30, false)]);
    let mut suite = project.suite();
    suite.workspace.project_root = project.root().join("missing-root");

    let err = project
        .run_with(&suite, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FrameworkError::WorkspaceInvalid { .. }));
}
