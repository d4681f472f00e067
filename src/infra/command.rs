//! # Process Launcher Module / 进程启动模块
//!
//! The launcher adapter: runs one launch plan as a host subprocess, enforces
//! its wall-clock budget, captures stdout/stderr and the host log, and
//! collects the crash report a crashed host leaves behind.
//!
//! 启动器适配器：将一个启动计划作为宿主子进程运行，执行其时间预算，
//! 捕获 stdout/stderr 和宿主日志，并收集崩溃宿主留下的崩溃报告。

use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use futures::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::core::config::SuiteSettings;
use crate::core::errors::LaunchError;
use crate::core::execution::Launcher;
use crate::core::models::{LaunchOutcome, LaunchPlan};
use crate::infra::fs::{CRASH_DUMP_NAME, CRASH_LOG_NAME, cycle_crash_report, read_lossy};
use crate::infra::process::{kill_group, terminate_group};

const CRASH_LOG_POLL: Duration = Duration::from_millis(200);

/// Runs launch plans as real host processes.
/// 将启动计划作为真实的宿主进程运行。
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    /// How long a crashed host may take to write `error.log`.
    pub crash_log_grace: Duration,
    /// Time between the graceful terminate and the hard kill.
    pub kill_grace: Duration,
    /// Exit code of an in-host assertion; such exits are not crashes.
    pub test_fail_retcode: i32,
}

impl ProcessLauncher {
    pub fn new(settings: &SuiteSettings) -> Self {
        Self {
            crash_log_grace: settings.crash_log_grace,
            kill_grace: settings.kill_grace,
            test_fail_retcode: settings.test_fail_retcode,
        }
    }
}

enum Stop {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl Launcher for ProcessLauncher {
    async fn run(
        &self,
        plan: &LaunchPlan,
        cancel: &CancellationToken,
    ) -> Result<LaunchOutcome, LaunchError> {
        let program = &plan.command.program;
        if !program.is_file() {
            return Err(LaunchError::BinaryMissing(program.clone()));
        }

        if let Err(e) = std::fs::create_dir_all(&plan.log_dir) {
            tracing::warn!(dir = %plan.log_dir.display(), error = %e, "failed to create log directory");
        }
        if let Err(e) = cycle_crash_report(&plan.log_dir) {
            tracing::warn!(error = %e, "failed to cycle old crash report");
        }
        let _ = std::fs::remove_file(&plan.log_path);

        let mut cmd = Command::new(program);
        cmd.args(&plan.command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let (mut child, reader) = match spawn_and_capture(cmd) {
            Ok(spawned) => spawned,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LaunchError::BinaryMissing(program.clone()));
            }
            Err(e) => {
                tracing::error!(plan = plan.id, error = %e, "failed to spawn host");
                return Ok(LaunchOutcome {
                    elapsed: start.elapsed(),
                    launch_error: Some(e.to_string()),
                    ..Default::default()
                });
            }
        };

        let pid = child.id();

        let stop = tokio::select! {
            status = child.wait() => Stop::Exited(status),
            _ = deadline(plan.timeout) => Stop::TimedOut,
            _ = cancel.cancelled() => Stop::Cancelled,
        };

        let (status, timed_out, cancelled) = match stop {
            Stop::Exited(status) => (status.ok(), false, false),
            Stop::TimedOut => {
                tracing::warn!(plan = plan.id, timeout = ?plan.timeout, "host timed out");
                (self.terminate(&mut child).await, true, false)
            }
            Stop::Cancelled => {
                tracing::info!(plan = plan.id, "terminating host after cancel");
                (self.terminate(&mut child).await, false, true)
            }
        };
        let elapsed = start.elapsed();

        // Children of the host share its process group; none of them may outlive the launch.
        if let Some(pid) = pid {
            kill_group(pid);
        }

        let output = match tokio::time::timeout(self.kill_grace, reader).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "output reader failed");
                String::new()
            }
            Err(_) => {
                tracing::debug!(plan = plan.id, "output pipes still open, giving up on them");
                String::new()
            }
        };

        let exit_code = status.and_then(|s| s.code());
        let mut outcome = LaunchOutcome {
            exit_code,
            elapsed,
            log: read_lossy(&plan.log_path),
            output,
            timed_out,
            cancelled,
            ..Default::default()
        };

        let crashed = !timed_out
            && !cancelled
            && exit_code != Some(0)
            && exit_code != Some(self.test_fail_retcode);
        if crashed {
            self.collect_crash_report(plan, &mut outcome).await;
        }
        Ok(outcome)
    }
}

impl ProcessLauncher {
    /// Graceful terminate, then hard kill after `kill_grace`.
    async fn terminate(&self, child: &mut Child) -> Option<ExitStatus> {
        let Some(pid) = child.id() else {
            return child.wait().await.ok();
        };
        terminate_group(pid);
        match tokio::time::timeout(self.kill_grace, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            _ => {
                kill_group(pid);
                let _ = child.start_kill();
                child.wait().await.ok()
            }
        }
    }

    /// Waits up to `crash_log_grace` for the host's crash dumper.
    async fn collect_crash_report(&self, plan: &LaunchPlan, outcome: &mut LaunchOutcome) {
        let crash_log = plan.log_dir.join(CRASH_LOG_NAME);
        let waited = Instant::now();
        while !crash_log.is_file() && waited.elapsed() < self.crash_log_grace {
            tokio::time::sleep(CRASH_LOG_POLL).await;
        }

        if crash_log.is_file() {
            outcome.crash_log = Some(read_lossy(&crash_log));
            outcome.crash_log_path = Some(crash_log);
        } else {
            tracing::warn!(plan = plan.id, "crash occurred, but no crash log was written");
        }
        let dump = plan.log_dir.join(CRASH_DUMP_NAME);
        if dump.is_file() {
            outcome.crash_dump_path = Some(dump);
        }
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
    }
}

/// Spawns a command with stdout and stderr piped into one reader task.
///
/// # Returns
/// The child and a task yielding the combined output once both pipes close.
///
/// 派生一个命令，并将 stdout 和 stderr 交给同一个读取任务。
/// 返回子进程，以及在两个管道都关闭后产出合并输出的任务。
pub fn spawn_and_capture(mut cmd: Command) -> std::io::Result<(Child, JoinHandle<String>)> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

    let reader = tokio::spawn(async move {
        let out = Box::pin(lossy_lines(BufReader::new(stdout)));
        let err = Box::pin(lossy_lines(BufReader::new(stderr)));
        let mut merged = out.merge(err);
        let mut output = String::new();
        while let Some(line) = merged.next().await {
            output.push_str(&line);
            output.push('\n');
        }
        output
    });

    Ok((child, reader))
}

/// Yields the lines of a pipe, decoding invalid UTF-8 lossily, until EOF.
///
/// The pipe is read to its end so the host never writes into a closed pipe.
///
/// 逐行读取管道直到 EOF，无效的 UTF-8 以替换字符解码。
fn lossy_lines<R>(reader: BufReader<R>) -> impl Stream<Item = String>
where
    R: AsyncRead + Unpin,
{
    futures::stream::unfold(reader, |mut reader| async move {
        let line = read_lossy_line(&mut reader).await?;
        Some((line, reader))
    })
}

async fn read_lossy_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => None,
        Ok(_) => {
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to read host output");
            None
        }
    }
}
