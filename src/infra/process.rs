//! # Process Cleanup Module / 进程清理模块
//!
//! Kills host process trees: stray hosts left over from earlier runs, and
//! the process group of a launch that has to be stopped.
//!
//! 终止宿主进程树：之前运行遗留的宿主进程，以及需要停止的启动所在的进程组。

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// What to kill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every process with this executable name, without extension.
    Name(String),
    /// A process and all of its children.
    Pid(u32),
}

/// Kills process trees.
/// 终止进程树。
pub trait ProcessKiller: Send + Sync {
    fn kill_tree(&self, target: &Target) -> Result<()>;
}

/// Uses the platform tools: signals to process groups and `pkill` on unix, `taskkill` on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessKiller;

impl ProcessKiller for SystemProcessKiller {
    fn kill_tree(&self, target: &Target) -> Result<()> {
        match target {
            Target::Pid(pid) => {
                kill_group(*pid);
                Ok(())
            }
            Target::Name(name) => kill_by_name(name),
        }
    }
}

#[cfg(unix)]
fn kill_by_name(name: &str) -> Result<()> {
    // pkill exits with 1 when nothing matched.
    let status = Command::new("pkill")
        .args(["-KILL", "-x", name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("Failed to run pkill")?;
    match status.code() {
        Some(0) => {
            tracing::info!(process = name, "killed stray process");
            Ok(())
        }
        Some(1) => Ok(()),
        _ => anyhow::bail!("pkill exited with {}", status),
    }
}

#[cfg(windows)]
fn kill_by_name(name: &str) -> Result<()> {
    let image = format!("{}.exe", name);
    // taskkill fails when nothing matched; that is not an error here.
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/IM", &image])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("Failed to run taskkill")?;
    Ok(())
}

/// Asks every process in the group led by `pid` to exit.
#[cfg(unix)]
pub fn terminate_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::debug!(pid, error = %e, "SIGTERM to process group failed");
    }
}

/// Kills every process in the group led by `pid`.
#[cfg(unix)]
pub fn kill_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "SIGKILL to process group failed");
    }
}

#[cfg(windows)]
pub fn terminate_group(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/T", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(windows)]
pub fn kill_group(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
