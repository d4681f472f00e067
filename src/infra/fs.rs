//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for file system operations: lossy log
//! reading, crash report cycling, artifact name checks and directory copies.
//!
//! 此模块提供文件系统操作的实用功能：
//! 容错读取日志、轮换崩溃报告、校验产物名称以及复制目录。

use anyhow::{Context, Result, bail};
use fs_extra::dir::{CopyOptions, copy};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Crash log the host writes into its project log directory.
pub const CRASH_LOG_NAME: &str = "error.log";
/// Minidump written next to the crash log on Windows.
pub const CRASH_DUMP_NAME: &str = "error.dmp";

/// Reads a file as text, replacing invalid UTF-8. Missing files read as empty.
///
/// 以文本形式读取文件，替换无效的 UTF-8；文件不存在时返回空字符串。
pub fn read_lossy(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Renames a leftover crash log and dump in `log_dir` so a new crash is not
/// confused with an old one.
///
/// # Returns
/// The new paths of the files that were moved.
pub fn cycle_crash_report(log_dir: &Path) -> Result<Vec<PathBuf>> {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let mut moved = vec![];
    for name in [CRASH_LOG_NAME, CRASH_DUMP_NAME] {
        let path = log_dir.join(name);
        if !path.is_file() {
            continue;
        }
        let (stem, ext) = name.split_once('.').unwrap_or((name, ""));
        let target = log_dir.join(format!("{}_{}.{}", stem, stamp, ext));
        fs::rename(&path, &target).with_context(|| {
            format!("Failed to cycle crash report: {}", path.display())
        })?;
        moved.push(target);
    }
    Ok(moved)
}

/// Checks an artifact name: relative, `/`-separated, no `..`.
pub fn artifact_relative_path(dest_name: &str) -> Result<PathBuf> {
    let path = PathBuf::from(dest_name.replace('\\', "/"));
    if dest_name.trim().is_empty() {
        bail!("Artifact name is empty");
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("Artifact name must stay inside the artifact directory: {}", dest_name),
        }
    }
    Ok(path)
}

/// Copies the entire content of a source directory to a destination directory.
///
/// # Arguments
/// * `from` - Source directory path
/// * `to` - Destination directory path
pub fn copy_dir_all(from: &Path, to: &Path) -> Result<()> {
    let mut options = CopyOptions::new();
    options.overwrite = true;
    options.copy_inside = true;
    copy(from, to, &options)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Removes everything inside `dir`, keeping the directory itself.
pub fn empty_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}
