//! # Workspace Module / 工作区模块
//!
//! The workspace tells the runner where the host binaries live, where the
//! host writes its logs and where scratch files go. It is passed to the
//! scheduler explicitly.
//!
//! 工作区告诉运行器宿主二进制文件的位置、宿主日志的写入位置以及临时文件的存放位置。
//! 它被显式地传递给调度器。

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::core::config::SuiteConfig;
use crate::core::errors::FrameworkError;
use crate::core::models::ExecutableKind;
use crate::infra::fs::empty_dir;

/// Paths the runner needs from the project under test.
/// 运行器需要从被测项目获得的路径。
pub trait Workspace: Send + Sync {
    fn executable_path(&self, kind: ExecutableKind) -> PathBuf;
    /// Log file of one launch: `<project_log_dir>/log_test_<run_id>/<log name>`.
    fn log_path(&self, kind: ExecutableKind, run_id: u64) -> PathBuf;
    fn project_log_dir(&self) -> PathBuf;
    fn temp_path(&self) -> PathBuf;
    fn artifact_root(&self) -> PathBuf;
    /// Creates the directories the run writes to.
    fn prepare(&self) -> Result<(), FrameworkError>;
    fn clean_temp(&self) -> Result<()>;
}

/// A workspace on the local file system, built from the suite file.
/// 基于套件文件构建的本地文件系统工作区。
#[derive(Debug)]
pub struct LocalWorkspace {
    project_root: PathBuf,
    bin_dir: PathBuf,
    executable_override: Option<PathBuf>,
    log_dir: PathBuf,
    artifact_dir: PathBuf,
    temp_dir: Option<PathBuf>,
    log_name: Option<String>,
    scratch: OnceCell<TempDir>,
}

impl LocalWorkspace {
    /// Uses the already resolved paths of a loaded suite.
    pub fn from_suite(suite: &SuiteConfig) -> Self {
        let ws = &suite.workspace;
        Self {
            project_root: ws.project_root.clone(),
            bin_dir: ws.bin_dir.clone(),
            executable_override: ws.executable_path.clone(),
            log_dir: ws.log_dir.clone(),
            artifact_dir: ws.artifact_dir.clone(),
            temp_dir: ws.temp_dir.clone(),
            log_name: suite.log_name.clone(),
            scratch: OnceCell::new(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn ensure_dir(path: &Path) -> Result<(), FrameworkError> {
        fs::create_dir_all(path).map_err(|e| FrameworkError::WorkspaceInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl Workspace for LocalWorkspace {
    fn executable_path(&self, kind: ExecutableKind) -> PathBuf {
        self.executable_override
            .clone()
            .unwrap_or_else(|| self.bin_dir.join(kind.file_name()))
    }

    fn log_path(&self, kind: ExecutableKind, run_id: u64) -> PathBuf {
        let name = self
            .log_name
            .clone()
            .unwrap_or_else(|| kind.log_file_name().to_string());
        self.project_log_dir()
            .join(format!("log_test_{}", run_id))
            .join(name)
    }

    fn project_log_dir(&self) -> PathBuf {
        self.log_dir.clone()
    }

    fn temp_path(&self) -> PathBuf {
        if let Some(dir) = &self.temp_dir {
            return dir.clone();
        }
        self.scratch
            .get()
            .map(|dir| dir.path().to_path_buf())
            .unwrap_or_else(std::env::temp_dir)
    }

    fn artifact_root(&self) -> PathBuf {
        self.artifact_dir.clone()
    }

    fn prepare(&self) -> Result<(), FrameworkError> {
        if !self.project_root.is_dir() {
            return Err(FrameworkError::WorkspaceInvalid {
                path: self.project_root.clone(),
                message: "project root is not a directory".to_string(),
            });
        }
        Self::ensure_dir(&self.log_dir)?;
        Self::ensure_dir(&self.artifact_dir)?;
        match &self.temp_dir {
            Some(dir) => Self::ensure_dir(dir)?,
            None => {
                self.scratch
                    .get_or_try_init(|| {
                        tempfile::Builder::new()
                            .prefix("editor_test_runner_")
                            .tempdir()
                    })
                    .map_err(|e| FrameworkError::WorkspaceInvalid {
                        path: std::env::temp_dir(),
                        message: e.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    fn clean_temp(&self) -> Result<()> {
        match &self.temp_dir {
            Some(dir) => empty_dir(dir),
            None => match self.scratch.get() {
                Some(dir) => empty_dir(dir.path()),
                None => Ok(()),
            },
        }
    }
}
