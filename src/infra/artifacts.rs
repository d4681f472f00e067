//! # Artifact Store Module / 产物存储模块
//!
//! Keeps logs, log slices and crash reports of a run under one directory.
//!
//! 将一次运行的日志、日志切片和崩溃报告保存在同一个目录下。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::infra::fs::{artifact_relative_path, copy_dir_all};

/// Stores artifacts under relative names such as `plan-3/(1)editor.log`.
/// 以相对名称（例如 `plan-3/(1)editor.log`）存储产物。
pub trait ArtifactManager: Send + Sync {
    /// Directory all artifacts of the run live in.
    fn root(&self) -> &Path;
    /// Copies a file or directory into the store.
    fn save(&self, source: &Path, dest_name: &str) -> Result<PathBuf>;
    /// Writes text into the store.
    fn save_text(&self, text: &str, dest_name: &str) -> Result<PathBuf>;
}

/// A timestamped directory under the workspace artifact root.
#[derive(Debug, Clone)]
pub struct DirArtifactManager {
    root: PathBuf,
}

impl DirArtifactManager {
    /// Uses `<base>/<suite>_<timestamp>` as the run directory.
    pub fn for_run(base: &Path, suite_name: &str) -> Self {
        let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
        let safe_name: String = suite_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        Self::new(base.join(format!("{}_{}", safe_name, stamp)))
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn destination(&self, dest_name: &str) -> Result<PathBuf> {
        let dest = self.root.join(artifact_relative_path(dest_name)?);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(dest)
    }
}

impl ArtifactManager for DirArtifactManager {
    fn root(&self) -> &Path {
        &self.root
    }

    fn save(&self, source: &Path, dest_name: &str) -> Result<PathBuf> {
        let dest = self.destination(dest_name)?;
        if source.is_dir() {
            copy_dir_all(source, &dest)?;
        } else {
            fs::copy(source, &dest).with_context(|| {
                format!("Failed to save artifact {} as {}", source.display(), dest.display())
            })?;
        }
        tracing::debug!(artifact = %dest.display(), "saved artifact");
        Ok(dest)
    }

    fn save_text(&self, text: &str, dest_name: &str) -> Result<PathBuf> {
        let dest = self.destination(dest_name)?;
        fs::write(&dest, text)
            .with_context(|| format!("Failed to write artifact {}", dest.display()))?;
        Ok(dest)
    }
}
