//! # Error Types / 错误类型
//!
//! Framework-level errors abort a suite run. Everything a test script or a
//! host process does wrong is recovered into a `TestResult` instead and never
//! shows up here.
//!
//! 框架级错误会中止整个套件运行。测试脚本或宿主进程的任何错误都会被转换为
//! `TestResult`，不会出现在这里。

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the whole suite run.
/// 中止整个套件运行的错误。
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// Duplicate names, malformed cases, unusable suite.
    #[error("collection error in suite '{suite}': {message}")]
    Collection { suite: String, message: String },

    /// The configured host executable does not exist.
    #[error("host executable not found: {}", path.display())]
    BinaryMissing { path: PathBuf },

    /// A path the workspace must provide is missing or cannot be created.
    #[error("workspace invalid: {message} ({})", path.display())]
    WorkspaceInvalid { path: PathBuf, message: String },

    /// The suite file could not be read or parsed.
    #[error("failed to load suite file {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl FrameworkError {
    pub fn collection(suite: &str, message: impl Into<String>) -> Self {
        FrameworkError::Collection {
            suite: suite.to_string(),
            message: message.into(),
        }
    }
}

/// Errors a launcher can raise instead of producing an outcome.
/// 启动器无法产出结果时返回的错误。
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("host executable not found: {}", .0.display())]
    BinaryMissing(PathBuf),
}

impl From<LaunchError> for FrameworkError {
    fn from(err: LaunchError) -> Self {
        match err {
            LaunchError::BinaryMissing(path) => FrameworkError::BinaryMissing { path },
        }
    }
}

/// Marker error returned by the `run` command when at least one case did not pass.
/// `run` 命令在至少一个用例未通过时返回的标记错误。
#[derive(Debug, Error)]
#[error("{failed} of {total} test(s) did not pass")]
pub struct TestsFailed {
    pub failed: usize,
    pub total: usize,
}
