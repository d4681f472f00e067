//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the Editor Test Runner:
//! the process launcher, the workspace and artifact store, process cleanup,
//! file system helpers and i18n support.
//!
//! 此模块为 Editor 测试运行器提供基础设施服务：
//! 进程启动器、工作区与产物存储、进程清理、文件系统工具和国际化支持。

pub mod artifacts;
pub mod command;
pub mod fs;
pub mod process;
pub mod workspace;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
