//! # Core Module / 核心模块
//!
//! This module contains the core functionality of the Editor Test Runner:
//! the suite configuration and data models, the collector that turns a suite
//! into reportable items, the planner and scheduler that decide how cases
//! share host processes, and the pure classifier and slicer that interpret a
//! launcher log.
//!
//! 此模块包含 Editor 测试运行器的核心功能：
//! 套件配置与数据模型、将套件转换为可报告条目的收集器、
//! 决定用例如何共享宿主进程的计划器与调度器，
//! 以及解释启动器日志的纯函数分类器与切分器。

pub mod classifier;
pub mod collector;
pub mod config;
pub mod errors;
pub mod execution;
pub mod models;
pub mod planner;
pub mod scheduler;
pub mod slicer;

// Re-exports
pub use config::SuiteConfig;
pub use models::{Outcome, TestCaseDescriptor, TestResult};
pub use scheduler::Scheduler;
