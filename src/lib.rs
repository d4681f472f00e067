//! # Editor Test Runner Library / Editor 测试运行器库
//!
//! This library provides the core functionality for the Editor Test Runner tool,
//! an orchestrator that runs in-host test scripts against long-lived host
//! executables (Editor, MaterialEditor) in single, batched, parallel and
//! batched-parallel modes.
//!
//! 此库为 Editor 测试运行器提供核心功能，
//! 这是一个在长驻宿主可执行文件（Editor、MaterialEditor）中以单独、批量、
//! 并行以及批量并行模式运行宿主内测试脚本的编排器。
//!
//! ## Modules / 模块
//!
//! - `core` - Suite model, collection, planning, classification and scheduling
//! - `infra` - Launcher adapter, workspace, artifacts and process management
//! - `reporting` - Console, HTML and JSON reporting
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 套件模型、收集、计划、分类与调度
//! - `infra` - 启动器适配器、工作区、产物与进程管理
//! - `reporting` - 控制台、HTML 与 JSON 报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;
pub use core::scheduler;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    set_language(&locale);
}

/// Sets the UI language, falling back to the language part and then to "en".
/// 设置界面语言，依次回退到语言代码和 "en"。
pub fn set_language(locale: &str) {
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale) {
        locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
