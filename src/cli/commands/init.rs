//! # Suite Initialization Module / 套件初始化模块
//!
//! Interactive wizard that scaffolds an `EditorSuite.toml` with an example
//! case, or writes a default one with `--non-interactive`.
//!
//! 交互式向导，生成带示例用例的 `EditorSuite.toml`；
//! 使用 `--non-interactive` 时直接写出默认文件。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::DEFAULT_SUITE_FILE;
use crate::core::config::{CaseConfig, SuiteConfig};
use crate::core::models::ExecutableKind;
use crate::infra::t;

/// Runs the wizard and writes `EditorSuite.toml` in the current directory.
///
/// 运行向导并在当前目录写出 `EditorSuite.toml`。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(DEFAULT_SUITE_FILE);

    if non_interactive {
        if config_path.exists() {
            println!("{}", t!("init_exists_skipped", locale = language, path = config_path.display()).yellow());
            return Ok(());
        }
        let suite = default_suite("EditorSuite", ExecutableKind::Editor, language);
        return write_config(config_path, &suite, language);
    }

    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init_wizard_welcome", locale = language).cyan().bold());
    println!("{}", t!("init_wizard_description", locale = language));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init_overwrite_prompt", locale = language, path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init_aborted", locale = language));
            return Ok(());
        }
    }

    let name: String = Input::with_theme(&theme)
        .with_prompt(t!("init_suite_name_prompt", locale = language))
        .default("EditorSuite".to_string())
        .interact_text()?;

    let kinds = [ExecutableKind::Editor, ExecutableKind::MaterialEditor];
    let kind_index = Select::with_theme(&theme)
        .with_prompt(t!("init_executable_prompt", locale = language))
        .items(&kinds.iter().map(|k| k.binary_name()).collect::<Vec<_>>())
        .default(0)
        .interact()?;

    let bin_dir: String = Input::with_theme(&theme)
        .with_prompt(t!("init_bin_dir_prompt", locale = language))
        .default("build/bin/profile".to_string())
        .interact_text()?;

    let mut suite = default_suite(&name, kinds[kind_index], language);
    suite.workspace.bin_dir = PathBuf::from(bin_dir);
    write_config(config_path, &suite, language)
}

/// The suite written by `init`: default settings and one example case.
pub fn default_suite(name: &str, kind: ExecutableKind, language: &str) -> SuiteConfig {
    let mut suite = SuiteConfig::new(name, kind);
    suite.language = language.to_string();
    suite.cases = vec![CaseConfig {
        name: "Example_Smoke".to_string(),
        script_path: PathBuf::from("tests/example_smoke.py"),
        ..CaseConfig::default()
    }];
    suite
}

fn write_config(path: &Path, suite: &SuiteConfig, language: &str) -> Result<()> {
    let body = toml::to_string_pretty(suite).context("Failed to serialize suite file")?;
    let content = format!(
        "# Editor test suite / Editor 测试套件\n# {}\n\n{}",
        t!("init_file_hint", locale = language),
        body
    );
    fs::write(path, content)
        .with_context(|| t!("init_write_failed", locale = language, path = path.display()).to_string())?;
    println!("{}", t!("init_success", locale = language, path = path.display()).green());
    println!("{}", t!("init_next_steps", locale = language));
    Ok(())
}
