use editor_test_runner::core::config::{self, RunOptions, SuiteConfig, default_bucket_order};
use editor_test_runner::core::errors::FrameworkError;
use editor_test_runner::core::models::{Bucket, ExecutableKind};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

const MINIMAL_SUITE: &str = r#"
name = "AtomSmokeSuite"

[[cases]]
name = "Foo"
script_path = "scripts/foo.py"
"#;

/// A suite file with only the required fields gets every documented default.
///
/// 只包含必填字段的套件文件会获得所有默认值。
#[test]
fn test_parse_suite_applies_defaults() {
    let suite = config::parse_suite(MINIMAL_SUITE).unwrap();

    assert_eq!(suite.name, "AtomSmokeSuite");
    assert_eq!(suite.executable, ExecutableKind::Editor);
    assert_eq!(suite.language, "en");
    assert_eq!(suite.global_extra_args, vec!["-BatchMode", "-autotest_mode"]);
    assert!(suite.use_null_renderer);
    assert_eq!(suite.test_fail_retcode, 0xF);
    assert_eq!(suite.bisect_depth, 1);
    assert_eq!(suite.bucket_order, default_bucket_order());
    assert!(suite.orphan_process_names.contains(&"AssetProcessor".to_string()));

    let case = &suite.cases[0];
    assert_eq!(case.timeout, 180);
    assert!(case.is_batchable);
    assert!(case.is_parallelizable);
    assert!(!case.attach_debugger);
    assert_eq!(case.use_null_renderer, None);
}

#[test]
fn test_parse_suite_reads_material_editor_and_overrides() {
    let content = r#"
name = "MaterialSuite"
executable = "material_editor"
use_null_renderer = false
log_name = "custom.log"
parallel_executables = 3
max_batch_timeout_secs = 600
bucket_order = ["single", "batched"]

[[cases]]
name = "Bar"
script_path = "bar.py"
timeout = 30
is_batchable = false
extra_args = ["-foo"]
use_null_renderer = true
"#;
    let suite = config::parse_suite(content).unwrap();
    assert_eq!(suite.executable, ExecutableKind::MaterialEditor);
    assert_eq!(suite.log_file_name(), "custom.log");
    assert_eq!(suite.parallel_executables, Some(3));
    assert_eq!(suite.max_batch_timeout_secs, Some(600));
    assert_eq!(suite.bucket_order, vec![Bucket::Single, Bucket::Batched]);

    let case = &suite.cases[0];
    assert_eq!(case.timeout, 30);
    assert!(!case.is_batchable);
    assert_eq!(case.extra_args, vec!["-foo"]);
    assert_eq!(case.use_null_renderer, Some(true));
}

#[test]
fn test_log_file_name_follows_executable_kind() {
    let editor = SuiteConfig::new("A", ExecutableKind::Editor);
    let material = SuiteConfig::new("B", ExecutableKind::MaterialEditor);
    assert_eq!(editor.log_file_name(), "editor.log");
    assert_eq!(material.log_file_name(), "materialeditor.log");
}

/// Relative paths are anchored at the suite file, workspace paths at the project root.
///
/// 相对路径以套件文件为基准，工作区路径以项目根目录为基准。
#[test]
fn test_load_suite_resolves_relative_paths() {
    let dir = tempdir().unwrap();
    let content = r#"
name = "Resolved"

[workspace]
project_root = "project"
bin_dir = "bin"
executable_path = "bin/MyEditor"

[[cases]]
name = "Foo"
script_path = "scripts/foo.py"
"#;
    let path = dir.path().join("EditorSuite.toml");
    fs::write(&path, content).unwrap();

    let suite = config::load_suite(&path).unwrap();
    let project = dir.path().join("project");
    assert_eq!(suite.workspace.project_root, project);
    assert_eq!(suite.workspace.bin_dir, project.join("bin"));
    assert_eq!(suite.workspace.log_dir, project.join("user/log"));
    assert_eq!(suite.workspace.artifact_dir, project.join("TestResults"));
    assert_eq!(suite.workspace.executable_path, Some(project.join("bin/MyEditor")));
    assert_eq!(suite.cases[0].script_path, dir.path().join("scripts/foo.py"));
}

#[test]
fn test_load_suite_keeps_absolute_paths() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("abs.py");
    let content = format!(
        "name = \"Abs\"\n\n[[cases]]\nname = \"Foo\"\nscript_path = '{}'\n",
        script.display()
    );
    let path = dir.path().join("suite.toml");
    fs::write(&path, content).unwrap();

    let suite = config::load_suite(&path).unwrap();
    assert_eq!(suite.cases[0].script_path, script);
}

#[test]
fn test_load_suite_reports_invalid_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invalid.toml");
    fs::write(&path, "name = \"Broken\"\n[[cases]\nname = \"x\"\n").unwrap();

    let err = config::load_suite(&path).unwrap_err();
    assert!(matches!(err, FrameworkError::Config { .. }));
    assert!(err.to_string().contains("invalid.toml"));
}

#[test]
fn test_load_suite_reports_missing_file() {
    let err = config::load_suite(&PathBuf::from("definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, FrameworkError::Config { .. }));
}

#[test]
fn test_load_suite_rejects_case_without_script_field() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("incomplete.toml");
    fs::write(&path, "name = \"S\"\n\n[[cases]]\nname = \"NoScript\"\n").unwrap();
    assert!(config::load_suite(&path).is_err());
}

/// Command-line options take precedence over the suite file.
///
/// 命令行选项优先于套件文件。
#[test]
fn test_settings_merge_command_line_options() {
    let mut suite = config::parse_suite(MINIMAL_SUITE).unwrap();
    suite.parallel_executables = Some(4);
    suite.bisect_depth = 2;
    suite.max_batch_timeout_secs = Some(100);

    let options = RunOptions {
        parallel_executables: Some(2),
        extra_args: vec!["-extra".to_string()],
        bisect_depth: Some(3),
        ..RunOptions::default()
    };
    let settings = suite.settings(&options);

    assert_eq!(settings.global_args, vec!["-BatchMode", "-autotest_mode", "-extra"]);
    assert_eq!(settings.parallel_executables, Some(2));
    assert_eq!(settings.bisect_depth, 3);
    assert_eq!(settings.max_batch_timeout, Some(Duration::from_secs(100)));
    assert_eq!(settings.crash_log_grace, Duration::from_secs(20));
    assert_eq!(settings.log_name, "editor.log");

    let defaults = suite.settings(&RunOptions::default());
    assert_eq!(defaults.parallel_executables, Some(4));
    assert_eq!(defaults.bisect_depth, 2);
}

#[test]
fn test_settings_complete_a_partial_bucket_order() {
    let mut suite = config::parse_suite(MINIMAL_SUITE).unwrap();
    suite.bucket_order = vec![Bucket::Single, Bucket::Single, Bucket::Parallel];

    let settings = suite.settings(&RunOptions::default());
    assert_eq!(
        settings.bucket_order,
        vec![Bucket::Single, Bucket::Parallel, Bucket::Batched, Bucket::ParallelBatched]
    );
}

#[test]
fn test_suite_round_trips_through_toml() {
    let suite = config::parse_suite(MINIMAL_SUITE).unwrap();
    let text = toml::to_string_pretty(&suite).unwrap();
    let parsed = config::parse_suite(&text).unwrap();
    assert_eq!(parsed, suite);
}
