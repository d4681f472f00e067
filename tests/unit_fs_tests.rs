//! # File System Helpers Unit Tests / 文件系统工具单元测试
//!
//! Tests for log reading, crash report cycling, artifact name checks and
//! directory copies in `infra::fs`.
//!
//! `infra::fs` 中日志读取、崩溃报告轮换、产物名称校验与目录复制的测试。

use editor_test_runner::infra::fs::{
    CRASH_DUMP_NAME, CRASH_LOG_NAME, artifact_relative_path, copy_dir_all, cycle_crash_report,
    empty_dir, read_lossy,
};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_read_lossy_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    assert_eq!(read_lossy(&dir.path().join("absent.log")), "");
}

#[test]
fn test_read_lossy_replaces_invalid_utf8() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("editor.log");
    fs::write(&path, b"SUCCESS a.py\n\xff\xfe tail\n").unwrap();

    let text = read_lossy(&path);
    assert!(text.starts_with("SUCCESS a.py\n"));
    assert!(text.contains('\u{FFFD}'));
    assert!(text.ends_with(" tail\n"));
}

/// Leftover crash reports are renamed out of the way; the log itself stays.
///
/// 遗留的崩溃报告被重命名移开；日志本身保留。
#[test]
fn test_cycle_crash_report_moves_old_reports() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(CRASH_LOG_NAME), "old crash").unwrap();
    fs::write(dir.path().join(CRASH_DUMP_NAME), "old dump").unwrap();
    fs::write(dir.path().join("editor.log"), "log").unwrap();

    let moved = cycle_crash_report(dir.path()).unwrap();

    assert_eq!(moved.len(), 2);
    assert!(!dir.path().join(CRASH_LOG_NAME).exists());
    assert!(!dir.path().join(CRASH_DUMP_NAME).exists());
    assert!(dir.path().join("editor.log").is_file());
    for path in &moved {
        assert!(path.is_file());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("error_"), "unexpected name {}", name);
    }
    assert_eq!(fs::read_to_string(&moved[0]).unwrap(), "old crash");
}

#[test]
fn test_cycle_crash_report_without_reports_is_a_no_op() {
    let dir = tempdir().unwrap();
    assert!(cycle_crash_report(dir.path()).unwrap().is_empty());
}

#[test]
fn test_artifact_relative_path_accepts_nested_names() {
    assert_eq!(
        artifact_relative_path("plan-3/(1)editor.log").unwrap(),
        PathBuf::from("plan-3/(1)editor.log")
    );
    assert_eq!(
        artifact_relative_path("plan-3\\(prologue)editor.log").unwrap(),
        PathBuf::from("plan-3/(prologue)editor.log")
    );
}

/// Names that would escape the artifact directory are rejected.
///
/// 会逃出产物目录的名称被拒绝。
#[test]
fn test_artifact_relative_path_rejects_escapes() {
    assert!(artifact_relative_path("").is_err());
    assert!(artifact_relative_path("   ").is_err());
    assert!(artifact_relative_path("../outside.log").is_err());
    assert!(artifact_relative_path("plan-1/../../outside.log").is_err());
    assert!(artifact_relative_path("/etc/passwd").is_err());
}

#[test]
fn test_copy_dir_all_copies_nested_content() {
    let src = tempdir().unwrap();
    fs::create_dir_all(src.path().join("nested")).unwrap();
    fs::write(src.path().join("error.log"), "crash").unwrap();
    fs::write(src.path().join("nested/extra.txt"), "more").unwrap();
    let dst = tempdir().unwrap();
    let target = dst.path().join("copy");

    copy_dir_all(src.path(), &target).unwrap();

    assert_eq!(fs::read_to_string(target.join("error.log")).unwrap(), "crash");
    assert_eq!(fs::read_to_string(target.join("nested/extra.txt")).unwrap(), "more");
}

#[test]
fn test_copy_dir_all_missing_source_fails() {
    let dst = tempdir().unwrap();
    let err = copy_dir_all(&dst.path().join("absent"), &dst.path().join("copy")).unwrap_err();
    assert!(err.to_string().contains("Failed to copy"));
}

#[test]
fn test_empty_dir_keeps_the_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
    fs::write(dir.path().join("file.txt"), "x").unwrap();
    fs::write(dir.path().join("sub/deeper/file.txt"), "y").unwrap();

    empty_dir(dir.path()).unwrap();

    assert!(dir.path().is_dir());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    empty_dir(&dir.path().join("absent")).unwrap();
}
