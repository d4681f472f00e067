//! # Log Slicer Module / 日志切分模块
//!
//! Splits the aggregate log of a batched launch into one slice per run-start
//! marker, so each case gets the part of the log it produced. The slices
//! are byte-exact: the prologue followed by every slice reproduces the log.
//!
//! 将批量启动的聚合日志按运行开始标记切分，每个用例得到自己产生的那部分日志。
//! 切分是按字节精确的：前言加上所有切片即可还原整个日志。

use anyhow::Result;
use std::path::PathBuf;

use crate::core::classifier::{RUN_START, is_run_start};
use crate::core::models::LaunchPlan;
use crate::infra::artifacts::ArtifactManager;

/// One region `[run-start_i, run-start_{i+1})` of the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSlice<'a> {
    /// 1-based position of the slice within its plan.
    pub index: usize,
    /// Script named by the run-start line.
    pub script: &'a str,
    pub text: &'a str,
}

/// A log split at its run-start markers.
/// 按运行开始标记切分后的日志。
#[derive(Debug, Clone, PartialEq)]
pub struct SlicedLog<'a> {
    /// Everything before the first run-start; the whole log when there is none.
    pub prologue: &'a str,
    pub slices: Vec<LogSlice<'a>>,
}

impl<'a> SlicedLog<'a> {
    /// The slice whose run-start names `script`.
    pub fn slice_for(&self, script: &str) -> Option<&LogSlice<'a>> {
        let wanted = script.replace('\\', "/");
        self.slices.iter().find(|slice| {
            let found = slice.script.replace('\\', "/");
            !found.is_empty()
                && (found == wanted
                    || wanted.ends_with(&format!("/{}", found))
                    || found.ends_with(&format!("/{}", wanted)))
        })
    }
}

/// Splits `log` at every line carrying a run-start marker.
///
/// 在每个包含运行开始标记的行处切分 `log`。
pub fn slice_log(log: &str) -> SlicedLog<'_> {
    let mut starts: Vec<(usize, &str)> = vec![];
    let mut offset = 0;
    for line in log.split_inclusive('\n') {
        if is_run_start(line) {
            let script = line
                .find(RUN_START)
                .map(|pos| line[pos + RUN_START.len()..].trim())
                .unwrap_or("");
            starts.push((offset, script));
        }
        offset += line.len();
    }

    let prologue_end = starts.first().map(|(pos, _)| *pos).unwrap_or(log.len());
    let slices = starts
        .iter()
        .enumerate()
        .map(|(i, (start, script))| {
            let end = starts.get(i + 1).map(|(pos, _)| *pos).unwrap_or(log.len());
            LogSlice {
                index: i + 1,
                script: *script,
                text: &log[*start..end],
            }
        })
        .collect();

    SlicedLog {
        prologue: &log[..prologue_end],
        slices,
    }
}

/// Artifact name of the aggregate log of a plan, `(<id>)<log>`.
pub fn aggregate_artifact_name(plan: &LaunchPlan) -> String {
    format!("({}){}", plan.id, plan.log_file_name())
}

/// Artifact name of slice `n` of a plan, `plan-<id>/(<n>)<log>`.
pub fn slice_artifact_name(plan: &LaunchPlan, index: usize) -> String {
    format!("plan-{}/({}){}", plan.id, index, plan.log_file_name())
}

/// Artifact name of the prologue of a plan, `plan-<id>/(prologue)<log>`.
pub fn prologue_artifact_name(plan: &LaunchPlan) -> String {
    format!("plan-{}/(prologue){}", plan.id, plan.log_file_name())
}

/// Saves the prologue and every slice. Returns the stored path of each slice, by slice index.
///
/// 保存前言和每个切片，按切片序号返回每个切片的存储路径。
pub fn persist(
    sliced: &SlicedLog<'_>,
    plan: &LaunchPlan,
    artifacts: &dyn ArtifactManager,
) -> Result<Vec<PathBuf>> {
    if !sliced.prologue.is_empty() {
        artifacts.save_text(sliced.prologue, &prologue_artifact_name(plan))?;
    }
    sliced
        .slices
        .iter()
        .map(|slice| artifacts.save_text(slice.text, &slice_artifact_name(plan, slice.index)))
        .collect()
}
