//! # Suite Collector Module / 套件收集模块
//!
//! Turns a suite file into the list of reported items plus the hidden runner
//! items that own the scheduling work. Collection never starts a process.
//!
//! 将套件文件转换为可报告条目列表以及负责调度工作的隐藏运行器条目。
//! 收集阶段不会启动任何进程。

use std::collections::HashSet;
use std::time::Duration;

use crate::core::config::{CaseConfig, RunOptions, SuiteConfig, SuiteSettings};
use crate::core::errors::FrameworkError;
use crate::core::models::{
    Bucket, ExecutableKind, SCRIPT_NOT_FOUND_REASON, TestCaseDescriptor, TestResult,
};

/// One visible test item, `<Suite>::<Case>`.
/// 一个可见的测试条目，形如 `<Suite>::<Case>`。
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedItem {
    pub display_name: String,
    pub case: TestCaseDescriptor,
    /// Set when the case cannot run; the item is reported with this failure and never scheduled.
    pub collection_failure: Option<String>,
}

impl CollectedItem {
    pub fn name(&self) -> &str {
        &self.case.name
    }

    pub fn is_runnable(&self) -> bool {
        self.collection_failure.is_none()
    }

    /// The result reported for an item that failed at collection time.
    pub fn collection_result(&self) -> Option<TestResult> {
        self.collection_failure
            .as_ref()
            .map(|reason| TestResult::fail(self.case.name.clone(), reason.clone()))
    }
}

/// A hidden item holding the scheduling work for one bucket.
/// 持有某个分组调度工作的隐藏条目。
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerItem {
    pub bucket: Bucket,
    pub name: &'static str,
    /// Names of the cases the runner executes, in declaration order.
    pub cases: Vec<String>,
}

/// Result of collecting a suite.
/// 套件收集的结果。
#[derive(Debug, Clone)]
pub struct CollectedSuite {
    pub name: String,
    pub kind: ExecutableKind,
    pub settings: SuiteSettings,
    pub items: Vec<CollectedItem>,
    /// Runner items in execution order; buckets without cases have none.
    pub runners: Vec<RunnerItem>,
    /// Cases dropped by `--filter`.
    pub deselected: usize,
}

impl CollectedSuite {
    pub fn item(&self, name: &str) -> Option<&CollectedItem> {
        self.items.iter().find(|item| item.case.name == name)
    }

    /// Runnable cases of a bucket, in declaration order.
    pub fn bucket_cases(&self, bucket: Bucket) -> Vec<TestCaseDescriptor> {
        self.items
            .iter()
            .filter(|item| item.is_runnable() && item.case.bucket() == bucket)
            .map(|item| item.case.clone())
            .collect()
    }

    pub fn runnable_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_runnable()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Collects a suite into reported items and runner items.
///
/// 将套件收集为可报告条目和运行器条目。
///
/// # Errors
/// `FrameworkError::Collection` for duplicate names and malformed cases.
pub fn collect(suite: &SuiteConfig, options: &RunOptions) -> Result<CollectedSuite, FrameworkError> {
    if suite.name.trim().is_empty() {
        return Err(FrameworkError::collection(&suite.name, "suite name is empty"));
    }

    let mut seen = HashSet::new();
    for case in &suite.cases {
        validate_case(&suite.name, case)?;
        if !seen.insert(case.name.as_str()) {
            return Err(FrameworkError::collection(
                &suite.name,
                format!("duplicate test case name '{}'", case.name),
            ));
        }
    }

    let settings = suite.settings(options);
    let mut items = Vec::with_capacity(suite.cases.len());
    let mut deselected = 0;

    for case in &suite.cases {
        let display_name = format!("{}::{}", suite.name, case.name);
        if let Some(filter) = &options.filter {
            if !display_name.contains(filter.as_str()) {
                tracing::debug!(case = %display_name, "deselected by filter");
                deselected += 1;
                continue;
            }
        }

        let descriptor = describe(suite, case, options);
        let collection_failure = if descriptor.script_path.exists() {
            None
        } else {
            tracing::warn!(
                case = %display_name,
                script = %descriptor.script_path.display(),
                "script path not found"
            );
            Some(SCRIPT_NOT_FOUND_REASON.to_string())
        };

        items.push(CollectedItem {
            display_name,
            case: descriptor,
            collection_failure,
        });
    }

    let runners = settings
        .bucket_order
        .iter()
        .filter_map(|bucket| {
            let cases: Vec<String> = items
                .iter()
                .filter(|item| item.is_runnable() && item.case.bucket() == *bucket)
                .map(|item| item.case.name.clone())
                .collect();
            (!cases.is_empty()).then(|| RunnerItem {
                bucket: *bucket,
                name: bucket.runner_name(),
                cases,
            })
        })
        .collect();

    Ok(CollectedSuite {
        name: suite.name.clone(),
        kind: suite.executable,
        settings,
        items,
        runners,
        deselected,
    })
}

fn validate_case(suite: &str, case: &CaseConfig) -> Result<(), FrameworkError> {
    if case.name.trim().is_empty() {
        return Err(FrameworkError::collection(suite, "test case with an empty name"));
    }
    if case.script_path.as_os_str().is_empty() {
        return Err(FrameworkError::collection(
            suite,
            format!("test case '{}' has no script_path", case.name),
        ));
    }
    if case.timeout == 0 {
        return Err(FrameworkError::collection(
            suite,
            format!("test case '{}' has a zero timeout", case.name),
        ));
    }
    Ok(())
}

/// Applies the demotion rules: `--no-test-batch`, `--no-test-parallel` and debugger sessions.
fn describe(suite: &SuiteConfig, case: &CaseConfig, options: &RunOptions) -> TestCaseDescriptor {
    let mut is_batchable = case.is_batchable && !options.no_batch;
    let mut is_parallelizable = case.is_parallelizable && !options.no_parallel;
    let mut timeout = Some(Duration::from_secs(case.timeout));

    if case.attach_debugger || case.wait_for_debugger {
        timeout = None;
        if !suite.debugger_keeps_grouping {
            is_batchable = false;
            is_parallelizable = false;
        }
    }

    TestCaseDescriptor {
        name: case.name.clone(),
        script_path: case.script_path.clone(),
        timeout,
        extra_args: case.extra_args.clone(),
        is_batchable,
        is_parallelizable,
        attach_debugger: case.attach_debugger,
        wait_for_debugger: case.wait_for_debugger,
        use_null_renderer: case.use_null_renderer,
    }
}
