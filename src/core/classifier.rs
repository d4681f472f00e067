//! # Outcome Classifier Module / 结果分类模块
//!
//! Reads the exit status and the launcher log of one launch and produces one
//! `Outcome` per case of the plan. The classifier is pure: it never looks at
//! process state, only at what the launcher recorded.
//!
//! 读取一次启动的退出状态和启动器日志，为计划中的每个用例生成一个 `Outcome`。
//! 分类器是纯函数：它从不查看进程状态，只使用启动器记录的内容。
//!
//! ## Marker lines / 标记行
//!
//! ```text
//! Running automated test: <script>
//! SUCCESS <script>
//! FAILURE <script>[ <reason>]
//! <reason line>
//! <stack lines ...>
//! ```
//!
//! Markers may carry a log-line prefix (timestamps, channels); paths compare
//! with `\` normalized to `/`.

use std::time::Duration;

use crate::core::models::{
    LaunchOutcome, LaunchPlan, Outcome, TestCaseDescriptor, UnknownCause,
};

pub const RUN_START: &str = "Running automated test:";
pub const RUN_SUCCESS: &str = "SUCCESS ";
pub const RUN_FAILURE: &str = "FAILURE ";

const DEFAULT_FAILURE_REASON: &str = "test reported failure";

/// How a case reported its end.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEnd {
    Success,
    Failure {
        reason: String,
        stack: Option<String>,
    },
}

/// Markers found in a log for one case.
/// 日志中为单个用例找到的标记。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseMarkers {
    pub started: bool,
    pub end: Option<RunEnd>,
}

impl CaseMarkers {
    fn is_unmatched_start(&self) -> bool {
        self.started && self.end.is_none()
    }

    fn ended_outcome(&self) -> Option<Outcome> {
        self.end.as_ref().map(|end| match end {
            RunEnd::Success => Outcome::Pass,
            RunEnd::Failure { reason, stack } => Outcome::Fail {
                reason: reason.clone(),
                stack: stack.clone(),
            },
        })
    }
}

/// Suite settings the classifier depends on.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyOptions {
    /// Exit code signalling an in-host assertion failure.
    pub test_fail_retcode: i32,
    /// A non-zero exit this early, with no marker at all, is a failed launch.
    pub startup_grace: Duration,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            test_fail_retcode: 0xF,
            startup_grace: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Marker<'a> {
    Start(&'a str),
    Success(&'a str),
    Failure(&'a str),
}

fn parse_marker(line: &str) -> Option<Marker<'_>> {
    if let Some(pos) = line.find(RUN_START) {
        return Some(Marker::Start(line[pos + RUN_START.len()..].trim()));
    }
    if let Some(pos) = line.find(RUN_SUCCESS) {
        return Some(Marker::Success(line[pos + RUN_SUCCESS.len()..].trim()));
    }
    if let Some(pos) = line.find(RUN_FAILURE) {
        return Some(Marker::Failure(line[pos + RUN_FAILURE.len()..].trim()));
    }
    None
}

/// Returns true for any line carrying a run-start marker.
pub fn is_run_start(line: &str) -> bool {
    line.contains(RUN_START)
}

/// A line ends a failure block only if it starts a run or reports the end of
/// a case that belongs to the plan; free text mentioning `SUCCESS` does not.
fn ends_failure_block(line: &str, cases: &[TestCaseDescriptor]) -> bool {
    match parse_marker(line) {
        Some(Marker::Start(_)) => true,
        Some(Marker::Success(path)) => find_case(cases, path).is_some(),
        Some(Marker::Failure(rest)) => find_failed_case(cases, rest).is_some(),
        None => false,
    }
}

/// Compares a path printed in the log with the path the case was launched with.
/// Either side may be relative to the other.
fn paths_match(found: &str, expected: &str) -> bool {
    let found = found.replace('\\', "/");
    let expected = expected.replace('\\', "/");
    if found.is_empty() {
        return false;
    }
    found == expected
        || expected.ends_with(&format!("/{}", found))
        || found.ends_with(&format!("/{}", expected))
}

fn find_case(cases: &[TestCaseDescriptor], path: &str) -> Option<usize> {
    cases
        .iter()
        .position(|case| paths_match(path, &case.script_arg()))
}

/// Splits `<script>[ <inline reason>]` into the case index and the inline reason.
/// Script paths may contain spaces, so the longest prefix naming a case wins.
fn find_failed_case(cases: &[TestCaseDescriptor], rest: &str) -> Option<(usize, String)> {
    if let Some(index) = find_case(cases, rest) {
        return Some((index, String::new()));
    }
    rest.char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(pos, _)| pos)
        .rev()
        .find_map(|pos| {
            let path = rest[..pos].trim_end();
            if path.is_empty() {
                return None;
            }
            find_case(cases, path).map(|index| (index, rest[pos..].trim().to_string()))
        })
}

/// Scans a log for the markers of every case in the plan.
///
/// 扫描日志，找出计划中每个用例的标记。
pub fn scan_markers(log: &str, cases: &[TestCaseDescriptor]) -> Vec<CaseMarkers> {
    let mut markers = vec![CaseMarkers::default(); cases.len()];
    let lines: Vec<&str> = log.lines().collect();

    let mut i = 0;
    while i < lines.len() {
        match parse_marker(lines[i]) {
            Some(Marker::Start(path)) => {
                if let Some(index) = find_case(cases, path) {
                    markers[index].started = true;
                }
            }
            Some(Marker::Success(path)) => {
                if let Some(index) = find_case(cases, path) {
                    if markers[index].end.is_none() {
                        markers[index].end = Some(RunEnd::Success);
                    }
                }
            }
            Some(Marker::Failure(rest)) => {
                if let Some((index, inline)) = find_failed_case(cases, rest) {
                    let (reason, stack, consumed) = read_failure_block(&lines[i + 1..], inline, cases);
                    if markers[index].end.is_none() {
                        markers[index].end = Some(RunEnd::Failure { reason, stack });
                    }
                    i += consumed;
                }
            }
            None => {}
        }
        i += 1;
    }
    markers
}

/// Reads the optional reason line and stack block following a `FAILURE` marker.
/// Returns the reason, the stack and the number of lines consumed.
fn read_failure_block(
    following: &[&str],
    inline: String,
    cases: &[TestCaseDescriptor],
) -> (String, Option<String>, usize) {
    let mut block = vec![];
    for line in following {
        if line.trim().is_empty() || ends_failure_block(line, cases) {
            break;
        }
        block.push(*line);
    }
    let consumed = block.len();

    let (reason, stack_lines) = if !inline.is_empty() {
        (inline, &block[..])
    } else if let Some((first, rest)) = block.split_first() {
        (first.trim().to_string(), rest)
    } else {
        (DEFAULT_FAILURE_REASON.to_string(), &block[..])
    };

    let stack = (!stack_lines.is_empty()).then(|| stack_lines.join("\n"));
    (reason, stack, consumed)
}

/// Produces one outcome per case of the plan, in plan order.
///
/// Rules, first match wins:
/// 1. sentinel exit with a started but unfinished case: that case fails;
/// 2. timeout: the running case times out, the ones after it are unknown;
/// 3. any other non-zero exit: the first unfinished case crashed, the ones after it are unknown;
/// 4. `SUCCESS` passes, `FAILURE` fails;
/// 5. no marker at all: unknown.
///
/// 按计划顺序为每个用例生成一个结果。
pub fn classify(
    outcome: &LaunchOutcome,
    plan: &LaunchPlan,
    options: ClassifyOptions,
) -> Vec<Outcome> {
    let cases = &plan.cases;
    if cases.is_empty() {
        return vec![];
    }

    if let Some(error) = &outcome.launch_error {
        return crash_all(cases, outcome.exit_code, Some(error.clone()));
    }

    let markers = scan_markers(&outcome.log, cases);

    if outcome.cancelled {
        return markers
            .iter()
            .map(|m| {
                m.ended_outcome().unwrap_or(Outcome::Unknown {
                    cause: UnknownCause::Cancelled,
                })
            })
            .collect();
    }

    let died = !outcome.timed_out && outcome.exit_code != Some(0);
    let no_markers = markers.iter().all(|m| !m.started && m.end.is_none());
    if died
        && outcome.exit_code != Some(options.test_fail_retcode)
        && no_markers
        && outcome.elapsed < options.startup_grace
    {
        tracing::warn!(plan = plan.id, exit_code = ?outcome.exit_code, "host failed to start");
        return crash_all(cases, outcome.exit_code, crash_stack(outcome));
    }

    let unmatched = markers.iter().position(CaseMarkers::is_unmatched_start);
    let unfinished = markers.iter().position(|m| m.end.is_none());

    if outcome.exit_code == Some(options.test_fail_retcode) && !outcome.timed_out {
        if let Some(failed) = unmatched {
            return markers
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    if i == failed {
                        Outcome::Fail {
                            reason: format!(
                                "test exited with failure code {:#x} before reporting a result",
                                options.test_fail_retcode
                            ),
                            stack: outcome.crash_log.clone(),
                        }
                    } else {
                        by_markers(m)
                    }
                })
                .collect();
        }
    }

    if outcome.timed_out {
        let offender = unmatched.or(unfinished).unwrap_or(cases.len() - 1);
        let offender_name = cases[offender].name.clone();
        return markers
            .iter()
            .enumerate()
            .map(|(i, m)| {
                if i == offender {
                    Outcome::Timeout {
                        after: cases[i].timeout.unwrap_or(outcome.elapsed),
                    }
                } else if i > offender && m.end.is_none() {
                    Outcome::Unknown {
                        cause: UnknownCause::CoBatchedTimeout {
                            offender: offender_name.clone(),
                        },
                    }
                } else {
                    by_markers(m)
                }
            })
            .collect();
    }

    if outcome.exit_code != Some(0) && outcome.exit_code != Some(options.test_fail_retcode) {
        let offender = unfinished.unwrap_or(cases.len() - 1);
        let offender_name = cases[offender].name.clone();
        return markers
            .iter()
            .enumerate()
            .map(|(i, m)| {
                if i == offender {
                    Outcome::Crash {
                        return_code: outcome.exit_code,
                        stack: crash_stack(outcome),
                    }
                } else if i > offender && m.end.is_none() {
                    Outcome::Unknown {
                        cause: UnknownCause::CoBatchedCrash {
                            offender: offender_name.clone(),
                        },
                    }
                } else {
                    by_markers(m)
                }
            })
            .collect();
    }

    markers.iter().map(by_markers).collect()
}

fn by_markers(markers: &CaseMarkers) -> Outcome {
    markers.ended_outcome().unwrap_or(Outcome::Unknown {
        cause: UnknownCause::NoResultMarker,
    })
}

fn crash_all(
    cases: &[TestCaseDescriptor],
    return_code: Option<i32>,
    stack: Option<String>,
) -> Vec<Outcome> {
    cases
        .iter()
        .map(|_| Outcome::Crash {
            return_code,
            stack: stack.clone(),
        })
        .collect()
}

fn crash_stack(outcome: &LaunchOutcome) -> Option<String> {
    outcome
        .crash_log
        .clone()
        .filter(|log| !log.trim().is_empty())
}
