use criterion::{Criterion, criterion_group, criterion_main};
use editor_test_runner::core::classifier::{ClassifyOptions, classify};
use editor_test_runner::core::models::{
    CommandLine, ExecutableKind, LaunchOutcome, LaunchPlan, TestCaseDescriptor,
};
use editor_test_runner::core::slicer::slice_log;
use std::hint::black_box;
use std::path::PathBuf;
use std::time::Duration;

const CASES: usize = 64;
const NOISE_LINES_PER_CASE: usize = 200;

fn batched_plan() -> LaunchPlan {
    LaunchPlan {
        id: 1,
        kind: ExecutableKind::Editor,
        cases: (0..CASES)
            .map(|i| TestCaseDescriptor::new(format!("Case{}", i), format!("/proj/scripts/case_{}.py", i)))
            .collect(),
        command: CommandLine {
            program: PathBuf::from("Editor"),
            args: vec![],
        },
        log_dir: PathBuf::from("log"),
        log_path: PathBuf::from("log/editor.log"),
        timeout: None,
        batched: true,
    }
}

/// A large batched log: every case starts, logs noise, and reports a result.
fn batched_log(plan: &LaunchPlan) -> String {
    let mut log = String::from("[Editor] boot\n");
    for (i, case) in plan.cases.iter().enumerate() {
        let script = case.script_arg();
        log.push_str(&format!("[00:00:{:02}] Running automated test: {}\n", i % 60, script));
        for n in 0..NOISE_LINES_PER_CASE {
            log.push_str(&format!("(python_test) - step {} of {}\n", n, case.name));
        }
        if i % 7 == 3 {
            log.push_str(&format!("FAILURE {}\nassertion failed\n  File \"{}\", line 9\n\n", script, script));
        } else {
            log.push_str(&format!("SUCCESS {}\n", script));
        }
    }
    log
}

fn bench_classify(c: &mut Criterion) {
    let plan = batched_plan();
    let outcome = LaunchOutcome::exited(0xF, batched_log(&plan), Duration::from_secs(120));

    c.bench_function("classify_batched_log", |b| {
        b.iter(|| classify(black_box(&outcome), black_box(&plan), ClassifyOptions::default()));
    });
}

fn bench_slice(c: &mut Criterion) {
    let plan = batched_plan();
    let log = batched_log(&plan);

    c.bench_function("slice_batched_log", |b| {
        b.iter(|| slice_log(black_box(&log)).slices.len());
    });
}

criterion_group!(benches, bench_classify, bench_slice);
criterion_main!(benches);
