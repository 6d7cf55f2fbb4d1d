use std::fmt::Write;

use super::types::{ExecutionReport, TaskOutcome, WavePlan, WaveStatus};

/// Human-readable dry-run listing.
pub fn render_wave_plan(plan: &WavePlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "📋 Execution plan: {} tasks in {} waves (max {} in parallel)",
        plan.total_tasks,
        plan.waves.len(),
        plan.max_parallel
    );
    for (i, wave) in plan.waves.iter().enumerate() {
        let _ = writeln!(out, "  Wave {} ({} tasks)", i + 1, wave.len());
        for id in wave {
            match plan.titles.get(id).filter(|t| !t.is_empty()) {
                Some(title) => {
                    let _ = writeln!(out, "    - {id}: {title}");
                }
                None => {
                    let _ = writeln!(out, "    - {id}");
                }
            }
        }
    }
    out
}

/// End-of-run summary with per-wave status and skip reasons.
pub fn render_report(report: &ExecutionReport) -> String {
    let mut out = String::new();
    for wave in &report.waves {
        let icon = match wave.status {
            WaveStatus::Completed => "✅",
            WaveStatus::PartialFailed => "⚠️",
        };
        let _ = writeln!(
            out,
            "{icon} Wave {}: {} ok, {} failed, {} skipped",
            wave.wave_number,
            wave.count(TaskOutcome::is_success),
            wave.count(TaskOutcome::is_failure),
            wave.count(TaskOutcome::is_skipped),
        );
        for result in &wave.results {
            if let TaskOutcome::Failure { error } = &result.outcome {
                let _ = writeln!(out, "    ❌ {}: {}", result.task_id, error);
            }
        }
    }
    for (id, reason) in &report.skip_reasons {
        let _ = writeln!(out, "    ⏭ {id}: {reason}");
    }
    let _ = writeln!(
        out,
        "Summary: {}/{} completed, {} failed, {} skipped ({}ms)",
        report.completed, report.total_tasks, report.failed, report.skipped, report.duration_ms
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::{TaskResult, WaveResult};
    use std::collections::BTreeMap;

    #[test]
    fn plan_lists_waves_in_order() {
        let plan = WavePlan {
            waves: vec![vec!["T1".into(), "T2".into()], vec!["T3".into()]],
            titles: BTreeMap::from([("T1".to_string(), "Set up".to_string())]),
            total_tasks: 3,
            max_parallel: 2,
        };
        let text = render_wave_plan(&plan);
        assert!(text.contains("3 tasks in 2 waves (max 2 in parallel)"));
        assert!(text.contains("Wave 1 (2 tasks)"));
        assert!(text.contains("- T1: Set up"));
        assert!(text.contains("- T2\n"));
        assert!(text.find("Wave 1").unwrap() < text.find("Wave 2").unwrap());
    }

    #[test]
    fn report_mentions_failures_and_skips() {
        let report = ExecutionReport::from_waves(
            "s",
            2,
            vec![
                WaveResult::from_results(1, vec![TaskResult::failure("T1", "boom", 3)]),
                WaveResult::from_results(2, vec![TaskResult::skipped("T2", "dependency T1 failed")]),
            ],
            7,
        );
        let text = render_report(&report);
        assert!(text.contains("T1: boom"));
        assert!(text.contains("T2: dependency T1 failed"));
        assert!(text.contains("Summary: 0/2 completed, 1 failed, 1 skipped"));
    }
}
