use std::io::{BufRead, Write};

use specflow_core::executor::{ParallelExecutionState, ResumePrompter, ResumeStrategy, TaskStatus};

/// Asks on stderr/stdin how to continue an interrupted run.
pub struct StdinPrompter;

impl ResumePrompter for StdinPrompter {
    fn choose(&self, state: &ParallelExecutionState) -> ResumeStrategy {
        let pending = state
            .task_statuses
            .values()
            .filter(|s| !matches!(s, TaskStatus::Completed))
            .count();

        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "Found unfinished run for {} (wave {}/{}, {} completed, {} failed, {} not done){}",
            state.spec_name,
            state.current_wave,
            state.total_waves,
            state.completed_count(),
            state.failed_tasks.len(),
            pending,
            if state.interrupted { ", interrupted" } else { "" },
        );

        let stdin = std::io::stdin();
        loop {
            let _ = write!(stderr, "[r]etry, [s]kip wave, reset, [a]bort? [r] ");
            let _ = stderr.flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return ResumeStrategy::Abort,
                Ok(_) => {}
            }
            if line.trim().is_empty() {
                return ResumeStrategy::Retry;
            }
            match line.parse::<ResumeStrategy>() {
                Ok(strategy) => return strategy,
                Err(e) => {
                    let _ = writeln!(stderr, "{e}");
                }
            }
        }
    }
}
