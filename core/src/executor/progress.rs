use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::types::TaskOutcome;

/// Visual progress monitor for wave execution
///
/// One overall bar across all tasks plus a spinner per running task.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    task_bars: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `total_tasks` - Total number of tasks in the run
    /// * `enabled` - Whether to draw anything at all
    pub fn new(total_tasks: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                task_bars: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_tasks as u64));

        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        overall.set_style(style);
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            enabled: true,
        }
    }

    /// Count tasks that were done before this run started.
    pub fn advance(&self, n: usize) {
        if self.enabled {
            self.overall.inc(n as u64);
        }
    }

    /// Add a task and create its progress spinner
    pub fn add_task(&mut self, task_id: &str) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.set_message(format!("⏳ {}", task_id));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert(task_id.to_string(), bar);
    }

    /// Record a finished task
    pub fn complete_task(&mut self, task_id: &str, outcome: &TaskOutcome, duration_ms: u64) {
        if !self.enabled {
            return;
        }

        let icon = match outcome {
            TaskOutcome::Success => "✅",
            TaskOutcome::Failure { .. } => "❌",
            TaskOutcome::Skipped { .. } => "⏭",
        };
        let line = format!("{} {} ({}ms)", icon, task_id, duration_ms);
        match self.task_bars.remove(task_id) {
            Some(bar) => bar.finish_with_message(line),
            None => {
                let _ = self.multi.println(line);
            }
        }

        self.overall.inc(1);
    }

    /// Drop the spinner of a task that never started.
    pub fn abandon_task(&mut self, task_id: &str) {
        if let Some(bar) = self.task_bars.remove(task_id) {
            bar.finish_and_clear();
        }
    }

    /// Mark wave progress (1-based)
    pub fn update_wave(&self, wave_number: usize, total_waves: usize) {
        if self.enabled {
            self.overall
                .set_message(format!("Wave {}/{}", wave_number, total_waves));
        }
    }

    /// Finish overall progress
    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ All tasks completed"
        } else {
            "❌ Execution finished with failures"
        };

        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_monitor_disabled() {
        let mut monitor = ProgressMonitor::new(3, false);

        monitor.add_task("T1");
        monitor.complete_task("T1", &TaskOutcome::Success, 100);
        monitor.update_wave(1, 2);
        monitor.finish(true);
    }

    #[test]
    fn test_progress_monitor_enabled() {
        let mut monitor = ProgressMonitor::new(3, true);

        monitor.advance(1);
        monitor.add_task("T1");
        monitor.add_task("T2");

        monitor.complete_task("T1", &TaskOutcome::Success, 100);
        monitor.complete_task(
            "T2",
            &TaskOutcome::Failure {
                error: "boom".into(),
            },
            200,
        );
        monitor.complete_task(
            "T3",
            &TaskOutcome::Skipped {
                reason: "dependency T2 failed".into(),
            },
            0,
        );

        monitor.update_wave(1, 2);
        monitor.finish(false);
    }
}
