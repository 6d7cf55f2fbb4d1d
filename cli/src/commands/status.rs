use specflow_core::error::CliError;
use specflow_core::executor::{ParallelStateStore, TaskStatus};
use specflow_core::retry::RetryStore;

use super::cli::SpecArg;
use super::CommandContext;

pub fn status_cmd(ctx: &CommandContext, args: SpecArg) -> Result<i32, CliError> {
    let spec = args.spec.as_str();
    let retries = RetryStore::new(&ctx.state_dir).list(spec)?;

    println!("Spec: {spec}");
    if retries.is_empty() {
        println!("Retry counters: none");
    } else {
        println!("Retry counters:");
        for state in &retries {
            let flag = if state.can_retry() { "" } else { " (exhausted)" };
            println!(
                "  {:<12} {}/{}{}",
                state.stage.as_str(),
                state.count,
                state.max_retries,
                flag
            );
        }
    }

    match ParallelStateStore::new(&ctx.state_dir).load(spec)? {
        None => println!("Parallel run: none"),
        Some(state) => {
            let count = |wanted: TaskStatus| {
                state
                    .task_statuses
                    .values()
                    .filter(|s| **s == wanted)
                    .count()
            };
            let phase = if state.is_complete() {
                "complete"
            } else if state.interrupted {
                "interrupted"
            } else {
                "incomplete"
            };
            println!(
                "Parallel run: {phase}, wave {}/{}, started {}",
                state.current_wave, state.total_waves, state.started_at
            );
            println!(
                "  completed {}, failed {}, skipped {}, pending {}",
                count(TaskStatus::Completed),
                count(TaskStatus::Failed),
                count(TaskStatus::Skipped),
                count(TaskStatus::Pending) + count(TaskStatus::InProgress)
            );
            for id in &state.failed_tasks {
                let error = state.task_errors.get(id).map(String::as_str).unwrap_or("");
                println!("  ❌ {id}: {error}");
            }
            for (task, path) in &state.worktree_paths {
                println!("  worktree {task}: {}", path.display());
            }
        }
    }

    Ok(0)
}
