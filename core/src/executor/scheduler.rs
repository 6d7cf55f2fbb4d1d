use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// One task dispatched by [`execute_wave_parallel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub task_id: String,

    /// `None` when cancellation arrived before the task acquired a slot.
    pub result: Option<Result<(), String>>,

    pub duration_ms: u64,
}

/// Execute one wave of tasks with at most `max_concurrency` in flight.
///
/// `max_concurrency` is clamped to `1..=Semaphore::MAX_PERMITS`.
///
/// Tasks that are still waiting for a slot when `cancel` fires are not
/// started. `on_complete` observes each run as soon as it finishes, in
/// completion order; the returned runs are in that same order.
pub async fn execute_wave_parallel<F, Fut, C>(
    task_ids: &[String],
    max_concurrency: usize,
    cancel: &CancellationToken,
    executor_fn: F,
    mut on_complete: C,
) -> Vec<TaskRun>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), String>>,
    C: FnMut(&TaskRun),
{
    let sem = Arc::new(Semaphore::new(max_concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut futs = FuturesUnordered::new();

    for id in task_ids {
        let task_id = id.clone();
        let sem = sem.clone();
        let cancel = cancel.clone();
        let fut = executor_fn(task_id.clone());

        futs.push(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = sem.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                return TaskRun {
                    task_id,
                    result: None,
                    duration_ms: 0,
                };
            };
            if cancel.is_cancelled() {
                return TaskRun {
                    task_id,
                    result: None,
                    duration_ms: 0,
                };
            }

            tracing::debug!(task_id = %task_id, "task started");
            let start = Instant::now();
            let result = fut.await;
            TaskRun {
                task_id,
                result: Some(result),
                duration_ms: start.elapsed().as_millis() as u64,
            }
        });
    }

    let mut runs = Vec::with_capacity(task_ids.len());
    while let Some(run) = futs.next().await {
        on_complete(&run);
        runs.push(run);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("T{i}")).collect()
    }

    #[tokio::test]
    async fn respects_concurrency_bound() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let runs = execute_wave_parallel(
            &ids(6),
            2,
            &CancellationToken::new(),
            |_id| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_| {},
        )
        .await;

        assert_eq!(runs.len(), 6);
        assert!(runs.iter().all(|r| r.result == Some(Ok(()))));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_limit_is_clamped() {
        let runs = execute_wave_parallel(
            &ids(2),
            usize::MAX,
            &CancellationToken::new(),
            |_id| async { Ok(()) },
            |_| {},
        )
        .await;
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.result == Some(Ok(()))));
    }

    #[tokio::test]
    async fn failures_do_not_stop_siblings() {
        let mut seen = Vec::new();
        let runs = execute_wave_parallel(
            &ids(3),
            3,
            &CancellationToken::new(),
            |id| async move {
                if id == "T2" {
                    Err("boom".to_string())
                } else {
                    Ok(())
                }
            },
            |run| seen.push(run.task_id.clone()),
        )
        .await;

        assert_eq!(seen.len(), 3);
        let failed: Vec<_> = runs
            .iter()
            .filter(|r| matches!(r.result, Some(Err(_))))
            .map(|r| r.task_id.as_str())
            .collect();
        assert_eq!(failed, vec!["T2"]);
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runs = execute_wave_parallel(
            &ids(3),
            1,
            &cancel,
            |_id| async { Ok(()) },
            |_| {},
        )
        .await;
        assert!(runs.iter().all(|r| r.result.is_none()));
    }

    #[tokio::test]
    async fn queued_tasks_do_not_start_after_cancel() {
        let cancel = CancellationToken::new();
        let started = Arc::new(AtomicUsize::new(0));

        let runs = execute_wave_parallel(
            &ids(4),
            1,
            &cancel,
            |_id| {
                let cancel = cancel.clone();
                let started = started.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    cancel.cancel();
                    Ok(())
                }
            },
            |_| {},
        )
        .await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(runs.iter().filter(|r| r.result.is_some()).count(), 1);
    }
}
