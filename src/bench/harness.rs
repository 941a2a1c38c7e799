//! Benchmark harness driving an agent across an ordered task set.
//!
//! Guarantees: exactly one result per input task, in input order, whatever
//! the execution concurrency; per-task failures (including panics and
//! timeouts) are recorded, never propagated; a run-level cancellation
//! signal stops issuing new tasks and force-fails in-flight ones as
//! timeouts after a grace period.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use super::scorer::score_answer;
use super::task::{RoleCounters, Task, TaskResult, TaskStatus};

/// Something that can solve one task and report the outcome.
///
/// Implementations must contain their own failures: `solve` always returns
/// a result, converting internal faults into a failed status.
#[async_trait]
pub trait TaskSolver: Send + Sync {
    /// Runs one task to a terminal status.
    async fn solve(&self, task: &Task) -> TaskResult;
}

/// Configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Maximum number of tasks in flight at once.
    pub max_concurrency: usize,
    /// Hard per-task timeout enforced by the harness.
    pub task_timeout: Duration,
    /// How long in-flight tasks may continue after cancellation.
    pub grace_period: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            task_timeout: Duration::from_secs(900),
            grace_period: Duration::from_secs(30),
        }
    }
}

impl HarnessConfig {
    /// Sets the concurrency limit (clamped to at least 1).
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// Sets the per-task timeout.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Sets the cancellation grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }
}

/// Handle for signalling run-level cancellation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation of the run.
    pub fn cancel(&self) {
        // Receivers may already be gone if the run finished.
        let _ = self.tx.send(true);
    }
}

/// Drives an agent (via [`TaskSolver`]) across an ordered task set.
pub struct BenchmarkHarness {
    solver: Arc<dyn TaskSolver>,
    config: HarnessConfig,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl BenchmarkHarness {
    /// Creates a harness around a shared solver.
    pub fn new(solver: Arc<dyn TaskSolver>, config: HarnessConfig) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            solver,
            config,
            cancel_tx,
            cancel_rx,
        }
    }

    /// Returns a handle that cancels the run when triggered.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Runs every task and returns exactly one result per task, in input
    /// order.
    pub async fn run(&self, tasks: Vec<Task>) -> Vec<TaskResult> {
        let total = tasks.len();
        info!(
            tasks = total,
            concurrency = self.config.max_concurrency,
            "Starting benchmark run"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(total);

        // Kept outside the spawned futures so a panicked task can still be
        // matched back to its identity.
        let identities: Vec<(String, u32)> =
            tasks.iter().map(|t| (t.id.clone(), t.level)).collect();

        for (index, task) in tasks.into_iter().enumerate() {
            let solver = Arc::clone(&self.solver);
            let semaphore = Arc::clone(&semaphore);
            let cancel_rx = self.cancel_rx.clone();
            let config = self.config.clone();

            handles.push(tokio::spawn(async move {
                let result = run_one(solver, &task, semaphore, cancel_rx, &config).await;
                (index, result)
            }));
        }

        // Results land in input-index order regardless of completion order.
        let mut slots: Vec<Option<TaskResult>> = (0..total).map(|_| None).collect();
        for (position, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    // A panicked task still gets a recorded failure under
                    // its own identity; spawn order matches input order.
                    let (task_id, level) = identities[position].clone();
                    warn!(task_id = %task_id, error = %e, "Task execution panicked");
                    slots[position] = Some(TaskResult {
                        task_id,
                        level,
                        answer: "None".to_string(),
                        status: TaskStatus::AgentError,
                        elapsed_ms: 0,
                        counters: RoleCounters::default(),
                        error: Some(format!("task execution panicked: {e}")),
                        score: None,
                    });
                }
            }
        }

        let results: Vec<TaskResult> = slots
            .into_iter()
            .map(|slot| slot.expect("every input task produces exactly one result"))
            .collect();

        let succeeded = results
            .iter()
            .filter(|r| r.status == TaskStatus::Success)
            .count();
        info!(tasks = total, succeeded, "Benchmark run complete");

        results
    }
}

/// Runs a single task under the semaphore, timeout and cancellation rules,
/// then scores the answer when the task has a known expected answer.
async fn run_one(
    solver: Arc<dyn TaskSolver>,
    task: &Task,
    semaphore: Arc<Semaphore>,
    mut cancel_rx: watch::Receiver<bool>,
    config: &HarnessConfig,
) -> TaskResult {
    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return TaskResult::failure(
                task,
                TaskStatus::AgentError,
                "harness shut down before task started",
                Duration::ZERO,
                RoleCounters::default(),
            )
        }
    };

    // Cancelled before start: the task is never issued.
    if *cancel_rx.borrow() {
        return TaskResult::failure(
            task,
            TaskStatus::Timeout,
            "run cancelled before task started",
            Duration::ZERO,
            RoleCounters::default(),
        );
    }

    info!(task_id = %task.id, level = task.level, "Starting task");
    let started = Instant::now();

    let mut result = tokio::select! {
        timed = tokio::time::timeout(config.task_timeout, solver.solve(task)) => {
            match timed {
                Ok(result) => result,
                Err(_) => TaskResult::failure(
                    task,
                    TaskStatus::Timeout,
                    format!("task timed out after {:?}", config.task_timeout),
                    started.elapsed(),
                    RoleCounters::default(),
                ),
            }
        }
        _ = cancelled_then_grace(&mut cancel_rx, config.grace_period) => {
            TaskResult::failure(
                task,
                TaskStatus::Timeout,
                "run cancelled while task was in flight",
                started.elapsed(),
                RoleCounters::default(),
            )
        }
    };

    if result.status == TaskStatus::Success {
        if let Some(ref truth) = task.expected_answer {
            result.score = Some(if score_answer(&result.answer, truth) {
                1.0
            } else {
                0.0
            });
        }
    }

    info!(
        task_id = %task.id,
        status = %result.status,
        elapsed_ms = result.elapsed_ms,
        "Task finished"
    );
    result
}

/// Resolves once cancellation is signalled and the grace period has
/// elapsed; pends forever otherwise.
async fn cancelled_then_grace(cancel_rx: &mut watch::Receiver<bool>, grace: Duration) {
    loop {
        if *cancel_rx.borrow() {
            tokio::time::sleep(grace).await;
            return;
        }
        if cancel_rx.changed().await.is_err() {
            // Sender dropped without cancelling; never resolve.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SleepySolver {
        delay: Duration,
    }

    #[async_trait]
    impl TaskSolver for SleepySolver {
        async fn solve(&self, task: &Task) -> TaskResult {
            tokio::time::sleep(self.delay).await;
            TaskResult::success(task, "done", self.delay, RoleCounters::default())
        }
    }

    fn tasks(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| Task::new(format!("task-{i}"), 1, format!("question {i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_run_preserves_input_order_under_concurrency() {
        let harness = BenchmarkHarness::new(
            Arc::new(SleepySolver {
                delay: Duration::from_millis(5),
            }),
            HarnessConfig::default().with_max_concurrency(4),
        );

        let results = harness.run(tasks(8)).await;
        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.task_id, format!("task-{i}"));
            assert_eq!(result.status, TaskStatus::Success);
        }
    }

    #[tokio::test]
    async fn test_per_task_timeout_is_isolated() {
        struct OneSlowSolver;

        #[async_trait]
        impl TaskSolver for OneSlowSolver {
            async fn solve(&self, task: &Task) -> TaskResult {
                if task.id == "task-2" {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                TaskResult::success(task, "fast", Duration::ZERO, RoleCounters::default())
            }
        }

        let harness = BenchmarkHarness::new(
            Arc::new(OneSlowSolver),
            HarnessConfig::default()
                .with_max_concurrency(5)
                .with_task_timeout(Duration::from_millis(50)),
        );

        let results = harness.run(tasks(5)).await;
        assert_eq!(results.len(), 5);
        assert_eq!(results[2].status, TaskStatus::Timeout);
        for i in [0, 1, 3, 4] {
            assert_eq!(results[i].status, TaskStatus::Success, "task {i}");
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_new_tasks_and_force_fails_in_flight() {
        let harness = BenchmarkHarness::new(
            Arc::new(SleepySolver {
                delay: Duration::from_secs(60),
            }),
            HarnessConfig::default()
                .with_max_concurrency(1)
                .with_task_timeout(Duration::from_secs(120))
                .with_grace_period(Duration::from_millis(10)),
        );

        let handle = harness.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let results = harness.run(tasks(3)).await;
        assert_eq!(results.len(), 3);
        // First task was in flight; the rest were never issued.
        for result in &results {
            assert_eq!(result.status, TaskStatus::Timeout);
            assert!(result.error.as_deref().unwrap().contains("cancelled"));
        }
    }

    #[tokio::test]
    async fn test_panicking_task_keeps_its_identity() {
        struct PanickySolver;

        #[async_trait]
        impl TaskSolver for PanickySolver {
            async fn solve(&self, task: &Task) -> TaskResult {
                if task.id == "task-1" {
                    panic!("solver blew up");
                }
                TaskResult::success(task, "ok", Duration::ZERO, RoleCounters::default())
            }
        }

        let harness = BenchmarkHarness::new(
            Arc::new(PanickySolver),
            HarnessConfig::default().with_max_concurrency(3),
        );
        let mut input = tasks(3);
        input[1].level = 2;

        let results = harness.run(input).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, TaskStatus::Success);
        assert_eq!(results[2].status, TaskStatus::Success);

        // The panicked task is recorded under its own id and level.
        assert_eq!(results[1].task_id, "task-1");
        assert_eq!(results[1].level, 2);
        assert_eq!(results[1].status, TaskStatus::AgentError);
        assert!(results[1].error.as_deref().unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn test_scoring_applied_when_expected_answer_known() {
        struct EchoSolver;

        #[async_trait]
        impl TaskSolver for EchoSolver {
            async fn solve(&self, task: &Task) -> TaskResult {
                TaskResult::success(task, "Paris", Duration::ZERO, RoleCounters::default())
            }
        }

        let harness = BenchmarkHarness::new(Arc::new(EchoSolver), HarnessConfig::default());
        let tasks = vec![
            Task::new("scored-hit", 1, "capital?").with_expected_answer("paris"),
            Task::new("scored-miss", 1, "capital?").with_expected_answer("London"),
            Task::new("blind", 1, "capital?"),
        ];

        let results = harness.run(tasks).await;
        assert_eq!(results[0].score, Some(1.0));
        assert_eq!(results[1].score, Some(0.0));
        assert_eq!(results[2].score, None);
    }
}
