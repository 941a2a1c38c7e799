//! Benchmark tasks and the harness that drives an agent across them.

mod harness;
mod scorer;
mod task;

pub use harness::{BenchmarkHarness, CancelHandle, HarnessConfig, TaskSolver};
pub use scorer::{normalize_answer, score_answer};
pub use task::{CallStats, RoleCounters, Task, TaskResult, TaskSet, TaskStatus};
