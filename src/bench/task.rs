//! Evaluation tasks and per-task results.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Role;
use crate::error::PersistenceError;
use crate::llm::Usage;

/// One benchmark item the agent must solve and report an answer for.
///
/// Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Difficulty tier (ordered integer level).
    pub level: u32,
    /// Natural-language prompt.
    pub prompt: String,
    /// Expected answer for scoring; `None` for blind submission.
    pub expected_answer: Option<String>,
    /// Name of an attached input file, if the task ships one.
    pub file_name: Option<String>,
}

impl Task {
    /// Creates a new task.
    pub fn new(id: impl Into<String>, level: u32, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            prompt: prompt.into(),
            expected_answer: None,
            file_name: None,
        }
    }

    /// Sets the expected answer.
    pub fn with_expected_answer(mut self, answer: impl Into<String>) -> Self {
        self.expected_answer = Some(answer.into());
        self
    }

    /// Sets the attached file name.
    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Terminal status of one agent run over one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The agent emitted a final answer.
    Success,
    /// The agent hit an unrecoverable fault (model, tool, or plan loop).
    AgentError,
    /// The wall-clock budget or harness timeout elapsed.
    Timeout,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::AgentError => write!(f, "agent_error"),
            TaskStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// Call and token counters for one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    /// Number of model calls made.
    pub calls: u64,
    /// Prompt tokens consumed.
    pub prompt_tokens: u64,
    /// Completion tokens generated.
    pub completion_tokens: u64,
}

/// Per-role call/token counters aggregated over one task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleCounters {
    #[serde(flatten)]
    per_role: BTreeMap<Role, CallStats>,
}

impl RoleCounters {
    /// Records one call for `role` with its token usage.
    pub fn record(&mut self, role: Role, usage: &Usage) {
        let stats = self.per_role.entry(role).or_default();
        stats.calls += 1;
        stats.prompt_tokens += u64::from(usage.prompt_tokens);
        stats.completion_tokens += u64::from(usage.completion_tokens);
    }

    /// Counters for one role, zero if it was never called.
    pub fn get(&self, role: Role) -> CallStats {
        self.per_role.get(&role).copied().unwrap_or_default()
    }

    /// Total calls across all roles.
    pub fn total_calls(&self) -> u64 {
        self.per_role.values().map(|s| s.calls).sum()
    }

    /// Total tokens (prompt + completion) across all roles.
    pub fn total_tokens(&self) -> u64 {
        self.per_role
            .values()
            .map(|s| s.prompt_tokens + s.completion_tokens)
            .sum()
    }
}

/// Outcome of one agent run over one task.
///
/// Created exactly once per task and never mutated after the harness
/// appends it to the run artifact (scoring happens before the append).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task identifier.
    pub task_id: String,
    /// Difficulty tier of the task.
    pub level: u32,
    /// The agent's final answer ("None" when the run produced none).
    pub answer: String,
    /// Terminal status.
    pub status: TaskStatus,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
    /// Per-role call and token counters.
    pub counters: RoleCounters,
    /// Error message for failed runs.
    pub error: Option<String>,
    /// 1.0 / 0.0 answer score; `None` for blind-submission tasks.
    pub score: Option<f64>,
}

impl TaskResult {
    /// Creates a successful result.
    pub fn success(
        task: &Task,
        answer: impl Into<String>,
        elapsed: Duration,
        counters: RoleCounters,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            level: task.level,
            answer: answer.into(),
            status: TaskStatus::Success,
            elapsed_ms: elapsed.as_millis() as u64,
            counters,
            error: None,
            score: None,
        }
    }

    /// Creates a failed result with the given terminal status.
    pub fn failure(
        task: &Task,
        status: TaskStatus,
        error: impl Into<String>,
        elapsed: Duration,
        counters: RoleCounters,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            level: task.level,
            answer: "None".to_string(),
            status,
            elapsed_ms: elapsed.as_millis() as u64,
            counters,
            error: Some(error.into()),
            score: None,
        }
    }

    /// Returns the elapsed wall-clock duration.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// GAIA-style metadata record, one JSON object per line.
#[derive(Debug, Deserialize)]
struct RawRecord {
    task_id: String,
    #[serde(rename = "Level")]
    level: u32,
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Final answer", default)]
    final_answer: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
}

/// An ordered task set loaded from a JSONL metadata file.
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    /// Loads tasks from a JSONL file, optionally filtered to one level.
    ///
    /// A `Final answer` of `"?"` (the blind-submission marker in GAIA test
    /// splits) is treated as absent.
    pub fn from_jsonl_file(
        path: impl AsRef<Path>,
        level: Option<u32>,
    ) -> Result<Self, PersistenceError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);

        let mut tasks = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: RawRecord =
                serde_json::from_str(&line).map_err(|e| PersistenceError::MalformedRecord {
                    line: index + 1,
                    message: e.to_string(),
                })?;

            if let Some(wanted) = level {
                if record.level != wanted {
                    continue;
                }
            }

            let mut task = Task::new(record.task_id, record.level, record.question);
            if let Some(answer) = record.final_answer.filter(|a| !a.trim().is_empty() && a != "?")
            {
                task = task.with_expected_answer(answer);
            }
            if let Some(file_name) = record.file_name.filter(|f| !f.trim().is_empty()) {
                task = task.with_file(file_name);
            }
            tasks.push(task);
        }

        Ok(Self { tasks })
    }

    /// The tasks, in file order.
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Number of tasks in the set.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
