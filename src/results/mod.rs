//! Run artifacts and their persistence.
//!
//! A finished run becomes one [`RunArtifact`]: run metadata, a score
//! summary, and every per-task result in input order. The [`ResultStore`]
//! writes it as a timestamped JSON file whose name encodes the level
//! filter, and additionally drops one small JSON record per task for
//! spot inspection.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::bench::{TaskResult, TaskStatus};
use crate::error::PersistenceError;

/// Aggregate scores for one run.
///
/// Percentages are computed over scored tasks only; blind-submission
/// tasks (no expected answer) are excluded from the denominators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Number of tasks in the run.
    pub total_tasks: usize,
    /// Tasks that reached a final answer.
    pub succeeded: usize,
    /// Tasks with a known expected answer.
    pub scored_tasks: usize,
    /// Correct answers among scored tasks.
    pub correct: usize,
    /// Overall accuracy in percent over scored tasks, if any were scored.
    pub accuracy_pct: Option<f64>,
    /// Accuracy in percent per difficulty level, over that level's scored
    /// tasks.
    pub accuracy_by_level_pct: BTreeMap<u32, f64>,
}

impl ScoreSummary {
    /// Computes the summary from per-task results.
    pub fn from_results(results: &[TaskResult]) -> Self {
        let total_tasks = results.len();
        let succeeded = results
            .iter()
            .filter(|r| r.status == TaskStatus::Success)
            .count();

        let scored: Vec<&TaskResult> = results.iter().filter(|r| r.score.is_some()).collect();
        let correct = scored
            .iter()
            .filter(|r| r.score.unwrap_or(0.0) >= 1.0)
            .count();

        let accuracy_pct = if scored.is_empty() {
            None
        } else {
            Some(100.0 * correct as f64 / scored.len() as f64)
        };

        let mut per_level: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
        for result in &scored {
            let entry = per_level.entry(result.level).or_default();
            entry.0 += 1;
            if result.score.unwrap_or(0.0) >= 1.0 {
                entry.1 += 1;
            }
        }
        let accuracy_by_level_pct = per_level
            .into_iter()
            .map(|(level, (scored, correct))| (level, 100.0 * correct as f64 / scored as f64))
            .collect();

        Self {
            total_tasks,
            succeeded,
            scored_tasks: scored.len(),
            correct,
            accuracy_pct,
            accuracy_by_level_pct,
        }
    }
}

/// Everything recorded about one benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub created_at: DateTime<Utc>,
    /// Workspace directory the run executed in.
    pub workspace: PathBuf,
    /// Primary model under evaluation.
    pub model: String,
    /// Level filter applied to the task set, if any.
    pub level: Option<u32>,
    /// Aggregate scores.
    pub summary: ScoreSummary,
    /// Per-task results, in task-set order.
    pub results: Vec<TaskResult>,
}

impl RunArtifact {
    /// Builds an artifact from run metadata and results.
    pub fn new(
        workspace: impl Into<PathBuf>,
        model: impl Into<String>,
        level: Option<u32>,
        results: Vec<TaskResult>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            workspace: workspace.into(),
            model: model.into(),
            level,
            summary: ScoreSummary::from_results(&results),
            results,
        }
    }

    /// File stem for this artifact: `result_level<N>_<timestamp>` when a
    /// level filter was active, `result_all_<timestamp>` otherwise.
    pub fn file_stem(&self) -> String {
        let timestamp = self.created_at.format("%Y%m%d_%H%M%S");
        match self.level {
            Some(level) => format!("result_level{level}_{timestamp}"),
            None => format!("result_all_{timestamp}"),
        }
    }
}

/// Writes run artifacts and per-task records to a results directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dest: PathBuf,
}

impl ResultStore {
    /// Creates a store rooted at `dest`, creating the directory if needed.
    pub fn new(dest: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dest = dest.into();
        fs::create_dir_all(&dest).map_err(|_| PersistenceError::NotWritable(dest.clone()))?;
        Ok(Self { dest })
    }

    /// The destination directory.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Writes the full run artifact as pretty-printed JSON and returns the
    /// file path.
    pub fn save(&self, artifact: &RunArtifact) -> Result<PathBuf, PersistenceError> {
        let path = self.dest.join(format!("{}.json", artifact.file_stem()));
        let json = serde_json::to_string_pretty(artifact)?;
        fs::write(&path, json).map_err(|_| PersistenceError::NotWritable(self.dest.clone()))?;
        info!(path = %path.display(), tasks = artifact.results.len(), "Run artifact written");
        Ok(path)
    }

    /// Writes one task's result as `results_<task_id>.json`.
    pub fn save_task_record(&self, result: &TaskResult) -> Result<PathBuf, PersistenceError> {
        let path = self.dest.join(format!("results_{}.json", result.task_id));
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&path, json).map_err(|_| PersistenceError::NotWritable(self.dest.clone()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{RoleCounters, Task};
    use std::time::Duration;

    fn scored(id: &str, level: u32, score: f64) -> TaskResult {
        let task = Task::new(id, level, "q");
        let mut result =
            TaskResult::success(&task, "answer", Duration::from_secs(1), RoleCounters::default());
        result.score = Some(score);
        result
    }

    fn blind(id: &str, level: u32) -> TaskResult {
        let task = Task::new(id, level, "q");
        TaskResult::success(&task, "answer", Duration::from_secs(1), RoleCounters::default())
    }

    #[test]
    fn test_summary_excludes_blind_tasks_from_denominator() {
        let results = vec![
            scored("a", 1, 1.0),
            scored("b", 1, 0.0),
            scored("c", 2, 1.0),
            blind("d", 2),
        ];
        let summary = ScoreSummary::from_results(&results);

        assert_eq!(summary.total_tasks, 4);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.scored_tasks, 3);
        assert_eq!(summary.correct, 2);
        assert!((summary.accuracy_pct.unwrap() - 66.666).abs() < 0.01);
        assert!((summary.accuracy_by_level_pct[&1] - 50.0).abs() < f64::EPSILON);
        assert!((summary.accuracy_by_level_pct[&2] - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_with_no_scored_tasks() {
        let summary = ScoreSummary::from_results(&[blind("a", 1)]);
        assert_eq!(summary.accuracy_pct, None);
        assert!(summary.accuracy_by_level_pct.is_empty());
    }

    #[test]
    fn test_file_stem_encodes_level_filter() {
        let with_level = RunArtifact::new("/tmp/ws", "gpt-4o", Some(2), vec![]);
        assert!(with_level.file_stem().starts_with("result_level2_"));

        let all_levels = RunArtifact::new("/tmp/ws", "gpt-4o", None, vec![]);
        assert!(all_levels.file_stem().starts_with("result_all_"));
    }

    #[test]
    fn test_save_and_reload_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ResultStore::new(dir.path()).expect("store");

        let artifact = RunArtifact::new("/tmp/ws", "gpt-4o", Some(1), vec![scored("a", 1, 1.0)]);
        let path = store.save(&artifact).expect("save");
        assert!(path.exists());

        let json = fs::read_to_string(&path).expect("read");
        // Field names are part of the artifact contract.
        for key in ["run_id", "created_at", "model", "summary", "results", "task_id", "status"] {
            assert!(json.contains(&format!("\"{key}\"")), "missing key {key}");
        }

        let reloaded: RunArtifact = serde_json::from_str(&json).expect("parse");
        assert_eq!(reloaded.run_id, artifact.run_id);
        assert_eq!(reloaded.model, "gpt-4o");
        assert_eq!(reloaded.results.len(), 1);
        assert_eq!(reloaded.results[0].task_id, "a");
    }

    #[test]
    fn test_save_task_record_uses_task_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ResultStore::new(dir.path()).expect("store");

        let path = store.save_task_record(&scored("abc-123", 1, 1.0)).expect("save");
        assert!(path.ends_with("results_abc-123.json"));
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_destination_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file_path = dir.path().join("not-a-dir");
        fs::write(&file_path, "x").expect("write");

        // A plain file cannot become the results directory.
        let err = ResultStore::new(&file_path).unwrap_err();
        assert!(matches!(err, PersistenceError::NotWritable(_)));
    }
}
