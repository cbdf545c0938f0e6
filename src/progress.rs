// Derived completion state for a client's board. Nothing here is stored:
// progress, completion, and the active stage are recomputed from the
// snapshot on every read so they can never drift from task state.

use std::collections::HashMap;

use crate::models::ClientStage;

/// Board-level classification of a stage, derived per read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePhase {
    Completed,
    Active,
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionInfo {
    pub is_completed: bool,
    pub progress: i64,
}

/// Percentage of completed tasks, rounded; 0 for an empty task list
pub fn progress(stage: &ClientStage) -> i64 {
    if stage.tasks.is_empty() {
        return 0;
    }
    let completed = stage.tasks.iter().filter(|t| t.completed).count();
    (completed as f64 / stage.tasks.len() as f64 * 100.0).round() as i64
}

/// A stage counts as completed only when it has tasks and all are done.
/// An empty stage is never Completed.
pub fn is_completed(stage: &ClientStage) -> bool {
    !stage.tasks.is_empty() && progress(stage) == 100
}

/// Snapshot of one client's stages, sorted by board position
#[derive(Debug, Clone, Default)]
pub struct StageProgressModel {
    stages: Vec<ClientStage>,
}

impl StageProgressModel {
    pub fn new(mut stages: Vec<ClientStage>) -> Self {
        stages.sort_by_key(|s| s.sort_order);
        Self { stages }
    }

    pub fn stages(&self) -> &[ClientStage] {
        &self.stages
    }

    pub fn stage(&self, stage_id: &str) -> Option<&ClientStage> {
        self.stages.iter().find(|s| s.stage_id == stage_id)
    }

    pub fn task(&self, task_id: i64) -> Option<&crate::models::StageTask> {
        self.stages
            .iter()
            .flat_map(|s| s.tasks.iter())
            .find(|t| t.id == Some(task_id))
    }

    /// Per-stage completion map, keyed by stage_id
    pub fn completion_info(&self) -> HashMap<String, CompletionInfo> {
        self.stages
            .iter()
            .map(|stage| {
                (
                    stage.stage_id.clone(),
                    CompletionInfo {
                        is_completed: is_completed(stage),
                        progress: progress(stage),
                    },
                )
            })
            .collect()
    }

    /// Index of the first non-completed stage in sort order.
    /// None when every stage is completed (or the board is empty).
    pub fn active_stage_index(&self) -> Option<usize> {
        self.stages.iter().position(|s| !is_completed(s))
    }

    /// Classify the stage at `index` relative to the active stage
    pub fn phase(&self, index: usize) -> StagePhase {
        if is_completed(&self.stages[index]) {
            return StagePhase::Completed;
        }
        match self.active_stage_index() {
            Some(active) if index == active => StagePhase::Active,
            _ => StagePhase::Future,
        }
    }
}
