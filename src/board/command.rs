use crate::models::{StageIcon, StageSkeleton, TaskStyle};

/// Single-step move used by the non-drag affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Every mutation the board can ask the store to make. One closed set
/// instead of a callback per widget.
#[derive(Debug, Clone)]
pub enum BoardCommand {
    AddTask { stage_id: String, title: String },
    /// Newline-delimited titles; blank lines are dropped
    AddBulkTasks { stage_id: String, text: String },
    ToggleTask { task_id: i64 },
    RenameTask { task_id: i64, title: String },
    DeleteTask { task_id: i64 },
    BulkDeleteTasks { task_ids: Vec<i64> },
    SetTaskStyle { task_id: i64, style: TaskStyle },
    /// Some(ts) marks the task completed on that date; None reopens it
    SetTaskCompletedDate { task_id: i64, completed_ts: Option<i64> },

    AddStage { name: String, icon: StageIcon },
    UpdateStage { stage_id: String, name: String, icon: StageIcon },
    DeleteStage { stage_id: String },
    BulkDeleteStages { stage_ids: Vec<String> },
    /// File the stage under a folder; None unfiles it
    SetStageFolder { stage_id: String, folder_id: Option<String> },

    /// Drag a task from one position to another within its stage
    ReorderTasks { stage_id: String, from: usize, to: usize },
    /// Drag a stage from one board position to another
    ReorderStages { from: usize, to: usize },
    MoveStage { stage_id: String, direction: MoveDirection },

    StartTaskTimer { task_id: i64, target_working_days: i64 },
    StopTaskTimer { task_id: i64 },
    CycleTaskTimerStyle { task_id: i64 },
    StartStageTimer { stage_id: String, target_working_days: i64 },
    StopStageTimer { stage_id: String },
    CycleStageTimerStyle { stage_id: String },

    PasteStage { payload: StageSkeleton },
}

impl BoardCommand {
    /// Destructive commands need explicit confirmation before any store
    /// call is issued; there is no undo.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            BoardCommand::DeleteTask { .. }
                | BoardCommand::BulkDeleteTasks { .. }
                | BoardCommand::DeleteStage { .. }
                | BoardCommand::BulkDeleteStages { .. }
        )
    }
}

/// The user's answer to a destructive-action prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// What happened to a dispatched command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    /// Destructive command without confirmation: nothing was done
    ConfirmationRequired,
}
