use serde::{Deserialize, Serialize};

/// Free-form color token overrides for a single task row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStyle {
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub is_bold: bool,
}

/// An atomic unit of work inside a stage.
///
/// `completed_ts` is null while the task is open. A completed task with no
/// timestamp is tolerated and read as "completed, date unknown".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTask {
    pub id: Option<i64>,
    pub client_id: String,
    pub stage_id: String,
    pub title: String,
    pub completed: bool,
    pub completed_ts: Option<i64>,
    pub sort_order: i64,
    pub style: TaskStyle,
    // Per-task deadline timer, same contract as the stage-level one
    pub started_ts: Option<i64>,
    pub target_working_days: Option<i64>,
    pub timer_display_style: i64,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl StageTask {
    /// Create a new open task (not yet persisted)
    pub fn new(client_id: &str, stage_id: &str, title: &str, sort_order: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            client_id: client_id.to_string(),
            stage_id: stage_id.to_string(),
            title: title.to_string(),
            completed: false,
            completed_ts: None,
            sort_order,
            style: TaskStyle::default(),
            started_ts: None,
            target_working_days: None,
            timer_display_style: 1,
            created_ts: now,
            modified_ts: now,
        }
    }

    pub fn timer_active(&self) -> bool {
        self.started_ts.is_some() && self.target_working_days.is_some()
    }
}

/// Split bulk-add input into task titles: one per line, trimmed, blanks dropped
pub fn split_bulk_titles(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}
