use anyhow::{bail, Result};

use crate::board::command::{BoardCommand, Confirmation, DispatchOutcome, MoveDirection};
use crate::board::selection::Selection;
use crate::error::ValidationError;
use crate::models::{split_bulk_titles, ClientStage};
use crate::progress::StageProgressModel;
use crate::reorder::{move_down, move_up, reorder};
use crate::store::StageStore;

/// How the board is rendered. The underlying data and commands are the
/// same in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Cards,
    Table,
}

/// One client's board: a snapshot of its stages plus the transient view
/// state that never touches the database. Every confirmed mutation goes
/// through [`dispatch`](BoardController::dispatch), which validates the
/// command, forwards it to the store, and reloads the snapshot so derived
/// state can never drift from what was persisted.
pub struct BoardController<S: StageStore> {
    store: S,
    client_id: String,
    model: StageProgressModel,
    pub selection: Selection,
    pub view_mode: ViewMode,
    folder_filter: Option<String>,
    task_counts_visible: std::collections::HashSet<String>,
}

impl<S: StageStore> BoardController<S> {
    /// Load (and, for a never-seen client, seed) the board
    pub fn open(mut store: S, client_id: &str) -> Result<Self> {
        let stages = store.fetch_stages(client_id)?;
        Ok(Self {
            store,
            client_id: client_id.to_string(),
            model: StageProgressModel::new(stages),
            selection: Selection::default(),
            view_mode: ViewMode::default(),
            folder_filter: None,
            task_counts_visible: std::collections::HashSet::new(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn model(&self) -> &StageProgressModel {
        &self.model
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Stages passing the folder filter, in board order
    pub fn visible_stages(&self) -> Vec<&ClientStage> {
        self.model
            .stages()
            .iter()
            .filter(|s| match &self.folder_filter {
                Some(folder) => s.folder_id.as_deref() == Some(folder.as_str()),
                None => true,
            })
            .collect()
    }

    pub fn set_folder_filter(&mut self, folder_id: Option<String>) {
        self.folder_filter = folder_id;
    }

    pub fn folder_filter(&self) -> Option<&str> {
        self.folder_filter.as_deref()
    }

    /// Per-stage toggle for the task-count annotation. View state only;
    /// gone when the controller is dropped.
    pub fn toggle_task_count(&mut self, stage_id: &str) {
        if !self.task_counts_visible.insert(stage_id.to_string()) {
            self.task_counts_visible.remove(stage_id);
        }
    }

    pub fn task_count_visible(&self, stage_id: &str) -> bool {
        self.task_counts_visible.contains(stage_id)
    }

    /// Select every task in a stage at once
    pub fn select_all_tasks(&mut self, stage_id: &str) -> Result<()> {
        let stage = self.require_stage(stage_id)?;
        let ids: Vec<i64> = stage.tasks.iter().filter_map(|t| t.id).collect();
        self.selection.select_tasks(ids);
        Ok(())
    }

    /// Delete every selected task. Destructive, so it carries the same
    /// confirmation gate as any other delete.
    pub fn delete_selected_tasks(
        &mut self,
        confirmation: Confirmation,
    ) -> Result<DispatchOutcome> {
        let task_ids = self.selection.task_ids();
        self.dispatch(BoardCommand::BulkDeleteTasks { task_ids }, confirmation)
    }

    pub fn delete_selected_stages(
        &mut self,
        confirmation: Confirmation,
    ) -> Result<DispatchOutcome> {
        let stage_ids = self.selection.stage_ids();
        self.dispatch(BoardCommand::BulkDeleteStages { stage_ids }, confirmation)
    }

    /// Validate and apply one command. Destructive commands are refused
    /// without an explicit confirmation; nothing is written in that case.
    /// On success the snapshot is re-fetched and stale selections pruned.
    pub fn dispatch(
        &mut self,
        command: BoardCommand,
        confirmation: Confirmation,
    ) -> Result<DispatchOutcome> {
        if command.is_destructive() && confirmation != Confirmation::Confirmed {
            return Ok(DispatchOutcome::ConfirmationRequired);
        }
        self.validate(&command)?;
        self.apply(command)?;
        self.refresh()?;
        Ok(DispatchOutcome::Applied)
    }

    /// Reload the snapshot from the store
    pub fn refresh(&mut self) -> Result<()> {
        let stages = self.store.fetch_stages(&self.client_id)?;
        self.model = StageProgressModel::new(stages);

        let task_ids = self
            .model
            .stages()
            .iter()
            .flat_map(|s| s.tasks.iter().filter_map(|t| t.id))
            .collect();
        let stage_ids = self
            .model
            .stages()
            .iter()
            .map(|s| s.stage_id.clone())
            .collect();
        self.selection.retain_existing(&task_ids, &stage_ids);
        self.task_counts_visible
            .retain(|id| stage_ids.contains(id));
        Ok(())
    }

    /// Local checks that need no database round trip. Anything that passes
    /// here can still fail in the store (missing row, conflict).
    fn validate(&self, command: &BoardCommand) -> Result<()> {
        match command {
            BoardCommand::AddTask { title, .. } | BoardCommand::RenameTask { title, .. } => {
                if title.trim().is_empty() {
                    bail!(ValidationError::EmptyTaskTitle);
                }
            }
            BoardCommand::AddBulkTasks { text, .. } => {
                if split_bulk_titles(text).is_empty() {
                    bail!(ValidationError::EmptyTaskTitle);
                }
            }
            BoardCommand::AddStage { name, .. } | BoardCommand::UpdateStage { name, .. } => {
                if name.trim().is_empty() {
                    bail!(ValidationError::EmptyStageName);
                }
            }
            BoardCommand::PasteStage { payload } => {
                if payload.stage_name.trim().is_empty() {
                    bail!(ValidationError::EmptyStageName);
                }
            }
            BoardCommand::StartTaskTimer {
                target_working_days, ..
            }
            | BoardCommand::StartStageTimer {
                target_working_days, ..
            } => {
                if !(1..=365).contains(target_working_days) {
                    bail!(ValidationError::InvalidTimerDays(*target_working_days));
                }
            }
            BoardCommand::CycleTaskTimerStyle { task_id } => {
                let active = self
                    .model
                    .task(*task_id)
                    .map(|t| t.timer_active())
                    .unwrap_or(false);
                if !active {
                    bail!(ValidationError::TimerNotRunning);
                }
            }
            BoardCommand::CycleStageTimerStyle { stage_id } => {
                let active = self
                    .model
                    .stage(stage_id)
                    .map(|s| s.timer_active())
                    .unwrap_or(false);
                if !active {
                    bail!(ValidationError::TimerNotRunning);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply(&mut self, command: BoardCommand) -> Result<()> {
        match command {
            BoardCommand::AddTask { stage_id, title } => {
                self.store
                    .add_task(&self.client_id, &stage_id, title.trim())?;
            }
            BoardCommand::AddBulkTasks { stage_id, text } => {
                let titles = split_bulk_titles(&text);
                self.store
                    .add_bulk_tasks(&self.client_id, &stage_id, &titles)?;
            }
            BoardCommand::ToggleTask { task_id } => self.store.toggle_task(task_id)?,
            BoardCommand::RenameTask { task_id, title } => {
                self.store.update_task(task_id, title.trim())?;
            }
            BoardCommand::DeleteTask { task_id } => self.store.delete_task(task_id)?,
            BoardCommand::BulkDeleteTasks { task_ids } => {
                let deleted = self.store.bulk_delete_tasks(&task_ids)?;
                log::debug!("bulk deleted {} of {} tasks", deleted, task_ids.len());
            }
            BoardCommand::SetTaskStyle { task_id, style } => {
                self.store.update_task_style(task_id, &style)?;
            }
            BoardCommand::SetTaskCompletedDate {
                task_id,
                completed_ts,
            } => {
                self.store.update_task_completed_date(task_id, completed_ts)?;
            }

            BoardCommand::AddStage { name, icon } => {
                self.store.add_stage(&self.client_id, name.trim(), icon)?;
            }
            BoardCommand::UpdateStage {
                stage_id,
                name,
                icon,
            } => {
                self.store
                    .update_stage(&self.client_id, &stage_id, name.trim(), icon)?;
            }
            BoardCommand::DeleteStage { stage_id } => {
                self.store.delete_stage(&self.client_id, &stage_id)?;
            }
            BoardCommand::BulkDeleteStages { stage_ids } => {
                self.store
                    .bulk_delete_stages(&self.client_id, &stage_ids)?;
            }
            BoardCommand::SetStageFolder {
                stage_id,
                folder_id,
            } => {
                self.store
                    .set_stage_folder(&self.client_id, &stage_id, folder_id.as_deref())?;
            }

            BoardCommand::ReorderTasks { stage_id, from, to } => {
                let stage = self.require_stage(&stage_id)?;
                let ids: Vec<i64> = stage.tasks.iter().filter_map(|t| t.id).collect();
                let ordered = reorder(&ids, from, to);
                self.store.reorder_tasks(&ordered)?;
            }
            BoardCommand::ReorderStages { from, to } => {
                let ids: Vec<String> = self
                    .model
                    .stages()
                    .iter()
                    .map(|s| s.stage_id.clone())
                    .collect();
                let ordered = reorder(&ids, from, to);
                self.store.reorder_stages(&self.client_id, &ordered)?;
            }
            BoardCommand::MoveStage {
                stage_id,
                direction,
            } => {
                let ids: Vec<String> = self
                    .model
                    .stages()
                    .iter()
                    .map(|s| s.stage_id.clone())
                    .collect();
                let Some(index) = ids.iter().position(|id| id == &stage_id) else {
                    bail!("No stage found with id={}", stage_id);
                };
                let ordered = match direction {
                    MoveDirection::Up => move_up(&ids, index),
                    MoveDirection::Down => move_down(&ids, index),
                };
                self.store.reorder_stages(&self.client_id, &ordered)?;
            }

            BoardCommand::StartTaskTimer {
                task_id,
                target_working_days,
            } => {
                self.store.start_task_timer(task_id, target_working_days)?;
            }
            BoardCommand::StopTaskTimer { task_id } => self.store.stop_task_timer(task_id)?,
            BoardCommand::CycleTaskTimerStyle { task_id } => {
                self.store.cycle_task_timer_style(task_id)?;
            }
            BoardCommand::StartStageTimer {
                stage_id,
                target_working_days,
            } => {
                self.store
                    .start_stage_timer(&self.client_id, &stage_id, target_working_days)?;
            }
            BoardCommand::StopStageTimer { stage_id } => {
                self.store.stop_stage_timer(&self.client_id, &stage_id)?;
            }
            BoardCommand::CycleStageTimerStyle { stage_id } => {
                self.store
                    .cycle_stage_timer_style(&self.client_id, &stage_id)?;
            }

            BoardCommand::PasteStage { payload } => {
                self.store.paste_stage(&self.client_id, &payload)?;
            }
        }
        Ok(())
    }

    fn require_stage(&self, stage_id: &str) -> Result<&ClientStage> {
        self.model
            .stage(stage_id)
            .ok_or_else(|| anyhow::anyhow!("No stage found with id={}", stage_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StageIcon;
    use crate::store::SqliteStore;

    fn controller() -> BoardController<SqliteStore> {
        BoardController::open(SqliteStore::in_memory().unwrap(), "c1").unwrap()
    }

    fn first_task_id(board: &BoardController<SqliteStore>) -> i64 {
        board.model().stages()[0].tasks[0].id.unwrap()
    }

    #[test]
    fn test_open_seeds_default_board() {
        let board = controller();
        assert_eq!(board.model().stages().len(), 4);
        assert_eq!(board.model().stages()[0].stage_id, "contact");
    }

    #[test]
    fn test_add_task_refreshes_snapshot() {
        let mut board = controller();
        let outcome = board
            .dispatch(
                BoardCommand::AddTask {
                    stage_id: "contact".into(),
                    title: "Call the client".into(),
                },
                Confirmation::Declined,
            )
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Applied);
        assert_eq!(board.model().stages()[0].tasks.len(), 1);
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut board = controller();
        let err = board
            .dispatch(
                BoardCommand::AddTask {
                    stage_id: "contact".into(),
                    title: "   ".into(),
                },
                Confirmation::Declined,
            )
            .unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
        assert_eq!(board.model().stages()[0].tasks.len(), 0);
    }

    #[test]
    fn test_bulk_add_splits_lines_and_skips_blanks() {
        let mut board = controller();
        board
            .dispatch(
                BoardCommand::AddBulkTasks {
                    stage_id: "contact".into(),
                    text: "A\nB\n\nC".into(),
                },
                Confirmation::Declined,
            )
            .unwrap();
        let titles: Vec<&str> = board.model().stages()[0]
            .tasks
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut board = controller();
        board
            .dispatch(
                BoardCommand::AddTask {
                    stage_id: "contact".into(),
                    title: "Call".into(),
                },
                Confirmation::Declined,
            )
            .unwrap();
        let task_id = first_task_id(&board);

        let outcome = board
            .dispatch(BoardCommand::DeleteTask { task_id }, Confirmation::Declined)
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::ConfirmationRequired);
        assert_eq!(board.model().stages()[0].tasks.len(), 1);

        let outcome = board
            .dispatch(BoardCommand::DeleteTask { task_id }, Confirmation::Confirmed)
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Applied);
        assert_eq!(board.model().stages()[0].tasks.len(), 0);
    }

    #[test]
    fn test_timer_days_out_of_range_rejected() {
        let mut board = controller();
        for days in [0, -3, 366] {
            let err = board
                .dispatch(
                    BoardCommand::StartStageTimer {
                        stage_id: "contact".into(),
                        target_working_days: days,
                    },
                    Confirmation::Declined,
                )
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ValidationError>(),
                Some(ValidationError::InvalidTimerDays(_))
            ));
        }
        assert!(board.model().stage("contact").unwrap().started_ts.is_none());
    }

    #[test]
    fn test_cycle_without_running_timer_refused() {
        let mut board = controller();
        let err = board
            .dispatch(
                BoardCommand::CycleStageTimerStyle {
                    stage_id: "contact".into(),
                },
                Confirmation::Declined,
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::TimerNotRunning)
        ));

        board
            .dispatch(
                BoardCommand::StartStageTimer {
                    stage_id: "contact".into(),
                    target_working_days: 10,
                },
                Confirmation::Declined,
            )
            .unwrap();
        board
            .dispatch(
                BoardCommand::CycleStageTimerStyle {
                    stage_id: "contact".into(),
                },
                Confirmation::Declined,
            )
            .unwrap();
        assert_eq!(
            board.model().stage("contact").unwrap().timer_display_style,
            2
        );
    }

    #[test]
    fn test_stop_stage_timer_clears_both_fields() {
        let mut board = controller();
        board
            .dispatch(
                BoardCommand::StartStageTimer {
                    stage_id: "contact".into(),
                    target_working_days: 10,
                },
                Confirmation::Declined,
            )
            .unwrap();
        let stage = board.model().stage("contact").unwrap();
        assert!(stage.started_ts.is_some());
        assert_eq!(stage.target_working_days, Some(10));

        board
            .dispatch(
                BoardCommand::StopStageTimer {
                    stage_id: "contact".into(),
                },
                Confirmation::Declined,
            )
            .unwrap();
        let stage = board.model().stage("contact").unwrap();
        assert!(stage.started_ts.is_none());
        assert!(stage.target_working_days.is_none());
    }

    #[test]
    fn test_reorder_stages_drag_to_front() {
        let mut board = controller();
        board
            .dispatch(
                BoardCommand::ReorderStages { from: 3, to: 0 },
                Confirmation::Declined,
            )
            .unwrap();
        let ids: Vec<&str> = board
            .model()
            .stages()
            .iter()
            .map(|s| s.stage_id.as_str())
            .collect();
        assert_eq!(ids, vec!["control", "contact", "info", "submission"]);
    }

    #[test]
    fn test_move_stage_down_one_step() {
        let mut board = controller();
        board
            .dispatch(
                BoardCommand::MoveStage {
                    stage_id: "contact".into(),
                    direction: MoveDirection::Down,
                },
                Confirmation::Declined,
            )
            .unwrap();
        let ids: Vec<&str> = board
            .model()
            .stages()
            .iter()
            .map(|s| s.stage_id.as_str())
            .collect();
        assert_eq!(ids, vec!["info", "contact", "submission", "control"]);
    }

    #[test]
    fn test_select_all_then_bulk_delete() {
        let mut board = controller();
        board
            .dispatch(
                BoardCommand::AddBulkTasks {
                    stage_id: "contact".into(),
                    text: "A\nB\nC".into(),
                },
                Confirmation::Declined,
            )
            .unwrap();
        board.select_all_tasks("contact").unwrap();
        assert_eq!(board.selection.task_count(), 3);

        let outcome = board.delete_selected_tasks(Confirmation::Confirmed).unwrap();
        assert_eq!(outcome, DispatchOutcome::Applied);
        assert_eq!(board.model().stages()[0].tasks.len(), 0);
        // Pruned on refresh
        assert_eq!(board.selection.task_count(), 0);
    }

    #[test]
    fn test_folder_filter_hides_other_stages() {
        let mut board = controller();
        board
            .dispatch(
                BoardCommand::AddStage {
                    name: "Billing".into(),
                    icon: StageIcon::FolderOpen,
                },
                Confirmation::Declined,
            )
            .unwrap();
        assert_eq!(board.visible_stages().len(), 5);

        board
            .dispatch(
                BoardCommand::SetStageFolder {
                    stage_id: "contact".into(),
                    folder_id: Some("archive".into()),
                },
                Confirmation::Declined,
            )
            .unwrap();

        board.set_folder_filter(Some("archive".into()));
        let visible = board.visible_stages();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].stage_id, "contact");
        board.set_folder_filter(None);
        assert_eq!(board.visible_stages().len(), 5);
    }

    #[test]
    fn test_task_count_toggle_is_transient_per_stage() {
        let mut board = controller();
        assert!(!board.task_count_visible("contact"));
        board.toggle_task_count("contact");
        assert!(board.task_count_visible("contact"));
        assert!(!board.task_count_visible("info"));
        board.toggle_task_count("contact");
        assert!(!board.task_count_visible("contact"));
    }

    #[test]
    fn test_paste_appends_stage_with_preserved_tasks() {
        let mut board = controller();
        let payload: crate::models::StageSkeleton = serde_json::from_str(
            r#"{"stage_name":"Review","stage_icon":"Send","tasks":[{"title":"Check file","completed":true}]}"#,
        )
        .unwrap();
        board
            .dispatch(BoardCommand::PasteStage { payload }, Confirmation::Declined)
            .unwrap();

        let stages = board.model().stages();
        assert_eq!(stages.len(), 5);
        let pasted = &stages[4];
        assert_eq!(pasted.stage_name, "Review");
        assert!(pasted.stage_id.starts_with("custom_"));
        assert!(pasted.tasks[0].completed);
        assert!(pasted.tasks[0].completed_ts.is_none());
    }
}
