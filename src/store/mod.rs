// The backend collaborator. The board controller never touches the
// database directly: everything goes through this trait, and every call
// can fail. The SQLite implementation serializes writes through its single
// connection, so two racing mutations cannot interleave inside one call.

use anyhow::Result;
use rusqlite::Connection;

use crate::badge::cycle_style;
use crate::db::DbConnection;
use crate::models::{
    BoardTemplate, ClientStage, StageIcon, StageSkeleton, StageTask, TaskStyle, DEFAULT_STAGES,
};
use crate::repo::{StageRepo, TaskRepo, TemplateRepo};

/// Persistence contract for a client's stage board.
///
/// Calls are blocking and fallible; on error the caller must leave its local
/// snapshot untouched and re-fetch from the last known-good state.
pub trait StageStore {
    /// A client's stages with tasks attached, in board order.
    /// A never-seen client gets the default stages seeded first; a board
    /// emptied by the user stays empty.
    fn fetch_stages(&mut self, client_id: &str) -> Result<Vec<ClientStage>>;

    fn add_task(&mut self, client_id: &str, stage_id: &str, title: &str) -> Result<StageTask>;
    fn add_bulk_tasks(
        &mut self,
        client_id: &str,
        stage_id: &str,
        titles: &[String],
    ) -> Result<Vec<StageTask>>;
    /// Flip completion; sets completed_ts to now when completing, clears it
    /// when reopening
    fn toggle_task(&mut self, task_id: i64) -> Result<()>;
    fn update_task(&mut self, task_id: i64, title: &str) -> Result<()>;
    fn delete_task(&mut self, task_id: i64) -> Result<()>;
    fn bulk_delete_tasks(&mut self, task_ids: &[i64]) -> Result<usize>;
    fn update_task_style(&mut self, task_id: i64, style: &TaskStyle) -> Result<()>;
    /// Manager override: setting a date marks the task completed, clearing
    /// it reopens the task
    fn update_task_completed_date(&mut self, task_id: i64, completed_ts: Option<i64>) -> Result<()>;

    fn start_task_timer(&mut self, task_id: i64, target_working_days: i64) -> Result<()>;
    fn stop_task_timer(&mut self, task_id: i64) -> Result<()>;
    /// Advance the display style 1->2->...->5->1, returning the new value
    fn cycle_task_timer_style(&mut self, task_id: i64) -> Result<i64>;

    fn add_stage(&mut self, client_id: &str, name: &str, icon: StageIcon) -> Result<ClientStage>;
    fn update_stage(
        &mut self,
        client_id: &str,
        stage_id: &str,
        name: &str,
        icon: StageIcon,
    ) -> Result<()>;
    /// Deletes the stage and all tasks in it
    fn delete_stage(&mut self, client_id: &str, stage_id: &str) -> Result<()>;
    /// File the stage under a folder, or unfile it with None
    fn set_stage_folder(
        &mut self,
        client_id: &str,
        stage_id: &str,
        folder_id: Option<&str>,
    ) -> Result<()>;
    fn bulk_delete_stages(&mut self, client_id: &str, stage_ids: &[String]) -> Result<()>;

    fn reorder_tasks(&mut self, ordered_task_ids: &[i64]) -> Result<()>;
    fn reorder_stages(&mut self, client_id: &str, ordered_stage_ids: &[String]) -> Result<()>;

    fn start_stage_timer(
        &mut self,
        client_id: &str,
        stage_id: &str,
        target_working_days: i64,
    ) -> Result<()>;
    fn stop_stage_timer(&mut self, client_id: &str, stage_id: &str) -> Result<()>;
    fn cycle_stage_timer_style(&mut self, client_id: &str, stage_id: &str) -> Result<i64>;

    /// Instantiate a skeleton as a new stage appended to the client's board:
    /// fresh id, no timer, tasks in order with completion flags preserved
    fn paste_stage(&mut self, client_id: &str, payload: &StageSkeleton) -> Result<ClientStage>;

    fn save_template(&mut self, name: &str, stages: &[StageSkeleton]) -> Result<()>;
    fn list_templates(&mut self) -> Result<Vec<String>>;
    fn get_template(&mut self, name: &str) -> Result<Option<BoardTemplate>>;
    fn delete_template(&mut self, name: &str) -> Result<()>;
}

/// Default store backed by the local SQLite database
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open() -> Result<Self> {
        Ok(Self {
            conn: DbConnection::connect()?,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: DbConnection::connect_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn seed_defaults(&mut self, client_id: &str) -> Result<()> {
        log::debug!("seeding default stages for client {}", client_id);
        let tx = self.conn.unchecked_transaction()?;
        for (index, (stage_id, name, icon)) in DEFAULT_STAGES.iter().enumerate() {
            let stage = ClientStage::new(client_id, stage_id, name, *icon, index as i64);
            StageRepo::create(&tx, &stage)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn is_seeded(&self, client_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM seeded_clients WHERE client_id = ?1",
            [client_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn mark_seeded(&self, client_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO seeded_clients (client_id, seeded_ts) VALUES (?1, ?2)",
            rusqlite::params![client_id, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn require_task(&self, task_id: i64) -> Result<StageTask> {
        TaskRepo::get_by_id(&self.conn, task_id)?
            .ok_or_else(|| anyhow::anyhow!("No task found with id={}", task_id))
    }

    fn require_stage(&self, client_id: &str, stage_id: &str) -> Result<ClientStage> {
        StageRepo::get(&self.conn, client_id, stage_id)?
            .ok_or_else(|| anyhow::anyhow!("No stage found with id={}", stage_id))
    }
}

impl StageStore for SqliteStore {
    fn fetch_stages(&mut self, client_id: &str) -> Result<Vec<ClientStage>> {
        // Seed once per client, ever. An empty board after that stays
        // empty: deleting the defaults must not resurrect them. A client
        // whose first stages arrived by paste or template keeps them.
        if !self.is_seeded(client_id)? {
            if StageRepo::list_for_client(&self.conn, client_id)?.is_empty() {
                self.seed_defaults(client_id)?;
            }
            self.mark_seeded(client_id)?;
        }
        let mut stages = StageRepo::list_for_client(&self.conn, client_id)?;

        let mut tasks = TaskRepo::list_for_client(&self.conn, client_id)?;
        for stage in &mut stages {
            let (mine, rest): (Vec<StageTask>, Vec<StageTask>) =
                tasks.into_iter().partition(|t| t.stage_id == stage.stage_id);
            stage.tasks = mine;
            stage.tasks.sort_by_key(|t| t.sort_order);
            tasks = rest;
        }
        Ok(stages)
    }

    fn add_task(&mut self, client_id: &str, stage_id: &str, title: &str) -> Result<StageTask> {
        self.require_stage(client_id, stage_id)?;
        let sort_order = TaskRepo::next_sort_order(&self.conn, client_id, stage_id)?;
        let task = StageTask::new(client_id, stage_id, title, sort_order);
        log::debug!("add task '{}' to {}/{}", title, client_id, stage_id);
        TaskRepo::create(&self.conn, &task)
    }

    fn add_bulk_tasks(
        &mut self,
        client_id: &str,
        stage_id: &str,
        titles: &[String],
    ) -> Result<Vec<StageTask>> {
        self.require_stage(client_id, stage_id)?;
        let base = TaskRepo::next_sort_order(&self.conn, client_id, stage_id)?;
        let tx = self.conn.unchecked_transaction()?;
        let mut created = Vec::with_capacity(titles.len());
        for (index, title) in titles.iter().enumerate() {
            let task = StageTask::new(client_id, stage_id, title, base + index as i64);
            created.push(TaskRepo::create(&tx, &task)?);
        }
        tx.commit()?;
        log::debug!("added {} tasks to {}/{}", created.len(), client_id, stage_id);
        Ok(created)
    }

    fn toggle_task(&mut self, task_id: i64) -> Result<()> {
        let task = self.require_task(task_id)?;
        let completed = !task.completed;
        let completed_ts = completed.then(|| chrono::Utc::now().timestamp());
        TaskRepo::set_completed(&self.conn, task_id, completed, completed_ts)
    }

    fn update_task(&mut self, task_id: i64, title: &str) -> Result<()> {
        TaskRepo::set_title(&self.conn, task_id, title)
    }

    fn delete_task(&mut self, task_id: i64) -> Result<()> {
        TaskRepo::delete(&self.conn, task_id)
    }

    fn bulk_delete_tasks(&mut self, task_ids: &[i64]) -> Result<usize> {
        TaskRepo::bulk_delete(&self.conn, task_ids)
    }

    fn update_task_style(&mut self, task_id: i64, style: &TaskStyle) -> Result<()> {
        TaskRepo::set_style(&self.conn, task_id, style)
    }

    fn update_task_completed_date(&mut self, task_id: i64, completed_ts: Option<i64>) -> Result<()> {
        self.require_task(task_id)?;
        TaskRepo::set_completed(&self.conn, task_id, completed_ts.is_some(), completed_ts)
    }

    fn start_task_timer(&mut self, task_id: i64, target_working_days: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        TaskRepo::start_timer(&self.conn, task_id, now, target_working_days)
    }

    fn stop_task_timer(&mut self, task_id: i64) -> Result<()> {
        TaskRepo::stop_timer(&self.conn, task_id)
    }

    fn cycle_task_timer_style(&mut self, task_id: i64) -> Result<i64> {
        let task = self.require_task(task_id)?;
        let next = cycle_style(task.timer_display_style);
        TaskRepo::set_timer_style(&self.conn, task_id, next)?;
        Ok(next)
    }

    fn add_stage(&mut self, client_id: &str, name: &str, icon: StageIcon) -> Result<ClientStage> {
        let sort_order = StageRepo::max_sort_order(&self.conn, client_id)? + 1;
        let stage = ClientStage::new(client_id, &ClientStage::custom_id(), name, icon, sort_order);
        log::debug!("add stage '{}' for client {}", name, client_id);
        StageRepo::create(&self.conn, &stage)
    }

    fn update_stage(
        &mut self,
        client_id: &str,
        stage_id: &str,
        name: &str,
        icon: StageIcon,
    ) -> Result<()> {
        StageRepo::update_name_icon(&self.conn, client_id, stage_id, name, icon)
    }

    fn delete_stage(&mut self, client_id: &str, stage_id: &str) -> Result<()> {
        log::debug!("delete stage {}/{}", client_id, stage_id);
        StageRepo::delete(&self.conn, client_id, stage_id)
    }

    fn set_stage_folder(
        &mut self,
        client_id: &str,
        stage_id: &str,
        folder_id: Option<&str>,
    ) -> Result<()> {
        self.require_stage(client_id, stage_id)?;
        StageRepo::set_folder(&self.conn, client_id, stage_id, folder_id)
    }

    fn bulk_delete_stages(&mut self, client_id: &str, stage_ids: &[String]) -> Result<()> {
        // All or nothing: a bad id mid-list must not leave a half-deleted board
        let tx = self.conn.unchecked_transaction()?;
        for stage_id in stage_ids {
            StageRepo::delete(&tx, client_id, stage_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn reorder_tasks(&mut self, ordered_task_ids: &[i64]) -> Result<()> {
        TaskRepo::set_order(&self.conn, ordered_task_ids)
    }

    fn reorder_stages(&mut self, client_id: &str, ordered_stage_ids: &[String]) -> Result<()> {
        StageRepo::set_order(&self.conn, client_id, ordered_stage_ids)
    }

    fn start_stage_timer(
        &mut self,
        client_id: &str,
        stage_id: &str,
        target_working_days: i64,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        StageRepo::start_timer(&self.conn, client_id, stage_id, now, target_working_days)
    }

    fn stop_stage_timer(&mut self, client_id: &str, stage_id: &str) -> Result<()> {
        StageRepo::stop_timer(&self.conn, client_id, stage_id)
    }

    fn cycle_stage_timer_style(&mut self, client_id: &str, stage_id: &str) -> Result<i64> {
        let stage = self.require_stage(client_id, stage_id)?;
        let next = cycle_style(stage.timer_display_style);
        StageRepo::set_timer_style(&self.conn, client_id, stage_id, next)?;
        Ok(next)
    }

    fn paste_stage(&mut self, client_id: &str, payload: &StageSkeleton) -> Result<ClientStage> {
        let sort_order = StageRepo::max_sort_order(&self.conn, client_id)? + 1;
        let stage = ClientStage::new(
            client_id,
            &ClientStage::custom_id(),
            &payload.stage_name,
            payload.stage_icon,
            sort_order,
        );

        let tx = self.conn.unchecked_transaction()?;
        let created = StageRepo::create(&tx, &stage)?;
        for (index, task) in payload.tasks.iter().enumerate() {
            let mut row = StageTask::new(client_id, &created.stage_id, &task.title, index as i64);
            row.completed = task.completed;
            // No completion date on a pasted task: "completed, date unknown"
            TaskRepo::create(&tx, &row)?;
        }
        tx.commit()?;
        log::debug!(
            "pasted stage '{}' with {} tasks onto client {}",
            payload.stage_name,
            payload.tasks.len(),
            client_id
        );
        Ok(created)
    }

    fn save_template(&mut self, name: &str, stages: &[StageSkeleton]) -> Result<()> {
        TemplateRepo::save(&self.conn, name, stages)?;
        Ok(())
    }

    fn list_templates(&mut self) -> Result<Vec<String>> {
        TemplateRepo::list_names(&self.conn)
    }

    fn get_template(&mut self, name: &str) -> Result<Option<BoardTemplate>> {
        TemplateRepo::get_by_name(&self.conn, name)
    }

    fn delete_template(&mut self, name: &str) -> Result<()> {
        TemplateRepo::delete(&self.conn, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateTask;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    #[test]
    fn test_fetch_seeds_defaults_once() {
        let mut store = store();
        let stages = store.fetch_stages("c1").unwrap();
        assert_eq!(stages.len(), 4);
        assert_eq!(stages[0].stage_id, "contact");
        assert_eq!(stages[3].stage_icon, StageIcon::MapPin);

        // Second fetch does not re-seed
        let again = store.fetch_stages("c1").unwrap();
        assert_eq!(again.len(), 4);
    }

    #[test]
    fn test_defaults_survive_deletion() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        store.delete_stage("c1", "contact").unwrap();
        let stages = store.fetch_stages("c1").unwrap();
        assert_eq!(stages.len(), 3);
        assert!(stages.iter().all(|s| s.stage_id != "contact"));
    }

    #[test]
    fn test_emptied_board_stays_empty() {
        let mut store = store();
        let stages = store.fetch_stages("c1").unwrap();
        let ids: Vec<String> = stages.iter().map(|s| s.stage_id.clone()).collect();
        store.bulk_delete_stages("c1", &ids).unwrap();

        assert!(store.fetch_stages("c1").unwrap().is_empty());
        // And again, in case the first fetch marked anything
        assert!(store.fetch_stages("c1").unwrap().is_empty());
    }

    #[test]
    fn test_pasted_first_stage_blocks_default_seeding() {
        let mut store = store();
        let payload = StageSkeleton {
            stage_name: "Imported".into(),
            stage_icon: StageIcon::Send,
            tasks: vec![],
        };
        store.paste_stage("c2", &payload).unwrap();

        let stages = store.fetch_stages("c2").unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].stage_name, "Imported");
    }

    #[test]
    fn test_bulk_delete_stages_is_atomic() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        let ids = vec!["contact".to_string(), "ghost".to_string(), "info".to_string()];
        assert!(store.bulk_delete_stages("c1", &ids).is_err());

        // The bad id rolled back the whole batch
        let stages = store.fetch_stages("c1").unwrap();
        assert_eq!(stages.len(), 4);
    }

    #[test]
    fn test_toggle_sets_and_clears_completed_ts() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        let task = store.add_task("c1", "contact", "Call").unwrap();
        let id = task.id.unwrap();

        store.toggle_task(id).unwrap();
        let stages = store.fetch_stages("c1").unwrap();
        let task = &stages[0].tasks[0];
        assert!(task.completed);
        assert!(task.completed_ts.is_some());

        store.toggle_task(id).unwrap();
        let stages = store.fetch_stages("c1").unwrap();
        let task = &stages[0].tasks[0];
        assert!(!task.completed);
        assert!(task.completed_ts.is_none());
    }

    #[test]
    fn test_completed_date_override_drives_completion() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        let id = store.add_task("c1", "contact", "Call").unwrap().id.unwrap();

        store.update_task_completed_date(id, Some(1_700_000_000)).unwrap();
        let stages = store.fetch_stages("c1").unwrap();
        assert!(stages[0].tasks[0].completed);

        store.update_task_completed_date(id, None).unwrap();
        let stages = store.fetch_stages("c1").unwrap();
        assert!(!stages[0].tasks[0].completed);
    }

    #[test]
    fn test_add_task_to_missing_stage_fails() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        assert!(store.add_task("c1", "ghost", "Call").is_err());
    }

    #[test]
    fn test_bulk_add_appends_in_order() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        store.add_task("c1", "contact", "First").unwrap();
        store
            .add_bulk_tasks("c1", "contact", &["A".into(), "B".into(), "C".into()])
            .unwrap();

        let stages = store.fetch_stages("c1").unwrap();
        let titles: Vec<&str> = stages[0].tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "A", "B", "C"]);
    }

    #[test]
    fn test_cycle_timer_style_wraps() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        store.start_stage_timer("c1", "contact", 10).unwrap();
        assert_eq!(store.cycle_stage_timer_style("c1", "contact").unwrap(), 2);
        assert_eq!(store.cycle_stage_timer_style("c1", "contact").unwrap(), 3);
        assert_eq!(store.cycle_stage_timer_style("c1", "contact").unwrap(), 4);
        assert_eq!(store.cycle_stage_timer_style("c1", "contact").unwrap(), 5);
        assert_eq!(store.cycle_stage_timer_style("c1", "contact").unwrap(), 1);
    }

    #[test]
    fn test_paste_preserves_content_but_not_identity() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        let payload = StageSkeleton {
            stage_name: "Contact".into(),
            stage_icon: StageIcon::Send,
            tasks: vec![
                TemplateTask { title: "Call".into(), completed: true },
                TemplateTask { title: "Email".into(), completed: false },
            ],
        };

        // Paste onto a different client entirely
        store.fetch_stages("c2").unwrap();
        let created = store.paste_stage("c2", &payload).unwrap();
        assert!(created.stage_id.starts_with("custom_"));

        let stages = store.fetch_stages("c2").unwrap();
        let pasted = stages.iter().find(|s| s.stage_id == created.stage_id).unwrap();
        assert_eq!(pasted.stage_name, "Contact");
        assert_eq!(pasted.stage_icon, StageIcon::Send);
        assert!(pasted.started_ts.is_none());
        assert!(pasted.target_working_days.is_none());
        assert_eq!(pasted.tasks.len(), 2);
        assert_eq!(pasted.tasks[0].title, "Call");
        assert!(pasted.tasks[0].completed);
        assert!(!pasted.tasks[1].completed);
        // Appended at the end of the board
        assert_eq!(pasted.sort_order, 4);
    }

    #[test]
    fn test_folder_assignment_round_trip() {
        let mut store = store();
        store.fetch_stages("c1").unwrap();
        store.set_stage_folder("c1", "contact", Some("archive")).unwrap();

        let stages = store.fetch_stages("c1").unwrap();
        assert_eq!(stages[0].folder_id.as_deref(), Some("archive"));

        store.set_stage_folder("c1", "contact", None).unwrap();
        let stages = store.fetch_stages("c1").unwrap();
        assert!(stages[0].folder_id.is_none());

        assert!(store.set_stage_folder("c1", "ghost", Some("x")).is_err());
    }

    #[test]
    fn test_reorder_stages_persists() {
        let mut store = store();
        let stages = store.fetch_stages("c1").unwrap();
        let mut ids: Vec<String> = stages.iter().map(|s| s.stage_id.clone()).collect();
        ids.rotate_left(1);
        store.reorder_stages("c1", &ids).unwrap();

        let stages = store.fetch_stages("c1").unwrap();
        let loaded: Vec<String> = stages.iter().map(|s| s.stage_id.clone()).collect();
        assert_eq!(loaded, ids);
    }
}
