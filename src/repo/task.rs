use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::{StageTask, TaskStyle};

const TASK_COLUMNS: &str = "id, uuid, client_id, stage_id, title, completed, completed_ts,
             sort_order, started_ts, target_working_days, timer_display_style,
             background_color, text_color, is_bold, created_ts, modified_ts";

fn task_from_row(row: &Row) -> rusqlite::Result<StageTask> {
    Ok(StageTask {
        id: Some(row.get(0)?),
        client_id: row.get(2)?,
        stage_id: row.get(3)?,
        title: row.get(4)?,
        completed: row.get::<_, i64>(5)? != 0,
        completed_ts: row.get(6)?,
        sort_order: row.get(7)?,
        started_ts: row.get(8)?,
        target_working_days: row.get(9)?,
        timer_display_style: row.get(10)?,
        style: TaskStyle {
            background_color: row.get(11)?,
            text_color: row.get(12)?,
            is_bold: row.get::<_, i64>(13)? != 0,
        },
        created_ts: row.get(14)?,
        modified_ts: row.get(15)?,
    })
}

/// Task repository for database operations
pub struct TaskRepo;

impl TaskRepo {
    /// All tasks on a client's board, ordered within each stage
    pub fn list_for_client(conn: &Connection, client_id: &str) -> Result<Vec<StageTask>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM client_stage_tasks WHERE client_id = ?1 ORDER BY stage_id, sort_order",
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map([client_id], task_from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<StageTask>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM client_stage_tasks WHERE id = ?1",
            TASK_COLUMNS
        ))?;
        let task = stmt.query_row([id], task_from_row).optional()?;
        Ok(task)
    }

    /// Next append position within a stage
    pub fn next_sort_order(conn: &Connection, client_id: &str, stage_id: &str) -> Result<i64> {
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(sort_order) FROM client_stage_tasks WHERE client_id = ?1 AND stage_id = ?2",
            [client_id, stage_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(-1) + 1)
    }

    /// Insert a task at the given position
    pub fn create(conn: &Connection, task: &StageTask) -> Result<StageTask> {
        let uuid = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO client_stage_tasks (uuid, client_id, stage_id, title, completed,
                    completed_ts, sort_order, timer_display_style, is_bold, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                uuid,
                task.client_id,
                task.stage_id,
                task.title,
                task.completed as i64,
                task.completed_ts,
                task.sort_order,
                task.timer_display_style,
                task.style.is_bold as i64,
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create task: {}", task.title))?;

        let id = conn.last_insert_rowid();
        Ok(StageTask {
            id: Some(id),
            created_ts: now,
            modified_ts: now,
            ..task.clone()
        })
    }

    pub fn set_title(conn: &Connection, id: i64, title: &str) -> Result<()> {
        let updated = conn
            .execute(
                "UPDATE client_stage_tasks SET title = ?1, modified_ts = ?2 WHERE id = ?3",
                rusqlite::params![title, chrono::Utc::now().timestamp(), id],
            )
            .with_context(|| format!("Failed to update task {}", id))?;
        if updated == 0 {
            anyhow::bail!("No task found with id={}", id);
        }
        Ok(())
    }

    /// Set completion state; `completed_ts` must be Some when completing
    /// and None when reopening
    pub fn set_completed(
        conn: &Connection,
        id: i64,
        completed: bool,
        completed_ts: Option<i64>,
    ) -> Result<()> {
        let updated = conn.execute(
            "UPDATE client_stage_tasks SET completed = ?1, completed_ts = ?2, modified_ts = ?3
             WHERE id = ?4",
            rusqlite::params![
                completed as i64,
                completed_ts,
                chrono::Utc::now().timestamp(),
                id
            ],
        )?;
        if updated == 0 {
            anyhow::bail!("No task found with id={}", id);
        }
        Ok(())
    }

    pub fn set_style(conn: &Connection, id: i64, style: &TaskStyle) -> Result<()> {
        let updated = conn.execute(
            "UPDATE client_stage_tasks SET background_color = ?1, text_color = ?2, is_bold = ?3,
                    modified_ts = ?4
             WHERE id = ?5",
            rusqlite::params![
                style.background_color,
                style.text_color,
                style.is_bold as i64,
                chrono::Utc::now().timestamp(),
                id
            ],
        )?;
        if updated == 0 {
            anyhow::bail!("No task found with id={}", id);
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        let deleted = conn.execute("DELETE FROM client_stage_tasks WHERE id = ?1", [id])?;
        if deleted == 0 {
            anyhow::bail!("No task found with id={}", id);
        }
        Ok(())
    }

    pub fn bulk_delete(conn: &Connection, ids: &[i64]) -> Result<usize> {
        let mut deleted = 0;
        for id in ids {
            deleted += conn.execute("DELETE FROM client_stage_tasks WHERE id = ?1", [id])?;
        }
        Ok(deleted)
    }

    /// Persist a stage's task ordering: each task gets its position index
    pub fn set_order(conn: &Connection, ordered_task_ids: &[i64]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        for (index, id) in ordered_task_ids.iter().enumerate() {
            conn.execute(
                "UPDATE client_stage_tasks SET sort_order = ?1, modified_ts = ?2 WHERE id = ?3",
                rusqlite::params![index as i64, now, id],
            )?;
        }
        Ok(())
    }

    pub fn start_timer(
        conn: &Connection,
        id: i64,
        started_ts: i64,
        target_working_days: i64,
    ) -> Result<()> {
        let updated = conn.execute(
            "UPDATE client_stage_tasks SET started_ts = ?1, target_working_days = ?2,
                    modified_ts = ?3
             WHERE id = ?4",
            rusqlite::params![
                started_ts,
                target_working_days,
                chrono::Utc::now().timestamp(),
                id
            ],
        )?;
        if updated == 0 {
            anyhow::bail!("No task found with id={}", id);
        }
        Ok(())
    }

    pub fn stop_timer(conn: &Connection, id: i64) -> Result<()> {
        let updated = conn.execute(
            "UPDATE client_stage_tasks SET started_ts = NULL, target_working_days = NULL,
                    modified_ts = ?1
             WHERE id = ?2",
            rusqlite::params![chrono::Utc::now().timestamp(), id],
        )?;
        if updated == 0 {
            anyhow::bail!("No task found with id={}", id);
        }
        Ok(())
    }

    pub fn set_timer_style(conn: &Connection, id: i64, style: i64) -> Result<()> {
        conn.execute(
            "UPDATE client_stage_tasks SET timer_display_style = ?1, modified_ts = ?2 WHERE id = ?3",
            rusqlite::params![style, chrono::Utc::now().timestamp(), id],
        )?;
        Ok(())
    }
}
