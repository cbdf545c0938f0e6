use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{BoardTemplate, StageIcon, StageSkeleton, TemplateTask};

/// Template repository: named collections of stage skeletons
pub struct TemplateRepo;

impl TemplateRepo {
    /// Save a template, replacing any existing one with the same name
    pub fn save(conn: &Connection, name: &str, stages: &[StageSkeleton]) -> Result<BoardTemplate> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.unchecked_transaction()?;

        // Replace wholesale rather than diffing stage rows. Children are
        // cleared by hand; the bundled sqlite may run without foreign_keys on.
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM stage_templates WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(existing_id) = existing {
            tx.execute(
                "DELETE FROM template_tasks WHERE template_stage_id IN
                     (SELECT id FROM template_stages WHERE template_id = ?1)",
                [existing_id],
            )?;
            tx.execute(
                "DELETE FROM template_stages WHERE template_id = ?1",
                [existing_id],
            )?;
            tx.execute("DELETE FROM stage_templates WHERE id = ?1", [existing_id])?;
        }
        tx.execute(
            "INSERT INTO stage_templates (name, created_ts) VALUES (?1, ?2)",
            rusqlite::params![name, now],
        )
        .with_context(|| format!("Failed to save template: {}", name))?;
        let template_id = tx.last_insert_rowid();

        for (stage_index, stage) in stages.iter().enumerate() {
            tx.execute(
                "INSERT INTO template_stages (template_id, stage_name, stage_icon, sort_order)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    template_id,
                    stage.stage_name,
                    stage.stage_icon.as_str(),
                    stage_index as i64
                ],
            )?;
            let stage_row_id = tx.last_insert_rowid();
            for (task_index, task) in stage.tasks.iter().enumerate() {
                tx.execute(
                    "INSERT INTO template_tasks (template_stage_id, title, completed, sort_order)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![
                        stage_row_id,
                        task.title,
                        task.completed as i64,
                        task_index as i64
                    ],
                )?;
            }
        }
        tx.commit()?;

        Ok(BoardTemplate {
            id: Some(template_id),
            name: name.to_string(),
            stages: stages.to_vec(),
            created_ts: now,
        })
    }

    /// Template names, newest first
    pub fn list_names(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt =
            conn.prepare("SELECT name FROM stage_templates ORDER BY created_ts DESC, name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    /// Load a template with all stage and task skeletons, in saved order
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<BoardTemplate>> {
        let header = conn
            .query_row(
                "SELECT id, created_ts FROM stage_templates WHERE name = ?1",
                [name],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        let (template_id, created_ts) = match header {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut stage_stmt = conn.prepare(
            "SELECT id, stage_name, stage_icon FROM template_stages
             WHERE template_id = ?1 ORDER BY sort_order",
        )?;
        let stage_rows = stage_stmt.query_map([template_id], |row| {
            let icon: Option<String> = row.get(2)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                StageIcon::parse(icon.as_deref()),
            ))
        })?;

        let mut stages = Vec::new();
        for stage_row in stage_rows {
            let (stage_row_id, stage_name, stage_icon) = stage_row?;
            let mut task_stmt = conn.prepare(
                "SELECT title, completed FROM template_tasks
                 WHERE template_stage_id = ?1 ORDER BY sort_order",
            )?;
            let task_rows = task_stmt.query_map([stage_row_id], |row| {
                Ok(TemplateTask {
                    title: row.get(0)?,
                    completed: row.get::<_, i64>(1)? != 0,
                })
            })?;
            let mut tasks = Vec::new();
            for task in task_rows {
                tasks.push(task?);
            }
            stages.push(StageSkeleton {
                stage_name,
                stage_icon,
                tasks,
            });
        }

        Ok(Some(BoardTemplate {
            id: Some(template_id),
            name: name.to_string(),
            stages,
            created_ts,
        }))
    }

    pub fn delete(conn: &Connection, name: &str) -> Result<()> {
        let template_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM stage_templates WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        let template_id = match template_id {
            Some(id) => id,
            None => anyhow::bail!("No template found with name '{}'", name),
        };

        // Cascade by hand; the bundled sqlite may run without foreign_keys on
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM template_tasks WHERE template_stage_id IN
                 (SELECT id FROM template_stages WHERE template_id = ?1)",
            [template_id],
        )?;
        tx.execute(
            "DELETE FROM template_stages WHERE template_id = ?1",
            [template_id],
        )?;
        tx.execute("DELETE FROM stage_templates WHERE id = ?1", [template_id])?;
        tx.commit()?;
        Ok(())
    }
}
