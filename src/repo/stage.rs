use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::{ClientStage, StageIcon};

const STAGE_COLUMNS: &str = "id, uuid, client_id, stage_id, stage_name, stage_icon, sort_order,
             folder_id, started_ts, target_working_days, timer_display_style,
             created_ts, modified_ts";

fn stage_from_row(row: &Row) -> rusqlite::Result<ClientStage> {
    let icon: Option<String> = row.get(5)?;
    Ok(ClientStage {
        id: Some(row.get(0)?),
        client_id: row.get(2)?,
        stage_id: row.get(3)?,
        stage_name: row.get(4)?,
        stage_icon: StageIcon::parse(icon.as_deref()),
        sort_order: row.get(6)?,
        folder_id: row.get(7)?,
        tasks: Vec::new(),
        started_ts: row.get(8)?,
        target_working_days: row.get(9)?,
        timer_display_style: row.get(10)?,
        created_ts: row.get(11)?,
        modified_ts: row.get(12)?,
    })
}

/// Stage repository for database operations
pub struct StageRepo;

impl StageRepo {
    /// List a client's stages in board order (tasks not attached)
    pub fn list_for_client(conn: &Connection, client_id: &str) -> Result<Vec<ClientStage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM client_stages WHERE client_id = ?1 ORDER BY sort_order",
            STAGE_COLUMNS
        ))?;
        let rows = stmt.query_map([client_id], stage_from_row)?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }
        Ok(stages)
    }

    /// Get one stage by its board identifier
    pub fn get(conn: &Connection, client_id: &str, stage_id: &str) -> Result<Option<ClientStage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM client_stages WHERE client_id = ?1 AND stage_id = ?2",
            STAGE_COLUMNS
        ))?;
        let stage = stmt
            .query_row([client_id, stage_id], stage_from_row)
            .optional()?;
        Ok(stage)
    }

    /// Insert a stage. `sort_order` is the caller's responsibility; appends
    /// should pass max_sort_order + 1.
    pub fn create(conn: &Connection, stage: &ClientStage) -> Result<ClientStage> {
        let uuid = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO client_stages (uuid, client_id, stage_id, stage_name, stage_icon,
                    sort_order, folder_id, timer_display_style, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                uuid,
                stage.client_id,
                stage.stage_id,
                stage.stage_name,
                stage.stage_icon.as_str(),
                stage.sort_order,
                stage.folder_id,
                stage.timer_display_style,
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create stage: {}", stage.stage_name))?;

        let id = conn.last_insert_rowid();
        Ok(ClientStage {
            id: Some(id),
            created_ts: now,
            modified_ts: now,
            ..stage.clone()
        })
    }

    /// Highest sort_order on the client's board, or -1 when empty
    pub fn max_sort_order(conn: &Connection, client_id: &str) -> Result<i64> {
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(sort_order) FROM client_stages WHERE client_id = ?1",
            [client_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(-1))
    }

    /// Update a stage's display name and icon
    pub fn update_name_icon(
        conn: &Connection,
        client_id: &str,
        stage_id: &str,
        stage_name: &str,
        stage_icon: StageIcon,
    ) -> Result<()> {
        let updated = conn
            .execute(
                "UPDATE client_stages SET stage_name = ?1, stage_icon = ?2, modified_ts = ?3
                 WHERE client_id = ?4 AND stage_id = ?5",
                rusqlite::params![
                    stage_name,
                    stage_icon.as_str(),
                    chrono::Utc::now().timestamp(),
                    client_id,
                    stage_id
                ],
            )
            .with_context(|| format!("Failed to update stage {}", stage_id))?;
        if updated == 0 {
            anyhow::bail!("No stage found with id={}", stage_id);
        }
        Ok(())
    }

    /// Delete a stage and everything in it
    pub fn delete(conn: &Connection, client_id: &str, stage_id: &str) -> Result<()> {
        // Tasks first, then the stage itself
        conn.execute(
            "DELETE FROM client_stage_tasks WHERE client_id = ?1 AND stage_id = ?2",
            [client_id, stage_id],
        )?;
        let deleted = conn
            .execute(
                "DELETE FROM client_stages WHERE client_id = ?1 AND stage_id = ?2",
                [client_id, stage_id],
            )
            .with_context(|| format!("Failed to delete stage {}", stage_id))?;
        if deleted == 0 {
            anyhow::bail!("No stage found with id={}", stage_id);
        }
        Ok(())
    }

    /// Persist a full board ordering: each stage gets its position index
    /// as the new sort_order
    pub fn set_order(conn: &Connection, client_id: &str, ordered_stage_ids: &[String]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        for (index, stage_id) in ordered_stage_ids.iter().enumerate() {
            conn.execute(
                "UPDATE client_stages SET sort_order = ?1, modified_ts = ?2
                 WHERE client_id = ?3 AND stage_id = ?4",
                rusqlite::params![index as i64, now, client_id, stage_id],
            )?;
        }
        Ok(())
    }

    /// Start the stage deadline timer: both fields set together
    pub fn start_timer(
        conn: &Connection,
        client_id: &str,
        stage_id: &str,
        started_ts: i64,
        target_working_days: i64,
    ) -> Result<()> {
        let updated = conn.execute(
            "UPDATE client_stages SET started_ts = ?1, target_working_days = ?2, modified_ts = ?3
             WHERE client_id = ?4 AND stage_id = ?5",
            rusqlite::params![
                started_ts,
                target_working_days,
                chrono::Utc::now().timestamp(),
                client_id,
                stage_id
            ],
        )?;
        if updated == 0 {
            anyhow::bail!("No stage found with id={}", stage_id);
        }
        Ok(())
    }

    /// Stop the stage deadline timer: both fields cleared together
    pub fn stop_timer(conn: &Connection, client_id: &str, stage_id: &str) -> Result<()> {
        let updated = conn.execute(
            "UPDATE client_stages SET started_ts = NULL, target_working_days = NULL, modified_ts = ?1
             WHERE client_id = ?2 AND stage_id = ?3",
            rusqlite::params![chrono::Utc::now().timestamp(), client_id, stage_id],
        )?;
        if updated == 0 {
            anyhow::bail!("No stage found with id={}", stage_id);
        }
        Ok(())
    }

    pub fn set_timer_style(
        conn: &Connection,
        client_id: &str,
        stage_id: &str,
        style: i64,
    ) -> Result<()> {
        conn.execute(
            "UPDATE client_stages SET timer_display_style = ?1, modified_ts = ?2
             WHERE client_id = ?3 AND stage_id = ?4",
            rusqlite::params![style, chrono::Utc::now().timestamp(), client_id, stage_id],
        )?;
        Ok(())
    }

    /// Move a stage into a folder (or unfile it with None)
    pub fn set_folder(
        conn: &Connection,
        client_id: &str,
        stage_id: &str,
        folder_id: Option<&str>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE client_stages SET folder_id = ?1, modified_ts = ?2
             WHERE client_id = ?3 AND stage_id = ?4",
            rusqlite::params![folder_id, chrono::Utc::now().timestamp(), client_id, stage_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    #[test]
    fn test_create_and_list_ordered() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let b = ClientStage::new("c1", "b", "Second", StageIcon::Send, 1);
        let a = ClientStage::new("c1", "a", "First", StageIcon::Phone, 0);
        StageRepo::create(&conn, &b).unwrap();
        StageRepo::create(&conn, &a).unwrap();

        let stages = StageRepo::list_for_client(&conn, "c1").unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].stage_id, "a");
        assert_eq!(stages[1].stage_id, "b");
        assert!(StageRepo::list_for_client(&conn, "other").unwrap().is_empty());
    }

    #[test]
    fn test_max_sort_order() {
        let conn = DbConnection::connect_in_memory().unwrap();
        assert_eq!(StageRepo::max_sort_order(&conn, "c1").unwrap(), -1);
        StageRepo::create(&conn, &ClientStage::new("c1", "a", "A", StageIcon::Phone, 4)).unwrap();
        assert_eq!(StageRepo::max_sort_order(&conn, "c1").unwrap(), 4);
    }

    #[test]
    fn test_timer_fields_set_and_cleared_together() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::create(&conn, &ClientStage::new("c1", "a", "A", StageIcon::Phone, 0)).unwrap();

        StageRepo::start_timer(&conn, "c1", "a", 1_700_000_000, 10).unwrap();
        let stage = StageRepo::get(&conn, "c1", "a").unwrap().unwrap();
        assert_eq!(stage.started_ts, Some(1_700_000_000));
        assert_eq!(stage.target_working_days, Some(10));

        StageRepo::stop_timer(&conn, "c1", "a").unwrap();
        let stage = StageRepo::get(&conn, "c1", "a").unwrap().unwrap();
        assert!(stage.started_ts.is_none());
        assert!(stage.target_working_days.is_none());
    }

    #[test]
    fn test_delete_missing_stage_errors() {
        let conn = DbConnection::connect_in_memory().unwrap();
        assert!(StageRepo::delete(&conn, "c1", "ghost").is_err());
    }
}
