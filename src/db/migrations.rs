use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 4;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        // Create schema_version table to track migrations
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        // Get current version
        let current_version: u32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        // Apply migrations up to current version
        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            // Execute migration in a transaction
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
        }
        Ok(())
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

type Migration = fn(&rusqlite::Transaction) -> Result<()>;

fn get_migrations() -> HashMap<u32, Migration> {
    let mut migrations: HashMap<u32, Migration> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations.insert(3, migration_v3);
    migrations.insert(4, migration_v4);
    migrations
}

/// v1: client stage boards and their tasks
fn migration_v1(tx: &rusqlite::Transaction) -> Result<()> {
    tx.execute(
        "CREATE TABLE client_stages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            client_id TEXT NOT NULL,
            stage_id TEXT NOT NULL,
            stage_name TEXT NOT NULL,
            stage_icon TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            folder_id TEXT,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL,
            UNIQUE(client_id, stage_id)
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE client_stage_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            client_id TEXT NOT NULL,
            stage_id TEXT NOT NULL,
            title TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            completed_ts INTEGER,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX idx_stages_client ON client_stages(client_id, sort_order)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_tasks_stage ON client_stage_tasks(client_id, stage_id, sort_order)",
        [],
    )?;

    Ok(())
}

/// v2: deadline timers and per-task styling
fn migration_v2(tx: &rusqlite::Transaction) -> Result<()> {
    for table in ["client_stages", "client_stage_tasks"] {
        tx.execute(
            &format!("ALTER TABLE {} ADD COLUMN started_ts INTEGER", table),
            [],
        )?;
        tx.execute(
            &format!("ALTER TABLE {} ADD COLUMN target_working_days INTEGER", table),
            [],
        )?;
        tx.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN timer_display_style INTEGER NOT NULL DEFAULT 1",
                table
            ),
            [],
        )?;
    }

    tx.execute(
        "ALTER TABLE client_stage_tasks ADD COLUMN background_color TEXT",
        [],
    )?;
    tx.execute(
        "ALTER TABLE client_stage_tasks ADD COLUMN text_color TEXT",
        [],
    )?;
    tx.execute(
        "ALTER TABLE client_stage_tasks ADD COLUMN is_bold INTEGER NOT NULL DEFAULT 0",
        [],
    )?;

    Ok(())
}

/// v3: saved stage/board templates
fn migration_v3(tx: &rusqlite::Transaction) -> Result<()> {
    tx.execute(
        "CREATE TABLE stage_templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE template_stages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            template_id INTEGER NOT NULL REFERENCES stage_templates(id) ON DELETE CASCADE,
            stage_name TEXT NOT NULL,
            stage_icon TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE template_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            template_stage_id INTEGER NOT NULL REFERENCES template_stages(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    Ok(())
}

/// v4: record which clients have had their default stages seeded, so an
/// emptied board is not re-seeded on the next fetch
fn migration_v4(tx: &rusqlite::Transaction) -> Result<()> {
    tx.execute(
        "CREATE TABLE seeded_clients (
            client_id TEXT PRIMARY KEY,
            seeded_ts INTEGER NOT NULL
        )",
        [],
    )?;

    // Clients that already have stages were seeded under the old scheme
    tx.execute(
        "INSERT INTO seeded_clients (client_id, seeded_ts)
         SELECT DISTINCT client_id, strftime('%s', 'now') FROM client_stages",
        [],
    )?;

    Ok(())
}
