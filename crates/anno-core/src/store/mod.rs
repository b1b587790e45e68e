//! Durable storage for tracking and approval records.
//!
//! A single SQLite database holds the registry tables (projects, items,
//! members) and the two workflow tables (tracking_records,
//! approval_records). Tracking and approval state is the single source of
//! truth; nothing here is derived from a secondary store.

#![allow(clippy::missing_errors_doc)]

pub mod approvals;
pub mod registry;
pub mod tracking;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Handle to the workflow database.
pub struct TrackingDb {
    conn: Connection,
}

impl TrackingDb {
    /// Open or create the database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create parent directories: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        Self::configure(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        Ok(())
    }

    /// Initialize the database schema.
    ///
    /// Creates all tables and indexes if they don't exist.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    /// Begin an immediate (write-locking) transaction.
    ///
    /// All mutations of a tracking record run read-modify-write inside one
    /// of these, so two concurrent writers on the same record serialize at
    /// the database instead of losing updates.
    pub fn immediate_tx(&self) -> Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .context("Failed to begin immediate transaction")
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }
}

const SCHEMA_SQL: &str = r"
-- PROJECTS
CREATE TABLE IF NOT EXISTS projects (
    project_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at TEXT NOT NULL
);

-- ITEMS
CREATE TABLE IF NOT EXISTS items (
    item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(project_id),
    text TEXT,
    audio_minutes REAL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_project ON items(project_id);

-- MEMBERS
CREATE TABLE IF NOT EXISTS members (
    project_id INTEGER NOT NULL REFERENCES projects(project_id),
    username TEXT NOT NULL,
    role TEXT NOT NULL
        CHECK (role IN ('annotator', 'first_tier_reviewer', 'project_manager', 'project_admin')),
    added_at TEXT NOT NULL,
    PRIMARY KEY (project_id, username)
);

-- TRACKING RECORDS
-- One row per (project, item); the authoritative lifecycle state.
CREATE TABLE IF NOT EXISTS tracking_records (
    project_id INTEGER NOT NULL REFERENCES projects(project_id),
    item_id INTEGER NOT NULL REFERENCES items(item_id),
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'in_progress', 'submitted', 'approved', 'rejected')),
    annotated_by TEXT,
    annotated_at TEXT,
    reviewed_by TEXT,
    reviewed_at TEXT,
    review_notes TEXT,
    locked_by TEXT,
    locked_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (project_id, item_id)
);

CREATE INDEX IF NOT EXISTS idx_tracking_project_status ON tracking_records(project_id, status);
CREATE INDEX IF NOT EXISTS idx_tracking_annotated_by ON tracking_records(annotated_by);
CREATE INDEX IF NOT EXISTS idx_tracking_reviewed_by ON tracking_records(reviewed_by);
CREATE INDEX IF NOT EXISTS idx_tracking_locked_by ON tracking_records(locked_by);

-- APPROVAL RECORDS
-- One row per (item, reviewer); independent of the tracking record so each
-- reviewer tier keeps its own decision.
CREATE TABLE IF NOT EXISTS approval_records (
    project_id INTEGER NOT NULL REFERENCES projects(project_id),
    item_id INTEGER NOT NULL REFERENCES items(item_id),
    reviewer TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    reviewed_at TEXT,
    review_notes TEXT,
    PRIMARY KEY (item_id, reviewer)
);

CREATE INDEX IF NOT EXISTS idx_approvals_project_reviewer ON approval_records(project_id, reviewer, status);
CREATE INDEX IF NOT EXISTS idx_approvals_item_status ON approval_records(item_id, status);
";

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("anno.db");

        let db = TrackingDb::open(&db_path).unwrap();
        db.init_schema().unwrap();

        // Schema init is idempotent.
        db.init_schema().unwrap();
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("deeper").join("anno.db");

        let db = TrackingDb::open(&db_path).unwrap();
        db.init_schema().unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_immediate_tx_commits() {
        let db = TrackingDb::open_in_memory().unwrap();
        db.init_schema().unwrap();

        let tx = db.immediate_tx().unwrap();
        tx.execute(
            "INSERT INTO projects (name, created_at) VALUES (?, ?)",
            rusqlite::params!["p1", "2026-01-01T00:00:00Z"],
        )
        .unwrap();
        tx.commit().unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_member_role_check_constraint() {
        let db = TrackingDb::open_in_memory().unwrap();
        db.init_schema().unwrap();

        db.conn()
            .execute(
                "INSERT INTO projects (name, created_at) VALUES ('p', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let result = db.conn().execute(
            "INSERT INTO members (project_id, username, role, added_at)
             VALUES (1, 'eve', 'superhero', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
