//! Tracking record storage.
//!
//! One row per (project, item). Rows are created lazily the first time any
//! actor touches an item and are never deleted; `pending` with no row is
//! the implicit default state.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::registry::{parse_opt_ts, parse_ts};

/// Lifecycle status of a tracking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Pending,
    InProgress,
    Submitted,
    Approved,
    Rejected,
}

impl TrackingStatus {
    /// The database representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a status from its database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracking record row.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingRow {
    pub project_id: i64,
    pub item_id: i64,
    pub status: TrackingStatus,
    pub annotated_by: Option<String>,
    pub annotated_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingRow {
    /// The current unexpired lock holder, if any.
    ///
    /// A lock older than `timeout` is treated as free; expiry is evaluated
    /// at read time, there is no background sweep.
    #[must_use]
    pub fn lock_holder(&self, now: DateTime<Utc>, timeout: Duration) -> Option<&str> {
        let holder = self.locked_by.as_deref()?;
        match self.locked_at {
            Some(at) if now - at <= timeout => Some(holder),
            // No acquisition time recorded; treat as stale.
            _ => None,
        }
    }

    /// Whether the row carries lock fields that are past expiry.
    #[must_use]
    pub fn has_expired_lock(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.locked_by.is_some() && self.lock_holder(now, timeout).is_none()
    }
}

/// Per-status counts for a project.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCounts {
    pub tracked: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub submitted: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Per-annotator rollup used by the completion aggregator.
#[derive(Debug, Clone)]
pub struct AnnotatorRollup {
    pub username: String,
    pub completed: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Get the tracking record for an item, if one exists.
pub fn get(conn: &Connection, project_id: i64, item_id: i64) -> Result<Option<TrackingRow>> {
    conn.query_row(
        &format!("{SELECT_COLS} WHERE project_id = ? AND item_id = ?"),
        params![project_id, item_id],
        from_row,
    )
    .optional()
    .context("Failed to query tracking record")
}

/// Get the tracking record for an item, creating a pending row if absent.
pub fn get_or_create(
    conn: &Connection,
    project_id: i64,
    item_id: i64,
    now: DateTime<Utc>,
) -> Result<TrackingRow> {
    conn.execute(
        "INSERT OR IGNORE INTO tracking_records (project_id, item_id, created_at, updated_at)
         VALUES (?, ?, ?, ?)",
        params![project_id, item_id, now.to_rfc3339(), now.to_rfc3339()],
    )
    .context("Failed to insert tracking record")?;

    get(conn, project_id, item_id)?.context("Tracking record missing after get_or_create")
}

/// Move a record to `in_progress` for `user`.
pub fn set_in_progress(
    conn: &Connection,
    project_id: i64,
    item_id: i64,
    user: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE tracking_records SET
            status = 'in_progress',
            annotated_by = ?,
            updated_at = ?
         WHERE project_id = ? AND item_id = ?",
        params![user, now.to_rfc3339(), project_id, item_id],
    )
    .context("Failed to mark record in progress")?;
    Ok(())
}

/// Move a record to `submitted` for `user`, releasing any lock.
pub fn set_submitted(
    conn: &Connection,
    project_id: i64,
    item_id: i64,
    user: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE tracking_records SET
            status = 'submitted',
            annotated_by = ?,
            annotated_at = ?,
            locked_by = NULL,
            locked_at = NULL,
            updated_at = ?
         WHERE project_id = ? AND item_id = ?",
        params![user, now.to_rfc3339(), now.to_rfc3339(), project_id, item_id],
    )
    .context("Failed to mark record submitted")?;
    Ok(())
}

/// Record a review decision (`approved` or `rejected`) with audit fields.
pub fn set_reviewed(
    conn: &Connection,
    project_id: i64,
    item_id: i64,
    status: TrackingStatus,
    reviewer: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    debug_assert!(matches!(
        status,
        TrackingStatus::Approved | TrackingStatus::Rejected
    ));
    conn.execute(
        "UPDATE tracking_records SET
            status = ?,
            reviewed_by = ?,
            reviewed_at = ?,
            review_notes = ?,
            updated_at = ?
         WHERE project_id = ? AND item_id = ?",
        params![
            status.as_str(),
            reviewer,
            now.to_rfc3339(),
            notes,
            now.to_rfc3339(),
            project_id,
            item_id
        ],
    )
    .context("Failed to record review decision")?;
    Ok(())
}

/// Set the lock fields on a record.
pub fn set_lock(
    conn: &Connection,
    project_id: i64,
    item_id: i64,
    user: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE tracking_records SET
            locked_by = ?,
            locked_at = ?,
            updated_at = ?
         WHERE project_id = ? AND item_id = ?",
        params![user, now.to_rfc3339(), now.to_rfc3339(), project_id, item_id],
    )
    .context("Failed to set lock")?;
    Ok(())
}

/// Clear the lock fields on a record.
pub fn clear_lock(conn: &Connection, project_id: i64, item_id: i64, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE tracking_records SET
            locked_by = NULL,
            locked_at = NULL,
            updated_at = ?
         WHERE project_id = ? AND item_id = ?",
        params![now.to_rfc3339(), project_id, item_id],
    )
    .context("Failed to clear lock")?;
    Ok(())
}

/// List all tracking records for a project, ordered by item id.
pub fn list_for_project(conn: &Connection, project_id: i64) -> Result<Vec<TrackingRow>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLS} WHERE project_id = ? ORDER BY item_id"))
        .context("Failed to prepare tracking list query")?;
    let rows = stmt
        .query_map(params![project_id], from_row)
        .context("Failed to execute tracking list query")?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.context("Failed to read tracking row")?);
    }
    Ok(results)
}

/// Count records by status for a project.
pub fn status_counts(conn: &Connection, project_id: i64) -> Result<StatusCounts> {
    let mut stmt = conn
        .prepare(
            "SELECT status, COUNT(*) FROM tracking_records
             WHERE project_id = ? GROUP BY status",
        )
        .context("Failed to prepare status counts query")?;
    let rows = stmt
        .query_map(params![project_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .context("Failed to execute status counts query")?;

    let mut counts = StatusCounts::default();
    for row in rows {
        let (status, count) = row.context("Failed to read status count")?;
        counts.tracked += count;
        match TrackingStatus::parse(&status) {
            Some(TrackingStatus::Pending) => counts.pending = count,
            Some(TrackingStatus::InProgress) => counts.in_progress = count,
            Some(TrackingStatus::Submitted) => counts.submitted = count,
            Some(TrackingStatus::Approved) => counts.approved = count,
            Some(TrackingStatus::Rejected) => counts.rejected = count,
            None => {}
        }
    }
    Ok(counts)
}

/// Roll up tracking records by annotator.
///
/// `completed` counts records the annotator has carried past `in_progress`
/// (submitted, approved, or rejected).
pub fn annotator_rollup(conn: &Connection, project_id: i64) -> Result<Vec<AnnotatorRollup>> {
    let mut stmt = conn
        .prepare(
            "SELECT annotated_by,
                    COUNT(CASE WHEN status IN ('submitted', 'approved', 'rejected') THEN 1 END),
                    COUNT(CASE WHEN status = 'approved' THEN 1 END),
                    COUNT(CASE WHEN status = 'rejected' THEN 1 END)
             FROM tracking_records
             WHERE project_id = ? AND annotated_by IS NOT NULL
             GROUP BY annotated_by
             ORDER BY annotated_by",
        )
        .context("Failed to prepare annotator rollup query")?;
    let rows = stmt
        .query_map(params![project_id], |row| {
            Ok(AnnotatorRollup {
                username: row.get(0)?,
                completed: row.get(1)?,
                approved: row.get(2)?,
                rejected: row.get(3)?,
            })
        })
        .context("Failed to execute annotator rollup query")?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.context("Failed to read annotator rollup row")?);
    }
    Ok(results)
}

const SELECT_COLS: &str = "SELECT project_id, item_id, status, annotated_by, annotated_at,
        reviewed_by, reviewed_at, review_notes, locked_by, locked_at, created_at, updated_at
 FROM tracking_records";

fn from_row(row: &Row<'_>) -> rusqlite::Result<TrackingRow> {
    let status: String = row.get(2)?;
    let status = TrackingStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown tracking status: {status}").into(),
        )
    })?;
    Ok(TrackingRow {
        project_id: row.get(0)?,
        item_id: row.get(1)?,
        status,
        annotated_by: row.get(3)?,
        annotated_at: parse_opt_ts(row, 4)?,
        reviewed_by: row.get(5)?,
        reviewed_at: parse_opt_ts(row, 6)?,
        review_notes: row.get(7)?,
        locked_by: row.get(8)?,
        locked_at: parse_opt_ts(row, 9)?,
        created_at: parse_ts(row, 10)?,
        updated_at: parse_ts(row, 11)?,
    })
}
