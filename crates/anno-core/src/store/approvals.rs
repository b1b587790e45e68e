//! Approval record storage.
//!
//! One row per (item, reviewer), independent of the tracking record.
//! A reviewer's row is upserted in place when they re-review; another
//! tier's row is never touched.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::registry::parse_opt_ts;

/// Decision state of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// The database representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a status from its database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An approval record row.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRow {
    pub project_id: i64,
    pub item_id: i64,
    pub reviewer: String,
    pub status: ApprovalStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

/// Per-reviewer rollup used by the completion aggregator.
#[derive(Debug, Clone)]
pub struct ReviewerRollup {
    pub username: String,
    pub reviewed: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Get a reviewer's approval record for an item, if one exists.
pub fn get(conn: &Connection, item_id: i64, reviewer: &str) -> Result<Option<ApprovalRow>> {
    conn.query_row(
        &format!("{SELECT_COLS} WHERE item_id = ? AND reviewer = ?"),
        params![item_id, reviewer],
        from_row,
    )
    .optional()
    .context("Failed to query approval record")
}

/// Record a reviewer's decision for an item, updating their row in place.
pub fn upsert_decision(
    conn: &Connection,
    project_id: i64,
    item_id: i64,
    reviewer: &str,
    status: ApprovalStatus,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO approval_records (project_id, item_id, reviewer, status, reviewed_at, review_notes)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (item_id, reviewer) DO UPDATE SET
             status = excluded.status,
             reviewed_at = excluded.reviewed_at,
             review_notes = excluded.review_notes",
        params![
            project_id,
            item_id,
            reviewer,
            status.as_str(),
            now.to_rfc3339(),
            notes
        ],
    )
    .context("Failed to upsert approval record")?;
    Ok(())
}

/// List approval records for an item, ordered by reviewer.
pub fn list_for_item(conn: &Connection, item_id: i64) -> Result<Vec<ApprovalRow>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLS} WHERE item_id = ? ORDER BY reviewer"))
        .context("Failed to prepare approval list query")?;
    let rows = stmt
        .query_map(params![item_id], from_row)
        .context("Failed to execute approval list query")?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.context("Failed to read approval row")?);
    }
    Ok(results)
}

/// Whether a first-tier reviewer has approved this item.
///
/// Gate for the final tier: a project admin may only act once this holds.
pub fn has_first_tier_approval(conn: &Connection, item_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM approval_records a
            JOIN members m ON m.project_id = a.project_id AND m.username = a.reviewer
            WHERE a.item_id = ? AND a.status = 'approved' AND m.role = 'first_tier_reviewer'
         )",
        params![item_id],
        |row| row.get(0),
    )
    .context("Failed to query first-tier approval")
}

/// Roll up approval records by reviewer for a project.
pub fn reviewer_rollup(conn: &Connection, project_id: i64) -> Result<Vec<ReviewerRollup>> {
    let mut stmt = conn
        .prepare(
            "SELECT reviewer,
                    COUNT(CASE WHEN status IN ('approved', 'rejected') THEN 1 END),
                    COUNT(CASE WHEN status = 'approved' THEN 1 END),
                    COUNT(CASE WHEN status = 'rejected' THEN 1 END)
             FROM approval_records
             WHERE project_id = ?
             GROUP BY reviewer
             ORDER BY reviewer",
        )
        .context("Failed to prepare reviewer rollup query")?;
    let rows = stmt
        .query_map(params![project_id], |row| {
            Ok(ReviewerRollup {
                username: row.get(0)?,
                reviewed: row.get(1)?,
                approved: row.get(2)?,
                rejected: row.get(3)?,
            })
        })
        .context("Failed to execute reviewer rollup query")?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.context("Failed to read reviewer rollup row")?);
    }
    Ok(results)
}

/// Count distinct items in a project carrying a final-tier approval.
pub fn final_tier_approved_items(conn: &Connection, project_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(DISTINCT a.item_id) FROM approval_records a
         JOIN members m ON m.project_id = a.project_id AND m.username = a.reviewer
         WHERE a.project_id = ? AND a.status = 'approved' AND m.role = 'project_admin'",
        params![project_id],
        |row| row.get(0),
    )
    .context("Failed to count final-tier approvals")
}

const SELECT_COLS: &str = "SELECT project_id, item_id, reviewer, status, reviewed_at, review_notes
 FROM approval_records";

fn from_row(row: &Row<'_>) -> rusqlite::Result<ApprovalRow> {
    let status: String = row.get(3)?;
    let status = ApprovalStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown approval status: {status}").into(),
        )
    })?;
    Ok(ApprovalRow {
        project_id: row.get(0)?,
        item_id: row.get(1)?,
        reviewer: row.get(2)?,
        status,
        reviewed_at: parse_opt_ts(row, 4)?,
        review_notes: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::registry::{self, Role};
    use crate::store::TrackingDb;

    fn setup() -> (TrackingDb, i64, i64) {
        let db = TrackingDb::open_in_memory().unwrap();
        db.init_schema().unwrap();
        let project = registry::create_project(db.conn(), "p", None, Utc::now()).unwrap();
        let item = registry::add_item(db.conn(), project, None, None, Utc::now()).unwrap();
        (db, project, item)
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let (db, project, item) = setup();
        let now = Utc::now();

        upsert_decision(db.conn(), project, item, "rev", ApprovalStatus::Approved, None, now)
            .unwrap();
        upsert_decision(
            db.conn(),
            project,
            item,
            "rev",
            ApprovalStatus::Rejected,
            Some("changed my mind"),
            now,
        )
        .unwrap();

        let records = list_for_item(db.conn(), item).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ApprovalStatus::Rejected);
        assert_eq!(records[0].review_notes.as_deref(), Some("changed my mind"));
    }

    #[test]
    fn test_independent_records_per_reviewer() {
        let (db, project, item) = setup();
        let now = Utc::now();

        upsert_decision(db.conn(), project, item, "rev1", ApprovalStatus::Approved, None, now)
            .unwrap();
        upsert_decision(db.conn(), project, item, "rev2", ApprovalStatus::Rejected, None, now)
            .unwrap();

        let records = list_for_item(db.conn(), item).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reviewer, "rev1");
        assert_eq!(records[1].reviewer, "rev2");
    }

    #[test]
    fn test_first_tier_approval_requires_role() {
        let (db, project, item) = setup();
        let now = Utc::now();
        registry::add_member(db.conn(), project, "ft", Role::FirstTierReviewer, now).unwrap();
        registry::add_member(db.conn(), project, "pm", Role::ProjectManager, now).unwrap();

        // A manager approval does not satisfy the first-tier gate.
        upsert_decision(db.conn(), project, item, "pm", ApprovalStatus::Approved, None, now)
            .unwrap();
        assert!(!has_first_tier_approval(db.conn(), item).unwrap());

        upsert_decision(db.conn(), project, item, "ft", ApprovalStatus::Approved, None, now)
            .unwrap();
        assert!(has_first_tier_approval(db.conn(), item).unwrap());

        // A flipped decision withdraws the gate.
        upsert_decision(db.conn(), project, item, "ft", ApprovalStatus::Rejected, None, now)
            .unwrap();
        assert!(!has_first_tier_approval(db.conn(), item).unwrap());
    }

    #[test]
    fn test_reviewer_rollup_and_final_tier_count() {
        let (db, project, item) = setup();
        let now = Utc::now();
        let item2 = registry::add_item(db.conn(), project, None, None, now).unwrap();
        registry::add_member(db.conn(), project, "admin", Role::ProjectAdmin, now).unwrap();

        upsert_decision(db.conn(), project, item, "admin", ApprovalStatus::Approved, None, now)
            .unwrap();
        upsert_decision(db.conn(), project, item2, "admin", ApprovalStatus::Approved, None, now)
            .unwrap();
        upsert_decision(db.conn(), project, item, "rev", ApprovalStatus::Rejected, None, now)
            .unwrap();

        let rollup = reviewer_rollup(db.conn(), project).unwrap();
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].username, "admin");
        assert_eq!(rollup[0].reviewed, 2);
        assert_eq!(rollup[0].approved, 2);
        assert_eq!(rollup[1].username, "rev");
        assert_eq!(rollup[1].rejected, 1);

        // Distinct items, not actions: re-approving item does not inflate.
        upsert_decision(db.conn(), project, item, "admin", ApprovalStatus::Approved, None, now)
            .unwrap();
        assert_eq!(final_tier_approved_items(db.conn(), project).unwrap(), 2);
    }
}
