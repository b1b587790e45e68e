//! Completion aggregator — per-project and per-user counts and rates.
//!
//! Pending is derived, not stored: items with no tracking record count as
//! pending alongside rows that still carry the `pending` status. All rates
//! are percentages rounded to two decimals, and zero denominators yield
//! zero rather than an error so dashboards stay renderable.

use serde::Serialize;

use crate::store::approvals;
use crate::store::registry;
use crate::store::tracking;
use crate::store::TrackingDb;

use super::{round2, CoreError, CoreResult};

/// Project-level completion summary.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionSummary {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub submitted: i64,
    pub approved: i64,
    pub rejected: i64,
    /// Distinct items approved by the final tier.
    pub final_approvals: i64,
    /// Percent of items approved, 0 for an empty project.
    pub completion_rate: f64,
}

/// Per-annotator performance.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatorStats {
    pub username: String,
    /// Records carried past `in_progress` (submitted, approved, rejected).
    pub completed: i64,
    pub approved: i64,
    pub rejected: i64,
    pub success_rate: f64,
}

/// Per-reviewer performance over approval records.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewerStats {
    pub username: String,
    pub reviewed: i64,
    pub approved: i64,
    pub rejected: i64,
    pub approval_rate: f64,
}

/// Service for completion metrics.
pub struct MetricsService<'a> {
    db: &'a TrackingDb,
}

impl<'a> MetricsService<'a> {
    pub(crate) const fn new(db: &'a TrackingDb) -> Self {
        Self { db }
    }

    fn require_project(&self, project_id: i64) -> CoreResult<()> {
        if registry::get_project(self.db.conn(), project_id)?.is_none() {
            return Err(CoreError::ProjectNotFound { project_id });
        }
        Ok(())
    }

    /// Summarize tracking status across a project.
    pub fn completion_summary(&self, project_id: i64) -> CoreResult<CompletionSummary> {
        self.require_project(project_id)?;
        let conn = self.db.conn();

        let total = registry::count_items(conn, project_id)?;
        let counts = tracking::status_counts(conn, project_id)?;
        let final_approvals = approvals::final_tier_approved_items(conn, project_id)?;

        // Untracked items are pending too.
        let pending = total - counts.tracked + counts.pending;
        let completion_rate = if total > 0 {
            round2(to_f64(counts.approved) / to_f64(total) * 100.0)
        } else {
            0.0
        };

        Ok(CompletionSummary {
            total,
            pending,
            in_progress: counts.in_progress,
            submitted: counts.submitted,
            approved: counts.approved,
            rejected: counts.rejected,
            final_approvals,
            completion_rate,
        })
    }

    /// Per-annotator stats, grouped by `annotated_by`.
    pub fn annotator_stats(&self, project_id: i64) -> CoreResult<Vec<AnnotatorStats>> {
        self.require_project(project_id)?;
        let rollups = tracking::annotator_rollup(self.db.conn(), project_id)?;

        Ok(rollups
            .into_iter()
            .map(|r| {
                let success_rate = if r.completed > 0 {
                    round2(to_f64(r.approved) / to_f64(r.completed) * 100.0)
                } else {
                    0.0
                };
                AnnotatorStats {
                    username: r.username,
                    completed: r.completed,
                    approved: r.approved,
                    rejected: r.rejected,
                    success_rate,
                }
            })
            .collect())
    }

    /// Per-reviewer stats, grouped over approval records.
    pub fn reviewer_stats(&self, project_id: i64) -> CoreResult<Vec<ReviewerStats>> {
        self.require_project(project_id)?;
        let rollups = approvals::reviewer_rollup(self.db.conn(), project_id)?;

        Ok(rollups
            .into_iter()
            .map(|r| {
                let approval_rate = if r.reviewed > 0 {
                    round2(to_f64(r.approved) / to_f64(r.reviewed) * 100.0)
                } else {
                    0.0
                };
                ReviewerStats {
                    username: r.username,
                    reviewed: r.reviewed,
                    approved: r.approved,
                    rejected: r.rejected,
                    approval_rate,
                }
            })
            .collect())
    }

    /// Export a project's tracking records as CSV.
    ///
    /// One row per tracked item: id, truncated text, status, annotator and
    /// reviewer audit fields, review notes.
    pub fn export_csv(&self, project_id: i64) -> CoreResult<String> {
        self.require_project(project_id)?;
        let conn = self.db.conn();

        let items = registry::list_items(conn, project_id)?;
        let records = tracking::list_for_project(conn, project_id)?;
        let text_by_item: std::collections::HashMap<i64, Option<String>> =
            items.into_iter().map(|i| (i.item_id, i.text)).collect();

        let mut out = String::from(
            "item_id,text,status,annotated_by,annotated_at,reviewed_by,reviewed_at,review_notes\n",
        );
        for row in records {
            let text = text_by_item
                .get(&row.item_id)
                .and_then(Option::as_deref)
                .unwrap_or("");
            let fields = [
                row.item_id.to_string(),
                truncate(text, 100),
                row.status.to_string(),
                row.annotated_by.unwrap_or_default(),
                row.annotated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                row.reviewed_by.unwrap_or_default(),
                row.reviewed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                row.review_notes.unwrap_or_default(),
            ];
            let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        Ok(out)
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(count: i64) -> f64 {
    count as f64
}

/// Truncate to `max` characters, appending an ellipsis when cut.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
