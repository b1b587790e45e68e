//! Approval chain — two reviewer tiers plus a manager bypass.
//!
//! Ordering rules:
//! - `first_tier_reviewer` acts only on annotator-submitted items (or
//!   re-reviews their own prior decision).
//! - `project_admin` (the final tier) acts only after some first-tier
//!   reviewer has approved the item.
//! - `project_manager` bypasses both checks.
//!
//! Every reviewer keeps an independent approval record, upserted in place;
//! the tracking record's status and audit fields are updated in the same
//! transaction, so the two never drift.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::approvals::{self, ApprovalRow, ApprovalStatus};
use crate::store::registry::{self, Role};
use crate::store::tracking::{self, TrackingStatus};
use crate::store::TrackingDb;

use super::tracking::TrackingSnapshot;
use super::{require_item, with_write_tx, CoreError, CoreResult};

/// A reviewer's recorded decision for one item.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalSnapshot {
    pub item_id: i64,
    pub reviewer: String,
    pub status: ApprovalStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

impl ApprovalSnapshot {
    fn from_row(row: ApprovalRow) -> Self {
        Self {
            item_id: row.item_id,
            reviewer: row.reviewer,
            status: row.status,
            reviewed_at: row.reviewed_at,
            review_notes: row.review_notes,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Decision {
    Approve,
    Reject,
}

impl Decision {
    const fn target(self) -> TrackingStatus {
        match self {
            Self::Approve => TrackingStatus::Approved,
            Self::Reject => TrackingStatus::Rejected,
        }
    }

    const fn approval_status(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }

    /// Allowed source statuses for the tracking transition.
    const fn allowed_from(self) -> [TrackingStatus; 2] {
        match self {
            Self::Approve => [TrackingStatus::Submitted, TrackingStatus::Rejected],
            Self::Reject => [TrackingStatus::Submitted, TrackingStatus::Approved],
        }
    }
}

/// Service for approval chain operations.
pub struct ApprovalService<'a> {
    db: &'a TrackingDb,
}

impl<'a> ApprovalService<'a> {
    pub(crate) const fn new(db: &'a TrackingDb) -> Self {
        Self { db }
    }

    /// Approve an item's annotation.
    ///
    /// Notes are optional for approvals.
    #[tracing::instrument(skip(self, notes))]
    pub fn approve(
        &self,
        project_id: i64,
        item_id: i64,
        reviewer: &str,
        notes: Option<&str>,
    ) -> CoreResult<TrackingSnapshot> {
        self.decide(project_id, item_id, reviewer, Decision::Approve, notes)
    }

    /// Reject an item's annotation.
    ///
    /// Notes are mandatory and must be non-blank; the annotator needs to
    /// know what to fix.
    #[tracing::instrument(skip(self, notes))]
    pub fn reject(
        &self,
        project_id: i64,
        item_id: i64,
        reviewer: &str,
        notes: &str,
    ) -> CoreResult<TrackingSnapshot> {
        if notes.trim().is_empty() {
            return Err(CoreError::EmptyNotes);
        }
        self.decide(project_id, item_id, reviewer, Decision::Reject, Some(notes))
    }

    /// List every reviewer's approval record for an item.
    pub fn list_for_item(&self, project_id: i64, item_id: i64) -> CoreResult<Vec<ApprovalSnapshot>> {
        require_item(self.db.conn(), project_id, item_id)?;
        let rows = approvals::list_for_item(self.db.conn(), item_id)?;
        Ok(rows.into_iter().map(ApprovalSnapshot::from_row).collect())
    }

    fn decide(
        &self,
        project_id: i64,
        item_id: i64,
        reviewer: &str,
        decision: Decision,
        notes: Option<&str>,
    ) -> CoreResult<TrackingSnapshot> {
        with_write_tx(self.db, |tx| {
            require_item(tx, project_id, item_id)?;
            let role = registry::get_role(tx, project_id, reviewer)?.ok_or_else(|| {
                CoreError::NotMember {
                    username: reviewer.to_string(),
                    project_id,
                }
            })?;
            if !role.can_review() {
                return Err(CoreError::PermissionDenied {
                    reason: format!("role '{role}' may not review annotations"),
                });
            }

            let now = Utc::now();
            let row = tracking::get_or_create(tx, project_id, item_id, now)?;

            // Tier eligibility.
            match role {
                Role::FirstTierReviewer => {
                    // Eligible on submitted items, or re-reviewing an item
                    // they already decided on.
                    let own = approvals::get(tx, item_id, reviewer)?;
                    if row.status != TrackingStatus::Submitted && own.is_none() {
                        return Err(CoreError::invalid_transition(
                            item_id,
                            row.status,
                            &[TrackingStatus::Submitted],
                        ));
                    }
                }
                Role::ProjectAdmin => {
                    if !approvals::has_first_tier_approval(tx, item_id)? {
                        return Err(CoreError::ApprovalOrderViolation { item_id });
                    }
                }
                Role::ProjectManager => {}
                Role::Annotator => unreachable!("can_review() excludes annotators"),
            }

            // Tracking state machine.
            let allowed = decision.allowed_from();
            if !allowed.contains(&row.status) {
                return Err(CoreError::invalid_transition(item_id, row.status, &allowed));
            }

            approvals::upsert_decision(
                tx,
                project_id,
                item_id,
                reviewer,
                decision.approval_status(),
                notes,
                now,
            )?;
            tracking::set_reviewed(
                tx,
                project_id,
                item_id,
                decision.target(),
                reviewer,
                notes,
                now,
            )?;

            let row = tracking::get_or_create(tx, project_id, item_id, now)?;
            Ok(TrackingSnapshot::from_row(row))
        })
    }
}
