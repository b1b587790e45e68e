//! Tracking service — per-item lifecycle state machine.
//!
//! Status flow: `pending` → `in_progress` → `submitted` → `approved` or
//! `rejected`, with `rejected` → `submitted` as the resubmission edge.
//! Review decisions (`approved`/`rejected`) are written by the approval
//! chain in [`super::approvals`]; this service owns the annotator-facing
//! transitions.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::store::tracking::{self, TrackingRow, TrackingStatus};
use crate::store::TrackingDb;

use super::{require_item, require_role, with_write_tx, CoreError, CoreResult};

/// Point-in-time view of an item's tracking state.
///
/// Items with no stored record report the virtual `pending` status. Lock
/// fields are surfaced only while the lock is unexpired.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingSnapshot {
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
}

impl TrackingSnapshot {
    pub(crate) fn from_row(row: TrackingRow) -> Self {
        Self {
            project_id: row.project_id,
            item_id: row.item_id,
            status: row.status,
            annotated_by: row.annotated_by,
            annotated_at: row.annotated_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            review_notes: row.review_notes,
            locked_by: row.locked_by,
            locked_at: row.locked_at,
        }
    }

    pub(crate) const fn virtual_pending(project_id: i64, item_id: i64) -> Self {
        Self {
            project_id,
            item_id,
            status: TrackingStatus::Pending,
            annotated_by: None,
            annotated_at: None,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            locked_by: None,
            locked_at: None,
        }
    }
}

/// Service for tracking record operations.
pub struct TrackingService<'a> {
    db: &'a TrackingDb,
    config: &'a EngineConfig,
}

impl<'a> TrackingService<'a> {
    pub(crate) const fn new(db: &'a TrackingDb, config: &'a EngineConfig) -> Self {
        Self { db, config }
    }

    /// Get the tracking state of an item.
    ///
    /// No stored record reads as `pending`. A lock past its expiry window
    /// is cleared as a side effect of the read, so stale holders never
    /// block anyone past the timeout.
    pub fn get(&self, project_id: i64, item_id: i64) -> CoreResult<TrackingSnapshot> {
        require_item(self.db.conn(), project_id, item_id)?;

        let Some(row) = tracking::get(self.db.conn(), project_id, item_id)? else {
            return Ok(TrackingSnapshot::virtual_pending(project_id, item_id));
        };

        let now = Utc::now();
        if row.has_expired_lock(now, self.config.lock_timeout()) {
            let row = with_write_tx(self.db, |tx| {
                tracking::clear_lock(tx, project_id, item_id, now)?;
                Ok(tracking::get(tx, project_id, item_id)?)
            })?;
            return Ok(row.map_or_else(
                || TrackingSnapshot::virtual_pending(project_id, item_id),
                TrackingSnapshot::from_row,
            ));
        }

        Ok(TrackingSnapshot::from_row(row))
    }

    /// Start annotating an item: `pending`/`in_progress` → `in_progress`.
    ///
    /// Re-starting an item already in progress succeeds and re-stamps the
    /// annotator.
    #[tracing::instrument(skip(self))]
    pub fn start(&self, project_id: i64, item_id: i64, user: &str) -> CoreResult<TrackingSnapshot> {
        with_write_tx(self.db, |tx| {
            require_item(tx, project_id, item_id)?;
            require_role(tx, project_id, user)?;

            let now = Utc::now();
            let row = tracking::get_or_create(tx, project_id, item_id, now)?;
            match row.status {
                TrackingStatus::Pending | TrackingStatus::InProgress => {
                    tracking::set_in_progress(tx, project_id, item_id, user, now)?;
                }
                actual => {
                    return Err(CoreError::invalid_transition(
                        item_id,
                        actual,
                        &[TrackingStatus::Pending, TrackingStatus::InProgress],
                    ));
                }
            }

            let row = tracking::get_or_create(tx, project_id, item_id, now)?;
            Ok(TrackingSnapshot::from_row(row))
        })
    }

    /// Submit an item's annotation: any status except `approved` → `submitted`.
    ///
    /// Stamps `annotated_by`/`annotated_at` and releases the submitter's
    /// own lock. Re-submitting an already-submitted item by the same user
    /// is a no-op success.
    #[tracing::instrument(skip(self))]
    pub fn submit(&self, project_id: i64, item_id: i64, user: &str) -> CoreResult<TrackingSnapshot> {
        with_write_tx(self.db, |tx| {
            require_item(tx, project_id, item_id)?;
            require_role(tx, project_id, user)?;

            let now = Utc::now();
            let row = tracking::get_or_create(tx, project_id, item_id, now)?;
            match row.status {
                TrackingStatus::Approved => {
                    return Err(CoreError::invalid_transition(
                        item_id,
                        TrackingStatus::Approved,
                        &[
                            TrackingStatus::Pending,
                            TrackingStatus::InProgress,
                            TrackingStatus::Submitted,
                            TrackingStatus::Rejected,
                        ],
                    ));
                }
                TrackingStatus::Submitted if row.annotated_by.as_deref() == Some(user) => {
                    // Idempotent resubmission; keep the original timestamps.
                    return Ok(TrackingSnapshot::from_row(row));
                }
                _ => {
                    tracking::set_submitted(tx, project_id, item_id, user, now)?;
                }
            }

            let row = tracking::get_or_create(tx, project_id, item_id, now)?;
            Ok(TrackingSnapshot::from_row(row))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::AnnoServices;
    use crate::store::registry::Role;
    use chrono::Duration;

    fn setup() -> (AnnoServices, i64, i64) {
        let services = AnnoServices::in_memory(EngineConfig::default()).unwrap();
        let project = services.projects().create("p", None).unwrap();
        let item = services.projects().add_item(project, Some("text"), None).unwrap();
        services
            .projects()
            .add_member(project, "alice", Role::Annotator)
            .unwrap();
        services
            .projects()
            .add_member(project, "bob", Role::Annotator)
            .unwrap();
        (services, project, item)
    }

    #[test]
    fn test_untracked_item_reads_pending() {
        let (services, project, item) = setup();
        let snapshot = services.tracking().get(project, item).unwrap();
        assert_eq!(snapshot.status, TrackingStatus::Pending);
        assert!(snapshot.annotated_by.is_none());
    }

    #[test]
    fn test_get_unknown_item_fails() {
        let (services, project, item) = setup();
        let result = services.tracking().get(project, item + 100);
        assert!(matches!(result, Err(CoreError::ItemNotFound { .. })));

        let result = services.tracking().get(project + 1, item);
        assert!(matches!(result, Err(CoreError::ProjectNotFound { .. })));
    }

    #[test]
    fn test_start_then_submit() {
        let (services, project, item) = setup();

        let snapshot = services.tracking().start(project, item, "alice").unwrap();
        assert_eq!(snapshot.status, TrackingStatus::InProgress);
        assert_eq!(snapshot.annotated_by.as_deref(), Some("alice"));

        let snapshot = services.tracking().submit(project, item, "alice").unwrap();
        assert_eq!(snapshot.status, TrackingStatus::Submitted);
        assert!(snapshot.annotated_at.is_some());
    }

    #[test]
    fn test_start_requires_membership() {
        let (services, project, item) = setup();
        let result = services.tracking().start(project, item, "stranger");
        assert!(matches!(result, Err(CoreError::NotMember { .. })));
    }

    #[test]
    fn test_start_after_submit_fails() {
        let (services, project, item) = setup();
        services.tracking().submit(project, item, "alice").unwrap();

        let result = services.tracking().start(project, item, "alice");
        assert!(matches!(
            result,
            Err(CoreError::InvalidTransition { actual: TrackingStatus::Submitted, .. })
        ));
    }

    #[test]
    fn test_resubmit_same_user_is_noop() {
        let (services, project, item) = setup();
        let first = services.tracking().submit(project, item, "alice").unwrap();
        let second = services.tracking().submit(project, item, "alice").unwrap();
        assert_eq!(second.annotated_at, first.annotated_at);
    }

    #[test]
    fn test_submit_by_other_user_restamps() {
        let (services, project, item) = setup();
        services.tracking().submit(project, item, "alice").unwrap();
        let snapshot = services.tracking().submit(project, item, "bob").unwrap();
        assert_eq!(snapshot.annotated_by.as_deref(), Some("bob"));
    }

    #[test]
    fn test_submit_releases_own_lock() {
        let (services, project, item) = setup();
        services.locks().acquire(project, item, "alice").unwrap();

        let snapshot = services.tracking().submit(project, item, "alice").unwrap();
        assert!(snapshot.locked_by.is_none());
    }

    #[test]
    fn test_get_clears_expired_lock() {
        let (services, project, item) = setup();
        services.tracking().submit(project, item, "alice").unwrap();

        // Backdate a lock past the expiry window.
        let stale = Utc::now() - Duration::minutes(20);
        crate::store::tracking::set_lock(services.db().conn(), project, item, "bob", stale)
            .unwrap();

        let snapshot = services.tracking().get(project, item).unwrap();
        assert!(snapshot.locked_by.is_none());

        // The clear is persisted, not just filtered from the view.
        let row = crate::store::tracking::get(services.db().conn(), project, item)
            .unwrap()
            .unwrap();
        assert!(row.locked_by.is_none());
    }
}
