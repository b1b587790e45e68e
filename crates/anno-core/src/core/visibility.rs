//! Visibility filter — which items a user may list and act on.
//!
//! A pure set computation over a tracking snapshot, composed into the
//! query path at construction time. Recomputed on every listing call;
//! status and locks mutate continuously, so nothing here is cached.
//!
//! Rules, role-first:
//! - `project_admin`, `project_manager`, and `first_tier_reviewer` see
//!   every item.
//! - Annotators see untracked items, pending items, and their own
//!   rejected items — minus items locked by another unexpired holder,
//!   items annotated by someone else, and their own submitted/approved
//!   items.
//! - Non-members see nothing.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::config::EngineConfig;
use crate::store::registry::{self, Role};
use crate::store::tracking::{self, TrackingRow, TrackingStatus};
use crate::store::TrackingDb;

use super::{CoreError, CoreResult};

/// Compute the set of item ids visible to `user`.
///
/// Pure function of the role, the project's item ids, and a snapshot of
/// its tracking records; `now` and `lock_timeout` decide which locks still
/// count as held.
#[must_use]
pub fn visible_items(
    role: Option<Role>,
    user: &str,
    item_ids: &[i64],
    records: &[TrackingRow],
    now: DateTime<Utc>,
    lock_timeout: Duration,
) -> BTreeSet<i64> {
    let Some(role) = role else {
        return BTreeSet::new();
    };

    if role.can_see_all() {
        return item_ids.iter().copied().collect();
    }

    let by_item: HashMap<i64, &TrackingRow> =
        records.iter().map(|row| (row.item_id, row)).collect();

    let mut visible = BTreeSet::new();
    for &item_id in item_ids {
        let Some(row) = by_item.get(&item_id) else {
            // Untracked: nobody has touched it yet.
            visible.insert(item_id);
            continue;
        };

        let mine = row.annotated_by.as_deref() == Some(user);
        let included = match row.status {
            TrackingStatus::Pending => true,
            TrackingStatus::Rejected => mine,
            _ => false,
        };
        let excluded = row.lock_holder(now, lock_timeout).is_some_and(|h| h != user)
            || row.annotated_by.as_deref().is_some_and(|a| a != user)
            || (mine
                && matches!(
                    row.status,
                    TrackingStatus::Submitted | TrackingStatus::Approved
                ));

        if included && !excluded {
            visible.insert(item_id);
        }
    }
    visible
}

/// Service wrapper that loads the snapshot and applies the filter.
pub struct VisibilityService<'a> {
    db: &'a TrackingDb,
    config: &'a EngineConfig,
}

impl<'a> VisibilityService<'a> {
    pub(crate) const fn new(db: &'a TrackingDb, config: &'a EngineConfig) -> Self {
        Self { db, config }
    }

    /// List the item ids in a project visible to `user`, in id order.
    ///
    /// Non-members get an empty list, not an error, so listing surfaces
    /// stay renderable.
    pub fn list_visible(&self, project_id: i64, user: &str) -> CoreResult<Vec<i64>> {
        let conn = self.db.conn();
        if registry::get_project(conn, project_id)?.is_none() {
            return Err(CoreError::ProjectNotFound { project_id });
        }

        let role = registry::get_role(conn, project_id, user)?;
        let item_ids = registry::list_item_ids(conn, project_id)?;
        let records = tracking::list_for_project(conn, project_id)?;

        let visible = visible_items(
            role,
            user,
            &item_ids,
            &records,
            Utc::now(),
            self.config.lock_timeout(),
        );
        Ok(visible.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::AnnoServices;

    const TIMEOUT: i64 = 15;

    fn row(item_id: i64, status: TrackingStatus) -> TrackingRow {
        let now = Utc::now();
        TrackingRow {
            project_id: 1,
            item_id,
            status,
            annotated_by: None,
            annotated_at: None,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            locked_by: None,
            locked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn annotated(item_id: i64, status: TrackingStatus, by: &str) -> TrackingRow {
        let mut r = row(item_id, status);
        r.annotated_by = Some(by.to_string());
        r
    }

    fn compute(role: Option<Role>, user: &str, items: &[i64], records: &[TrackingRow]) -> Vec<i64> {
        visible_items(role, user, items, records, Utc::now(), Duration::minutes(TIMEOUT))
            .into_iter()
            .collect()
    }

    #[test]
    fn test_non_member_sees_nothing() {
        let records = vec![row(1, TrackingStatus::Pending)];
        assert!(compute(None, "ghost", &[1, 2], &records).is_empty());
    }

    #[test]
    fn test_elevated_roles_see_everything() {
        let records = vec![
            annotated(1, TrackingStatus::Submitted, "alice"),
            annotated(2, TrackingStatus::Approved, "bob"),
        ];
        for role in [
            Role::FirstTierReviewer,
            Role::ProjectManager,
            Role::ProjectAdmin,
        ] {
            assert_eq!(compute(Some(role), "eve", &[1, 2, 3], &records), vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_annotator_sees_untracked_and_pending() {
        let records = vec![row(2, TrackingStatus::Pending)];
        assert_eq!(
            compute(Some(Role::Annotator), "alice", &[1, 2], &records),
            vec![1, 2]
        );
    }

    #[test]
    fn test_annotator_sees_own_rejected_only() {
        let records = vec![
            annotated(1, TrackingStatus::Rejected, "alice"),
            annotated(2, TrackingStatus::Rejected, "bob"),
        ];
        assert_eq!(
            compute(Some(Role::Annotator), "alice", &[1, 2], &records),
            vec![1]
        );
    }

    #[test]
    fn test_annotator_never_sees_others_submissions() {
        let records = vec![
            annotated(1, TrackingStatus::Submitted, "bob"),
            annotated(2, TrackingStatus::InProgress, "bob"),
            annotated(3, TrackingStatus::Approved, "bob"),
        ];
        assert!(compute(Some(Role::Annotator), "alice", &[1, 2, 3], &records).is_empty());
    }

    #[test]
    fn test_annotator_own_submitted_hidden() {
        let records = vec![
            annotated(1, TrackingStatus::Submitted, "alice"),
            annotated(2, TrackingStatus::Approved, "alice"),
        ];
        assert!(compute(Some(Role::Annotator), "alice", &[1, 2], &records).is_empty());
    }

    #[test]
    fn test_lock_by_other_excludes_until_expiry() {
        let now = Utc::now();
        let mut fresh = row(1, TrackingStatus::Pending);
        fresh.locked_by = Some("bob".to_string());
        fresh.locked_at = Some(now - Duration::minutes(5));

        let mut stale = row(2, TrackingStatus::Pending);
        stale.locked_by = Some("bob".to_string());
        stale.locked_at = Some(now - Duration::minutes(20));

        let records = vec![fresh, stale];
        // Fresh lock hides item 1; expired lock on item 2 does not.
        assert_eq!(
            compute(Some(Role::Annotator), "alice", &[1, 2], &records),
            vec![2]
        );
    }

    #[test]
    fn test_own_lock_does_not_exclude() {
        let mut r = row(1, TrackingStatus::Pending);
        r.locked_by = Some("alice".to_string());
        r.locked_at = Some(Utc::now());
        assert_eq!(
            compute(Some(Role::Annotator), "alice", &[1], &[r]),
            vec![1]
        );
    }

    #[test]
    fn test_service_end_to_end() {
        let services = AnnoServices::in_memory(EngineConfig::default()).unwrap();
        let project = services.projects().create("p", None).unwrap();
        let a = services.projects().add_item(project, None, None).unwrap();
        let b = services.projects().add_item(project, None, None).unwrap();
        let c = services.projects().add_item(project, None, None).unwrap();
        services
            .projects()
            .add_member(project, "alice", Role::Annotator)
            .unwrap();
        services
            .projects()
            .add_member(project, "bob", Role::Annotator)
            .unwrap();
        services
            .projects()
            .add_member(project, "rev", Role::FirstTierReviewer)
            .unwrap();

        // bob submits item b; a and c remain untracked.
        services.tracking().submit(project, b, "bob").unwrap();

        assert_eq!(
            services.visibility().list_visible(project, "alice").unwrap(),
            vec![a, c]
        );
        assert_eq!(
            services.visibility().list_visible(project, "rev").unwrap(),
            vec![a, b, c]
        );
        assert!(services
            .visibility()
            .list_visible(project, "ghost")
            .unwrap()
            .is_empty());
    }
}
