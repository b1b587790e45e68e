//! Lock service — short-lived mutual exclusion on items.
//!
//! The lock is a soft hint, not a fencing guarantee: it lives in the
//! tracking record, expires by wall clock, and is evaluated at read time.
//! There is no background sweep; the next `acquire` or tracking read
//! treats a stale lock as free and clears it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::store::tracking;
use crate::store::TrackingDb;

use super::{require_item, require_role, with_write_tx, CoreError, CoreResult};

/// A successfully acquired (or re-acquired) lock.
#[derive(Debug, Clone, Serialize)]
pub struct LockInfo {
    pub project_id: i64,
    pub item_id: i64,
    pub locked_by: String,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Service for lock operations.
pub struct LockService<'a> {
    db: &'a TrackingDb,
    config: &'a EngineConfig,
}

impl<'a> LockService<'a> {
    pub(crate) const fn new(db: &'a TrackingDb, config: &'a EngineConfig) -> Self {
        Self { db, config }
    }

    /// Acquire the lock on an item for `user`.
    ///
    /// Succeeds when the item is unlocked, already held by `user`, or held
    /// by an expired holder. Fails with `LockConflict` when another user
    /// holds an unexpired lock.
    #[tracing::instrument(skip(self))]
    pub fn acquire(&self, project_id: i64, item_id: i64, user: &str) -> CoreResult<LockInfo> {
        let timeout = self.config.lock_timeout();
        with_write_tx(self.db, |tx| {
            require_item(tx, project_id, item_id)?;
            require_role(tx, project_id, user)?;

            let now = Utc::now();
            let row = tracking::get_or_create(tx, project_id, item_id, now)?;
            if let Some(holder) = row.lock_holder(now, timeout) {
                if holder != user {
                    return Err(CoreError::LockConflict {
                        item_id,
                        held_by: holder.to_string(),
                        held_since: row.locked_at.unwrap_or(now),
                    });
                }
            }

            tracking::set_lock(tx, project_id, item_id, user, now)?;
            Ok(LockInfo {
                project_id,
                item_id,
                locked_by: user.to_string(),
                locked_at: now,
                expires_at: now + timeout,
            })
        })
    }

    /// Release the lock on an item.
    ///
    /// Only the holder may release; `project_manager` and `project_admin`
    /// may force-release someone else's lock. Releasing an unlocked or
    /// expired-lock item succeeds.
    #[tracing::instrument(skip(self))]
    pub fn release(&self, project_id: i64, item_id: i64, user: &str) -> CoreResult<()> {
        let timeout = self.config.lock_timeout();
        with_write_tx(self.db, |tx| {
            require_item(tx, project_id, item_id)?;
            let role = require_role(tx, project_id, user)?;

            let now = Utc::now();
            let row = tracking::get_or_create(tx, project_id, item_id, now)?;
            if let Some(holder) = row.lock_holder(now, timeout) {
                if holder != user && !role.can_force_unlock() {
                    return Err(CoreError::PermissionDenied {
                        reason: format!("cannot release a lock held by {holder}"),
                    });
                }
            }

            tracking::clear_lock(tx, project_id, item_id, now)?;
            Ok(())
        })
    }
}
