//! Typed error types for the anno-core service layer.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::tracking::TrackingStatus;

/// Result type alias for core service operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the anno-core service layer.
///
/// Every rejected action surfaces as one of these; callers branch on the
/// variant rather than parsing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A project was not found.
    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: i64 },

    /// An item was not found in the given project.
    #[error("Item not found in project {project_id}: {item_id}")]
    ItemNotFound { project_id: i64, item_id: i64 },

    /// The acting user is not a member of the project.
    #[error("{username} is not a member of project {project_id}")]
    NotMember { username: String, project_id: i64 },

    /// A status precondition was not met.
    #[error("Item {item_id} has status '{actual}', expected one of: {allowed}")]
    InvalidTransition {
        item_id: i64,
        actual: TrackingStatus,
        allowed: String,
    },

    /// The final tier acted before a first-tier approval exists.
    #[error(
        "Item {item_id} needs a first-tier approval before the final tier can act"
    )]
    ApprovalOrderViolation { item_id: i64 },

    /// A rejection was attempted without review notes.
    #[error("Rejection requires non-empty review notes")]
    EmptyNotes,

    /// The item is locked by another, unexpired holder.
    #[error("Item {item_id} is locked by {held_by} since {held_since}")]
    LockConflict {
        item_id: i64,
        held_by: String,
        held_since: DateTime<Utc>,
    },

    /// The acting user's role does not permit the operation.
    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Storage stayed contended past the bounded retries.
    #[error("Storage unavailable, try again")]
    Unavailable,

    /// An internal storage or database error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Build an `InvalidTransition` from the allowed source statuses.
    pub(crate) fn invalid_transition(
        item_id: i64,
        actual: TrackingStatus,
        allowed: &[TrackingStatus],
    ) -> Self {
        let allowed = allowed
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self::InvalidTransition {
            item_id,
            actual,
            allowed,
        }
    }

    /// Whether this error wraps a SQLite busy/locked failure.
    pub(crate) fn is_busy(&self) -> bool {
        let Self::Internal(err) = self else {
            return false;
        };
        err.chain().any(|cause| {
            cause.downcast_ref::<rusqlite::Error>().is_some_and(|e| {
                matches!(
                    e.sqlite_error_code(),
                    Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_names_states() {
        let err = CoreError::invalid_transition(
            7,
            TrackingStatus::Pending,
            &[TrackingStatus::Submitted, TrackingStatus::Rejected],
        );
        let msg = err.to_string();
        assert!(msg.contains("pending"));
        assert!(msg.contains("submitted, rejected"));
    }

    #[test]
    fn test_is_busy_detects_sqlite_busy() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        let err = CoreError::Internal(anyhow::Error::new(sqlite_err).context("write failed"));
        assert!(err.is_busy());

        assert!(!CoreError::EmptyNotes.is_busy());
    }
}
