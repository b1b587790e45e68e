//! Service layer for anno-core.
//!
//! Provides typed, high-level APIs for tracking, locking, visibility,
//! approvals, metrics, and payment. Every mutation runs get-or-create plus
//! conditional update inside a single immediate transaction, so concurrent
//! writers on the same record serialize instead of losing updates.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use anno_core::config::EngineConfig;
//! use anno_core::core::CoreContext;
//!
//! let ctx = CoreContext::new(
//!     Path::new("/data/.anno/anno.db"),
//!     EngineConfig::default(),
//! );
//! let services = ctx.services().unwrap();
//! let summary = services.metrics().completion_summary(1).unwrap();
//! ```

#![allow(clippy::missing_errors_doc)]

pub mod approvals;
pub mod errors;
pub mod locks;
pub mod metrics;
pub mod payment;
pub mod projects;
pub mod tracking;
pub mod visibility;

pub use errors::{CoreError, CoreResult};

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rusqlite::{Connection, Transaction};

use crate::config::EngineConfig;
use crate::store::{registry, TrackingDb};

/// Bounded retries for write transactions that hit storage contention.
const WRITE_ATTEMPTS: u32 = 3;

/// Context for anno-core services.
///
/// Holds the database path and the injected engine configuration. Create
/// one per operation or hold for the duration of a session.
#[derive(Debug, Clone)]
pub struct CoreContext {
    db_path: PathBuf,
    config: EngineConfig,
}

impl CoreContext {
    /// Create a new core context.
    #[must_use]
    pub fn new(db_path: &Path, config: EngineConfig) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            config,
        }
    }

    /// Path to the workflow database.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// The injected engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open the database, initialize its schema, and build the service facade.
    pub fn services(&self) -> CoreResult<AnnoServices> {
        let db = TrackingDb::open(&self.db_path).map_err(CoreError::Internal)?;
        db.init_schema().map_err(CoreError::Internal)?;
        Ok(AnnoServices {
            config: self.config.clone(),
            db,
        })
    }
}

/// Facade providing all anno service APIs.
///
/// Owns the open database and hands out domain-specific service objects.
pub struct AnnoServices {
    config: EngineConfig,
    db: TrackingDb,
}

impl AnnoServices {
    /// Build services over an in-memory database (for testing and embedding).
    pub fn in_memory(config: EngineConfig) -> CoreResult<Self> {
        let db = TrackingDb::open_in_memory().map_err(CoreError::Internal)?;
        db.init_schema().map_err(CoreError::Internal)?;
        Ok(Self { config, db })
    }

    /// Access project, item, and member registry operations.
    #[must_use]
    pub fn projects(&self) -> projects::ProjectService<'_> {
        projects::ProjectService::new(&self.db)
    }

    /// Access tracking record operations.
    #[must_use]
    pub fn tracking(&self) -> tracking::TrackingService<'_> {
        tracking::TrackingService::new(&self.db, &self.config)
    }

    /// Access lock operations.
    #[must_use]
    pub fn locks(&self) -> locks::LockService<'_> {
        locks::LockService::new(&self.db, &self.config)
    }

    /// Access the visibility filter.
    #[must_use]
    pub fn visibility(&self) -> visibility::VisibilityService<'_> {
        visibility::VisibilityService::new(&self.db, &self.config)
    }

    /// Access approval chain operations.
    #[must_use]
    pub fn approvals(&self) -> approvals::ApprovalService<'_> {
        approvals::ApprovalService::new(&self.db)
    }

    /// Access completion metrics.
    #[must_use]
    pub fn metrics(&self) -> metrics::MetricsService<'_> {
        metrics::MetricsService::new(&self.db)
    }

    /// Access the payment calculator.
    #[must_use]
    pub fn payment(&self) -> payment::PaymentCalculator<'_> {
        payment::PaymentCalculator::new(&self.config.rates)
    }

    /// Get a reference to the underlying database.
    ///
    /// Useful for advanced queries not covered by the service layer.
    #[must_use]
    pub const fn db(&self) -> &TrackingDb {
        &self.db
    }

    /// Get a reference to the injected configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Run `op` inside an immediate transaction, retrying on contention.
///
/// Retries a bounded number of times when SQLite reports busy/locked, then
/// surfaces `CoreError::Unavailable`. Any other error aborts immediately
/// and rolls the transaction back.
pub(crate) fn with_write_tx<T>(
    db: &TrackingDb,
    mut op: impl FnMut(&Transaction<'_>) -> CoreResult<T>,
) -> CoreResult<T> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = run_write_tx(db, &mut op);
        match outcome {
            Err(err) if err.is_busy() => {
                if attempt >= WRITE_ATTEMPTS {
                    return Err(CoreError::Unavailable);
                }
                tracing::debug!(attempt, "write transaction contended, retrying");
                std::thread::sleep(std::time::Duration::from_millis(u64::from(attempt) * 25));
            }
            other => return other,
        }
    }
}

fn run_write_tx<T>(
    db: &TrackingDb,
    op: &mut impl FnMut(&Transaction<'_>) -> CoreResult<T>,
) -> CoreResult<T> {
    let tx = db.immediate_tx().map_err(CoreError::Internal)?;
    let value = op(&tx)?;
    tx.commit()
        .context("Failed to commit transaction")
        .map_err(CoreError::Internal)?;
    Ok(value)
}

/// Verify the project and item exist; typed errors otherwise.
pub(crate) fn require_item(conn: &Connection, project_id: i64, item_id: i64) -> CoreResult<()> {
    if registry::get_project(conn, project_id)?.is_none() {
        return Err(CoreError::ProjectNotFound { project_id });
    }
    if registry::get_item(conn, project_id, item_id)?.is_none() {
        return Err(CoreError::ItemNotFound {
            project_id,
            item_id,
        });
    }
    Ok(())
}

/// Look up the user's role, erroring if they are not a project member.
pub(crate) fn require_role(
    conn: &Connection,
    project_id: i64,
    username: &str,
) -> CoreResult<registry::Role> {
    registry::get_role(conn, project_id, username)?.ok_or_else(|| CoreError::NotMember {
        username: username.to_string(),
        project_id,
    })
}

/// Round a rate to two decimals for display.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert!((round2(33.333_333) - 33.33).abs() < f64::EPSILON);
        assert!((round2(66.666_666) - 66.67).abs() < f64::EPSILON);
        assert!((round2(0.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_write_tx_commits() {
        let services = AnnoServices::in_memory(EngineConfig::default()).unwrap();
        let value = with_write_tx(services.db(), |tx| {
            tx.execute(
                "INSERT INTO projects (name, created_at) VALUES ('p', '2026-01-01T00:00:00Z')",
                [],
            )
            .map_err(|e| CoreError::Internal(e.into()))?;
            Ok(41 + 1)
        })
        .unwrap();
        assert_eq!(value, 42);

        let count: i64 = services
            .db()
            .conn()
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_write_tx_rolls_back_on_error() {
        let services = AnnoServices::in_memory(EngineConfig::default()).unwrap();
        let result: CoreResult<()> = with_write_tx(services.db(), |tx| {
            tx.execute(
                "INSERT INTO projects (name, created_at) VALUES ('p', '2026-01-01T00:00:00Z')",
                [],
            )
            .map_err(|e| CoreError::Internal(e.into()))?;
            Err(CoreError::EmptyNotes)
        });
        assert!(matches!(result, Err(CoreError::EmptyNotes)));

        let count: i64 = services
            .db()
            .conn()
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
