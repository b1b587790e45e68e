//! Engine configuration.
//!
//! Everything tunable is injected here at construction time; nothing is
//! read from process-global state. The lock timeout in particular is a
//! single canonical constant shared by every call site that evaluates
//! lock expiry.

use chrono::Duration;

use crate::core::payment::RateTable;

/// Canonical lock expiry window, in minutes.
pub const DEFAULT_LOCK_TIMEOUT_MINUTES: i64 = 15;

/// Configuration for the workflow engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minutes after which a held lock is treated as free.
    pub lock_timeout_minutes: i64,
    /// Per-project payment rates.
    pub rates: RateTable,
}

impl EngineConfig {
    /// The lock expiry window as a `chrono::Duration`.
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::minutes(self.lock_timeout_minutes)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_minutes: DEFAULT_LOCK_TIMEOUT_MINUTES,
            rates: RateTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lock_timeout() {
        let config = EngineConfig::default();
        assert_eq!(config.lock_timeout(), Duration::minutes(15));
    }

    #[test]
    fn test_custom_lock_timeout() {
        let config = EngineConfig {
            lock_timeout_minutes: 5,
            ..EngineConfig::default()
        };
        assert_eq!(config.lock_timeout(), Duration::minutes(5));
    }
}
