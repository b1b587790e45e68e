//! Shared helpers for CLI commands.

use anyhow::{bail, Result};
use std::env;
use std::path::Path;

use anno_core::config::EngineConfig;
use anno_core::core::{AnnoServices, CoreContext};

use crate::cli::commands::init::{db_path, is_initialized};

/// Ensure anno is initialized in the given directory.
pub fn ensure_initialized(data_root: &Path) -> Result<()> {
    if !is_initialized(data_root) {
        bail!("Not an anno workspace. Run 'anno init' first.");
    }
    Ok(())
}

/// Open the workflow database with the default engine configuration.
pub fn open_services(data_root: &Path) -> Result<AnnoServices> {
    ensure_initialized(data_root)?;
    let ctx = CoreContext::new(&db_path(data_root), EngineConfig::default());
    Ok(ctx.services()?)
}

/// Resolve the acting user: `--user` flag, then `$ANNO_USER`, then `$USER`.
pub fn resolve_user(flag: Option<&str>) -> Result<String> {
    if let Some(user) = flag {
        return Ok(user.to_string());
    }
    if let Ok(user) = env::var("ANNO_USER") {
        if !user.is_empty() {
            return Ok(user);
        }
    }
    if let Ok(user) = env::var("USER") {
        if !user.is_empty() {
            return Ok(user);
        }
    }
    bail!("Cannot determine acting user. Pass --user <name> or set $ANNO_USER.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_initialized_fails_on_empty_dir() {
        let dir = tempdir().unwrap();
        let result = ensure_initialized(dir.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("init"));
    }

    #[test]
    fn test_open_services_after_init() {
        let dir = tempdir().unwrap();
        crate::cli::commands::init::run_init(dir.path()).unwrap();

        let services = open_services(dir.path()).unwrap();
        assert!(services.projects().list().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_user_prefers_flag() {
        let user = resolve_user(Some("alice")).unwrap();
        assert_eq!(user, "alice");
    }
}
