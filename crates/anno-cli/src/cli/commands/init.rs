//! Implementation of `anno init` command.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use anno_core::store::TrackingDb;

/// The directory name for anno data
pub const ANNO_DIR: &str = ".anno";

/// The workflow database filename
pub const DB_FILE: &str = "anno.db";

/// Run the init command.
///
/// Creates the .anno directory and the workflow database with its schema.
pub fn run_init(data_root: &Path) -> Result<()> {
    let anno_dir = data_root.join(ANNO_DIR);

    if is_initialized(data_root) {
        println!("Already initialized: {}", anno_dir.display());
        return Ok(());
    }

    fs::create_dir_all(&anno_dir)
        .with_context(|| format!("Failed to create directory: {}", anno_dir.display()))?;

    let db = TrackingDb::open(&db_path(data_root))?;
    db.init_schema()?;

    println!("Initialized anno in {}", anno_dir.display());
    println!("  Created: {}", db_path(data_root).display());

    Ok(())
}

/// Check if anno is initialized in the given directory.
pub fn is_initialized(data_root: &Path) -> bool {
    db_path(data_root).exists()
}

/// Get the path to the workflow database.
pub fn db_path(data_root: &Path) -> std::path::PathBuf {
    data_root.join(ANNO_DIR).join(DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database() {
        let temp = TempDir::new().unwrap();
        let data_root = temp.path();

        run_init(data_root).unwrap();

        assert!(data_root.join(ANNO_DIR).exists());
        assert!(db_path(data_root).exists());
        assert!(is_initialized(data_root));
    }

    #[test]
    fn test_init_idempotent() {
        let temp = TempDir::new().unwrap();
        let data_root = temp.path();

        run_init(data_root).unwrap();
        run_init(data_root).unwrap();

        assert!(is_initialized(data_root));
    }

    #[test]
    fn test_is_initialized_false_when_missing() {
        let temp = TempDir::new().unwrap();
        assert!(!is_initialized(temp.path()));
    }

    #[test]
    fn test_paths() {
        let data_root = Path::new("/tmp/test-data");
        assert_eq!(
            db_path(data_root),
            Path::new("/tmp/test-data/.anno/anno.db")
        );
    }
}
