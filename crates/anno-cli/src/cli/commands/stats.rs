//! Implementation of `anno stats` subcommands.

use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::cli::commands::helpers::open_services;
use crate::output::{Formatter, OutputFormat};

/// Show the project completion summary.
#[tracing::instrument(skip(data_root, format))]
pub fn run_stats_summary(data_root: &Path, project_id: i64, format: OutputFormat) -> Result<()> {
    let services = open_services(data_root)?;
    let summary = services.metrics().completion_summary(project_id)?;

    Formatter::new(format).print(&summary)?;
    Ok(())
}

/// Show per-annotator performance.
#[tracing::instrument(skip(data_root, format))]
pub fn run_stats_annotators(data_root: &Path, project_id: i64, format: OutputFormat) -> Result<()> {
    let services = open_services(data_root)?;
    let stats = services.metrics().annotator_stats(project_id)?;

    Formatter::new(format).print_list(&stats, "No annotator activity yet.")?;
    Ok(())
}

/// Show per-reviewer performance.
#[tracing::instrument(skip(data_root, format))]
pub fn run_stats_reviewers(data_root: &Path, project_id: i64, format: OutputFormat) -> Result<()> {
    let services = open_services(data_root)?;
    let stats = services.metrics().reviewer_stats(project_id)?;

    Formatter::new(format).print_list(&stats, "No review activity yet.")?;
    Ok(())
}

/// Export tracking records as CSV to stdout.
#[tracing::instrument(skip(data_root))]
pub fn run_stats_export(data_root: &Path, project_id: i64) -> Result<()> {
    let services = open_services(data_root)?;
    let csv = services.metrics().export_csv(project_id)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(csv.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::init::run_init;
    use crate::cli::commands::items::run_items_add;
    use crate::cli::commands::projects::{run_members_add, run_projects_create};
    use crate::cli::commands::tracking::run_submit;
    use anno_core::store::registry::Role;
    use tempfile::tempdir;

    #[test]
    fn test_summary_after_submissions() {
        let dir = tempdir().unwrap();
        run_init(dir.path()).unwrap();
        run_projects_create(dir.path(), "p", None, OutputFormat::Text).unwrap();
        run_members_add(dir.path(), 1, "ann", Role::Annotator, OutputFormat::Text).unwrap();
        for _ in 0..3 {
            run_items_add(dir.path(), 1, None, None, OutputFormat::Text).unwrap();
        }
        run_submit(dir.path(), 1, 1, Some("ann"), OutputFormat::Text).unwrap();

        run_stats_summary(dir.path(), 1, OutputFormat::Text).unwrap();

        let services = open_services(dir.path()).unwrap();
        let summary = services.metrics().completion_summary(1).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.pending, 2);
    }
}
