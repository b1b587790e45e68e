//! Implementation of `anno items` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{open_services, resolve_user};
use crate::output::{Formatter, OutputFormat};

/// Add an item to a project.
#[tracing::instrument(skip(data_root, text, format))]
pub fn run_items_add(
    data_root: &Path,
    project_id: i64,
    text: Option<&str>,
    audio_minutes: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let item_id = services.projects().add_item(project_id, text, audio_minutes)?;

    let output = serde_json::json!({
        "item_id": item_id,
        "project_id": project_id,
    });
    Formatter::new(format).print(&output)?;
    Ok(())
}

/// List the items visible to the acting user.
///
/// Elevated roles see every item; annotators see only what the visibility
/// filter leaves them.
#[tracing::instrument(skip(data_root, format))]
pub fn run_items_list(
    data_root: &Path,
    project_id: i64,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let user = resolve_user(user)?;
    let visible = services.visibility().list_visible(project_id, &user)?;

    let count = visible.len();
    let output = serde_json::json!({
        "project_id": project_id,
        "user": user,
        "items": visible,
        "count": count,
    });
    Formatter::new(format).print(&output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::init::run_init;
    use crate::cli::commands::projects::{run_members_add, run_projects_create};
    use anno_core::store::registry::Role;
    use tempfile::tempdir;

    #[test]
    fn test_add_and_list_visible() {
        let dir = tempdir().unwrap();
        run_init(dir.path()).unwrap();
        run_projects_create(dir.path(), "p", None, OutputFormat::Text).unwrap();
        run_members_add(dir.path(), 1, "alice", Role::Annotator, OutputFormat::Text).unwrap();

        run_items_add(dir.path(), 1, Some("text"), None, OutputFormat::Text).unwrap();
        run_items_list(dir.path(), 1, Some("alice"), OutputFormat::Text).unwrap();

        let services = open_services(dir.path()).unwrap();
        assert_eq!(
            services.visibility().list_visible(1, "alice").unwrap(),
            vec![1]
        );
    }
}
