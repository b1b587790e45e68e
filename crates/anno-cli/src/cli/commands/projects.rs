//! Implementation of `anno projects` and `anno members` subcommands.

use anyhow::Result;
use std::path::Path;

use anno_core::store::registry::Role;

use crate::cli::commands::helpers::open_services;
use crate::output::{Formatter, OutputFormat};

/// Create a new project.
#[tracing::instrument(skip(data_root, format))]
pub fn run_projects_create(
    data_root: &Path,
    name: &str,
    description: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let project_id = services.projects().create(name, description)?;

    let output = serde_json::json!({
        "project_id": project_id,
        "name": name,
    });
    Formatter::new(format).print(&output)?;
    Ok(())
}

/// List projects.
#[tracing::instrument(skip(data_root, format))]
pub fn run_projects_list(data_root: &Path, format: OutputFormat) -> Result<()> {
    let services = open_services(data_root)?;
    let projects = services.projects().list()?;

    Formatter::new(format).print_list(&projects, "No projects. Create one with 'anno projects create <name>'.")?;
    Ok(())
}

/// Add a member to a project.
#[tracing::instrument(skip(data_root, format))]
pub fn run_members_add(
    data_root: &Path,
    project_id: i64,
    username: &str,
    role: Role,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    services.projects().add_member(project_id, username, role)?;

    let output = serde_json::json!({
        "project_id": project_id,
        "username": username,
        "role": role,
    });
    Formatter::new(format).print(&output)?;
    Ok(())
}

/// List members of a project.
#[tracing::instrument(skip(data_root, format))]
pub fn run_members_list(data_root: &Path, project_id: i64, format: OutputFormat) -> Result<()> {
    let services = open_services(data_root)?;
    let members = services.projects().list_members(project_id)?;

    Formatter::new(format).print_list(&members, "No members.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::init::run_init;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_member_flow() {
        let dir = tempdir().unwrap();
        run_init(dir.path()).unwrap();

        run_projects_create(dir.path(), "KH_MV_A", None, OutputFormat::Text).unwrap();
        run_members_add(dir.path(), 1, "alice", Role::Annotator, OutputFormat::Text).unwrap();

        let services = open_services(dir.path()).unwrap();
        let members = services.projects().list_members(1).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "alice");
    }

    #[test]
    fn test_member_add_unknown_project_fails() {
        let dir = tempdir().unwrap();
        run_init(dir.path()).unwrap();

        let result = run_members_add(dir.path(), 42, "alice", Role::Annotator, OutputFormat::Text);
        assert!(result.is_err());
    }
}
