//! Implementation of `anno tracking` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{open_services, resolve_user};
use crate::output::{Formatter, OutputFormat};

/// Review action selector shared by approve/reject dispatch.
#[derive(Debug, Clone, Copy)]
pub enum ReviewAction {
    Approve,
    Reject,
}

/// Show tracking status for an item.
#[tracing::instrument(skip(data_root, format))]
pub fn run_status(
    data_root: &Path,
    project_id: i64,
    item_id: i64,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let snapshot = services.tracking().get(project_id, item_id)?;
    let approvals = services.approvals().list_for_item(project_id, item_id)?;

    let output = serde_json::json!({
        "tracking": snapshot,
        "approvals": approvals,
    });
    Formatter::new(format).print(&output)?;
    Ok(())
}

/// Start annotating an item.
#[tracing::instrument(skip(data_root, format))]
pub fn run_start(
    data_root: &Path,
    project_id: i64,
    item_id: i64,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let user = resolve_user(user)?;
    let snapshot = services.tracking().start(project_id, item_id, &user)?;

    Formatter::new(format).print(&snapshot)?;
    Ok(())
}

/// Submit an item's annotation.
#[tracing::instrument(skip(data_root, format))]
pub fn run_submit(
    data_root: &Path,
    project_id: i64,
    item_id: i64,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let user = resolve_user(user)?;
    let snapshot = services.tracking().submit(project_id, item_id, &user)?;

    Formatter::new(format).print(&snapshot)?;
    Ok(())
}

/// Approve or reject an item's annotation.
#[tracing::instrument(skip(data_root, notes, format))]
pub fn run_review(
    data_root: &Path,
    project_id: i64,
    item_id: i64,
    action: ReviewAction,
    notes: Option<String>,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let reviewer = resolve_user(user)?;

    let snapshot = match action {
        ReviewAction::Approve => {
            services
                .approvals()
                .approve(project_id, item_id, &reviewer, notes.as_deref())?
        }
        ReviewAction::Reject => {
            services
                .approvals()
                .reject(project_id, item_id, &reviewer, notes.as_deref().unwrap_or_default())?
        }
    };

    Formatter::new(format).print(&snapshot)?;
    Ok(())
}

/// Acquire the edit lock on an item.
#[tracing::instrument(skip(data_root, format))]
pub fn run_lock(
    data_root: &Path,
    project_id: i64,
    item_id: i64,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let user = resolve_user(user)?;
    let info = services.locks().acquire(project_id, item_id, &user)?;

    Formatter::new(format).print(&info)?;
    Ok(())
}

/// Release the edit lock on an item.
#[tracing::instrument(skip(data_root, format))]
pub fn run_unlock(
    data_root: &Path,
    project_id: i64,
    item_id: i64,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let user = resolve_user(user)?;
    services.locks().release(project_id, item_id, &user)?;

    let output = serde_json::json!({
        "item_id": item_id,
        "unlocked": true,
    });
    Formatter::new(format).print(&output)?;
    Ok(())
}
