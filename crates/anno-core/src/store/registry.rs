//! Registry tables: projects, items, and project members.
//!
//! These are the collaborator entities the workflow engine consumes —
//! item existence/metadata lookup and member role lookup. Anything richer
//! (label taxonomies, bulk import, auth) lives outside this crate.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

/// A project member's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Annotator,
    FirstTierReviewer,
    ProjectManager,
    ProjectAdmin,
}

impl Role {
    /// The database representation of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annotator => "annotator",
            Self::FirstTierReviewer => "first_tier_reviewer",
            Self::ProjectManager => "project_manager",
            Self::ProjectAdmin => "project_admin",
        }
    }

    /// Parse a role from its database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "annotator" => Some(Self::Annotator),
            "first_tier_reviewer" => Some(Self::FirstTierReviewer),
            "project_manager" => Some(Self::ProjectManager),
            "project_admin" => Some(Self::ProjectAdmin),
            _ => None,
        }
    }

    /// Whether this role sees every item when listing.
    #[must_use]
    pub const fn can_see_all(self) -> bool {
        matches!(
            self,
            Self::FirstTierReviewer | Self::ProjectManager | Self::ProjectAdmin
        )
    }

    /// Whether this role may approve or reject annotations at all.
    #[must_use]
    pub const fn can_review(self) -> bool {
        matches!(
            self,
            Self::FirstTierReviewer | Self::ProjectManager | Self::ProjectAdmin
        )
    }

    /// Whether this role may release a lock held by someone else.
    #[must_use]
    pub const fn can_force_unlock(self) -> bool {
        matches!(self, Self::ProjectManager | Self::ProjectAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project row.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An item row (the atomic unit of annotation work).
#[derive(Debug, Clone, Serialize)]
pub struct ItemRow {
    pub item_id: i64,
    pub project_id: i64,
    pub text: Option<String>,
    pub audio_minutes: Option<f64>,
}

/// A member row.
#[derive(Debug, Clone, Serialize)]
pub struct MemberRow {
    pub project_id: i64,
    pub username: String,
    pub role: Role,
}

/// Create a project and return its id.
pub fn create_project(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO projects (name, description, created_at) VALUES (?, ?, ?)",
        params![name, description, now.to_rfc3339()],
    )
    .context("Failed to insert project")?;
    Ok(conn.last_insert_rowid())
}

/// Get a project by id.
pub fn get_project(conn: &Connection, project_id: i64) -> Result<Option<ProjectRow>> {
    conn.query_row(
        "SELECT project_id, name, description, created_at FROM projects WHERE project_id = ?",
        params![project_id],
        project_from_row,
    )
    .optional()
    .context("Failed to query project")
}

/// List all projects, newest first.
pub fn list_projects(conn: &Connection) -> Result<Vec<ProjectRow>> {
    let mut stmt = conn
        .prepare("SELECT project_id, name, description, created_at FROM projects ORDER BY project_id DESC")
        .context("Failed to prepare list_projects query")?;
    let rows = stmt
        .query_map([], project_from_row)
        .context("Failed to execute list_projects query")?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.context("Failed to read project row")?);
    }
    Ok(results)
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        project_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_ts(row, 3)?,
    })
}

/// Add an item to a project and return its id.
pub fn add_item(
    conn: &Connection,
    project_id: i64,
    text: Option<&str>,
    audio_minutes: Option<f64>,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO items (project_id, text, audio_minutes, created_at) VALUES (?, ?, ?, ?)",
        params![project_id, text, audio_minutes, now.to_rfc3339()],
    )
    .context("Failed to insert item")?;
    Ok(conn.last_insert_rowid())
}

/// Get an item by id, scoped to a project.
pub fn get_item(conn: &Connection, project_id: i64, item_id: i64) -> Result<Option<ItemRow>> {
    conn.query_row(
        "SELECT item_id, project_id, text, audio_minutes FROM items
         WHERE project_id = ? AND item_id = ?",
        params![project_id, item_id],
        item_from_row,
    )
    .optional()
    .context("Failed to query item")
}

/// List all items in a project, ordered by id.
pub fn list_items(conn: &Connection, project_id: i64) -> Result<Vec<ItemRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT item_id, project_id, text, audio_minutes FROM items
             WHERE project_id = ? ORDER BY item_id",
        )
        .context("Failed to prepare list_items query")?;
    let rows = stmt
        .query_map(params![project_id], item_from_row)
        .context("Failed to execute list_items query")?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.context("Failed to read item row")?);
    }
    Ok(results)
}

/// List item ids in a project, ordered by id.
pub fn list_item_ids(conn: &Connection, project_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT item_id FROM items WHERE project_id = ? ORDER BY item_id")
        .context("Failed to prepare list_item_ids query")?;
    let rows = stmt
        .query_map(params![project_id], |row| row.get(0))
        .context("Failed to execute list_item_ids query")?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.context("Failed to read item id")?);
    }
    Ok(results)
}

/// Count items in a project.
pub fn count_items(conn: &Connection, project_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM items WHERE project_id = ?",
        params![project_id],
        |row| row.get(0),
    )
    .context("Failed to count items")
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        item_id: row.get(0)?,
        project_id: row.get(1)?,
        text: row.get(2)?,
        audio_minutes: row.get(3)?,
    })
}

/// Add a member to a project, or update their role if already present.
pub fn add_member(
    conn: &Connection,
    project_id: i64,
    username: &str,
    role: Role,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO members (project_id, username, role, added_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (project_id, username) DO UPDATE SET role = excluded.role",
        params![project_id, username, role.as_str(), now.to_rfc3339()],
    )
    .context("Failed to insert member")?;
    Ok(())
}

/// Look up a user's role in a project. `None` if not a member.
pub fn get_role(conn: &Connection, project_id: i64, username: &str) -> Result<Option<Role>> {
    let role: Option<String> = conn
        .query_row(
            "SELECT role FROM members WHERE project_id = ? AND username = ?",
            params![project_id, username],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query member role")?;

    Ok(role.as_deref().and_then(Role::parse))
}

/// List members of a project, ordered by role then username.
pub fn list_members(conn: &Connection, project_id: i64) -> Result<Vec<MemberRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT project_id, username, role FROM members
             WHERE project_id = ? ORDER BY role, username",
        )
        .context("Failed to prepare list_members query")?;
    let rows = stmt
        .query_map(params![project_id], |row| {
            let role: String = row.get(2)?;
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, role))
        })
        .context("Failed to execute list_members query")?;

    let mut results = Vec::new();
    for row in rows {
        let (project_id, username, role) = row.context("Failed to read member row")?;
        let role = Role::parse(&role)
            .with_context(|| format!("Unknown role in members table: {role}"))?;
        results.push(MemberRow {
            project_id,
            username,
            role,
        });
    }
    Ok(results)
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse an optional RFC 3339 timestamp column.
pub(crate) fn parse_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    })
    .transpose()
}
