//! Project registry service — projects, items, members.
//!
//! Thin typed wrapper over the registry tables. The workflow services only
//! ever read from these; mutations here are the CRUD seam the engine
//! treats as a collaborator.

use chrono::Utc;

use crate::store::registry::{self, ItemRow, MemberRow, ProjectRow, Role};
use crate::store::TrackingDb;

use super::{CoreError, CoreResult};

/// Service for registry operations.
pub struct ProjectService<'a> {
    db: &'a TrackingDb,
}

impl<'a> ProjectService<'a> {
    pub(crate) const fn new(db: &'a TrackingDb) -> Self {
        Self { db }
    }

    /// Create a project and return its id.
    pub fn create(&self, name: &str, description: Option<&str>) -> CoreResult<i64> {
        registry::create_project(self.db.conn(), name, description, Utc::now())
            .map_err(CoreError::Internal)
    }

    /// Get a project by id.
    ///
    /// Returns `Err(CoreError::ProjectNotFound)` if it does not exist.
    pub fn get(&self, project_id: i64) -> CoreResult<ProjectRow> {
        registry::get_project(self.db.conn(), project_id)
            .map_err(CoreError::Internal)?
            .ok_or(CoreError::ProjectNotFound { project_id })
    }

    /// List all projects, newest first.
    pub fn list(&self) -> CoreResult<Vec<ProjectRow>> {
        registry::list_projects(self.db.conn()).map_err(CoreError::Internal)
    }

    /// Add an item to a project and return its id.
    pub fn add_item(
        &self,
        project_id: i64,
        text: Option<&str>,
        audio_minutes: Option<f64>,
    ) -> CoreResult<i64> {
        self.get(project_id)?;
        registry::add_item(self.db.conn(), project_id, text, audio_minutes, Utc::now())
            .map_err(CoreError::Internal)
    }

    /// List items in a project.
    pub fn list_items(&self, project_id: i64) -> CoreResult<Vec<ItemRow>> {
        self.get(project_id)?;
        registry::list_items(self.db.conn(), project_id).map_err(CoreError::Internal)
    }

    /// Add a member (or update their role) in a project.
    pub fn add_member(&self, project_id: i64, username: &str, role: Role) -> CoreResult<()> {
        self.get(project_id)?;
        registry::add_member(self.db.conn(), project_id, username, role, Utc::now())
            .map_err(CoreError::Internal)
    }

    /// List members of a project.
    pub fn list_members(&self, project_id: i64) -> CoreResult<Vec<MemberRow>> {
        self.get(project_id)?;
        registry::list_members(self.db.conn(), project_id).map_err(CoreError::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::AnnoServices;

    #[test]
    fn test_create_and_get() {
        let services = AnnoServices::in_memory(EngineConfig::default()).unwrap();
        let id = services.projects().create("KH_AB_A", None).unwrap();

        let project = services.projects().get(id).unwrap();
        assert_eq!(project.name, "KH_AB_A");

        let missing = services.projects().get(id + 1);
        assert!(matches!(missing, Err(CoreError::ProjectNotFound { .. })));
    }

    #[test]
    fn test_add_item_requires_project() {
        let services = AnnoServices::in_memory(EngineConfig::default()).unwrap();
        let result = services.projects().add_item(99, Some("x"), None);
        assert!(matches!(result, Err(CoreError::ProjectNotFound { .. })));
    }

    #[test]
    fn test_members_roundtrip() {
        let services = AnnoServices::in_memory(EngineConfig::default()).unwrap();
        let id = services.projects().create("p", None).unwrap();
        services
            .projects()
            .add_member(id, "alice", Role::Annotator)
            .unwrap();

        let members = services.projects().list_members(id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].username, "alice");
        assert_eq!(members[0].role, Role::Annotator);
    }
}
