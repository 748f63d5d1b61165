//! Artifact store interface.
//!
//! The orchestrator and the iteration engine receive the store as an
//! injected trait object so tests can run against [`crate::InMemoryStore`].

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    Architecture, ChatMessage, ChatRole, Component, Entity, EntityFields, Page, Project,
    ProjectStatus,
};

/// Durable storage for projects and their artifacts.
///
/// Every project-scoped operation fails with
/// [`crate::StoreError::ProjectNotFound`] when the project does not exist.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create a new draft project
    async fn create_project(&self, name: &str, prompt: &str) -> StoreResult<Project>;

    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>>;

    /// All projects, oldest first
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;

    async fn set_project_status(&self, project_id: &str, status: ProjectStatus) -> StoreResult<Project>;

    /// Append an entity. No uniqueness check is made on `name`.
    async fn create_entity(&self, project_id: &str, name: &str, fields: &EntityFields) -> StoreResult<Entity>;

    /// Create or update the component keyed by `(project_id, name)`
    async fn upsert_component(&self, project_id: &str, name: &str, code: &str) -> StoreResult<Component>;

    /// Create or update the page keyed by `(project_id, name)`
    async fn upsert_page(&self, project_id: &str, name: &str, route: &str, code: &str) -> StoreResult<Page>;

    /// Append to the project's conversation ledger
    async fn append_chat_message(&self, project_id: &str, role: ChatRole, content: &str) -> StoreResult<ChatMessage>;

    /// Load the project together with all of its artifacts and messages
    async fn load_architecture(&self, project_id: &str) -> StoreResult<Architecture>;
}
