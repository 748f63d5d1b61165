//! In-memory artifact store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::ArtifactStore;
use crate::types::{
    Architecture, ChatMessage, ChatRole, Component, Entity, EntityFields, Page, Project,
    ProjectId, ProjectStatus,
};

#[derive(Debug, Clone)]
struct ProjectRecord {
    project: Project,
    entities: Vec<Entity>,
    components: Vec<Component>,
    pages: Vec<Page>,
    messages: Vec<ChatMessage>,
}

impl ProjectRecord {
    fn new(project: Project) -> Self {
        Self {
            project,
            entities: Vec::new(),
            components: Vec::new(),
            pages: Vec::new(),
            messages: Vec::new(),
        }
    }
}

/// Artifact store held entirely in memory.
///
/// Cloning shares the underlying records.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    projects: Arc<RwLock<HashMap<ProjectId, ProjectRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_record<T>(
        &self,
        project_id: &str,
        f: impl FnOnce(&mut ProjectRecord) -> T,
    ) -> StoreResult<T> {
        let mut projects = self.projects.write().await;
        let record = projects
            .get_mut(project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))?;
        Ok(f(record))
    }
}

#[async_trait]
impl ArtifactStore for InMemoryStore {
    async fn create_project(&self, name: &str, prompt: &str) -> StoreResult<Project> {
        let project = Project::new(name, prompt);
        self.projects
            .write()
            .await
            .insert(project.id.clone(), ProjectRecord::new(project.clone()));
        Ok(project)
    }

    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .get(project_id)
            .map(|r| r.project.clone()))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .map(|r| r.project.clone())
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    async fn set_project_status(&self, project_id: &str, status: ProjectStatus) -> StoreResult<Project> {
        self.with_record(project_id, |record| {
            record.project.status = status;
            record.project.updated_at = Utc::now();
            record.project.clone()
        })
        .await
    }

    async fn create_entity(&self, project_id: &str, name: &str, fields: &EntityFields) -> StoreResult<Entity> {
        self.with_record(project_id, |record| {
            let entity = Entity::new(project_id, name, fields.clone());
            record.entities.push(entity.clone());
            entity
        })
        .await
    }

    async fn upsert_component(&self, project_id: &str, name: &str, code: &str) -> StoreResult<Component> {
        self.with_record(project_id, |record| {
            match record.components.iter_mut().find(|c| c.name == name) {
                Some(existing) => {
                    existing.code = code.to_string();
                    existing.updated_at = Utc::now();
                    existing.clone()
                }
                None => {
                    let component = Component::new(project_id, name, code);
                    record.components.push(component.clone());
                    component
                }
            }
        })
        .await
    }

    async fn upsert_page(&self, project_id: &str, name: &str, route: &str, code: &str) -> StoreResult<Page> {
        self.with_record(project_id, |record| {
            match record.pages.iter_mut().find(|p| p.name == name) {
                Some(existing) => {
                    existing.route = route.to_string();
                    existing.code = code.to_string();
                    existing.updated_at = Utc::now();
                    existing.clone()
                }
                None => {
                    let page = Page::new(project_id, name, route, code);
                    record.pages.push(page.clone());
                    page
                }
            }
        })
        .await
    }

    async fn append_chat_message(&self, project_id: &str, role: ChatRole, content: &str) -> StoreResult<ChatMessage> {
        self.with_record(project_id, |record| {
            let message = ChatMessage::new(project_id, role, content);
            record.messages.push(message.clone());
            message
        })
        .await
    }

    async fn load_architecture(&self, project_id: &str) -> StoreResult<Architecture> {
        let projects = self.projects.read().await;
        let record = projects
            .get(project_id)
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))?;
        Ok(Architecture {
            project: record.project.clone(),
            entities: record.entities.clone(),
            components: record.components.clone(),
            pages: record.pages.clone(),
            messages: record.messages.clone(),
        })
    }
}
