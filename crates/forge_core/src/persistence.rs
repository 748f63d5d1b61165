//! Filesystem artifact store.
//!
//! Projects are stored in the workspace under `.forge/projects/<projectId>/`:
//! ```text
//! .forge/projects/<projectId>/
//! ├── project.json       # Project record (name, prompt, status)
//! ├── entities.jsonl     # Append-only schema records
//! ├── components.json    # Components, rewritten on upsert
//! ├── pages.json         # Pages, rewritten on upsert
//! └── messages.jsonl     # Append-only chat ledger
//! ```
//!
//! The store takes no locks. Callers serialize writes to a project.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::store::ArtifactStore;
use crate::types::{
    Architecture, ChatMessage, ChatRole, Component, Entity, EntityFields, Page, Project,
    ProjectStatus,
};

const PROJECT_FILE: &str = "project.json";
const ENTITIES_FILE: &str = "entities.jsonl";
const COMPONENTS_FILE: &str = "components.json";
const PAGES_FILE: &str = "pages.json";
const MESSAGES_FILE: &str = "messages.jsonl";

/// Artifact store backed by JSON files in a workspace
#[derive(Clone)]
pub struct FileStore {
    /// Root path of the workspace
    workspace_root: PathBuf,
}

impl FileStore {
    /// Create a store for a workspace
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }

    /// Get the workspace root path
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn projects_dir(&self) -> PathBuf {
        self.workspace_root.join(".forge").join("projects")
    }

    fn project_dir(&self, project_id: &str) -> PathBuf {
        self.projects_dir().join(project_id)
    }

    /// Directory of an existing project.
    ///
    /// Ids are generated UUIDs; anything else cannot name a project and is
    /// never joined into a path.
    fn existing_project_dir(&self, project_id: &str) -> StoreResult<PathBuf> {
        if uuid::Uuid::parse_str(project_id).is_err() {
            return Err(StoreError::ProjectNotFound(project_id.to_string()));
        }
        let dir = self.project_dir(project_id);
        if !dir.join(PROJECT_FILE).exists() {
            return Err(StoreError::ProjectNotFound(project_id.to_string()));
        }
        Ok(dir)
    }

    fn read_project(&self, dir: &Path) -> StoreResult<Project> {
        read_json(&dir.join(PROJECT_FILE))
    }

    fn write_project(&self, project: &Project) -> StoreResult<()> {
        write_json(&self.project_dir(&project.id).join(PROJECT_FILE), project)
    }
}

#[async_trait]
impl ArtifactStore for FileStore {
    async fn create_project(&self, name: &str, prompt: &str) -> StoreResult<Project> {
        let project = Project::new(name, prompt);
        let dir = self.project_dir(&project.id);
        fs::create_dir_all(&dir)?;

        self.write_project(&project)?;
        File::create(dir.join(ENTITIES_FILE))?;
        File::create(dir.join(MESSAGES_FILE))?;
        write_json(&dir.join(COMPONENTS_FILE), &Vec::<Component>::new())?;
        write_json(&dir.join(PAGES_FILE), &Vec::<Page>::new())?;

        Ok(project)
    }

    async fn get_project(&self, project_id: &str) -> StoreResult<Option<Project>> {
        match self.existing_project_dir(project_id) {
            Ok(dir) => Ok(Some(self.read_project(&dir)?)),
            Err(StoreError::ProjectNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let projects_dir = self.projects_dir();

        if !projects_dir.exists() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(projects_dir)? {
            let path = entry?.path();
            if path.join(PROJECT_FILE).exists() {
                projects.push(self.read_project(&path)?);
            }
        }

        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    async fn set_project_status(&self, project_id: &str, status: ProjectStatus) -> StoreResult<Project> {
        let dir = self.existing_project_dir(project_id)?;
        let mut project = self.read_project(&dir)?;
        project.status = status;
        project.updated_at = Utc::now();
        self.write_project(&project)?;
        Ok(project)
    }

    async fn create_entity(&self, project_id: &str, name: &str, fields: &EntityFields) -> StoreResult<Entity> {
        let dir = self.existing_project_dir(project_id)?;
        let entity = Entity::new(project_id, name, fields.clone());
        append_jsonl(&dir.join(ENTITIES_FILE), &entity)?;
        Ok(entity)
    }

    async fn upsert_component(&self, project_id: &str, name: &str, code: &str) -> StoreResult<Component> {
        let path = self.existing_project_dir(project_id)?.join(COMPONENTS_FILE);
        let mut components: Vec<Component> = read_json_or_default(&path)?;

        let component = match components.iter_mut().find(|c| c.name == name) {
            Some(existing) => {
                existing.code = code.to_string();
                existing.updated_at = Utc::now();
                existing.clone()
            }
            None => {
                let component = Component::new(project_id, name, code);
                components.push(component.clone());
                component
            }
        };

        write_json(&path, &components)?;
        Ok(component)
    }

    async fn upsert_page(&self, project_id: &str, name: &str, route: &str, code: &str) -> StoreResult<Page> {
        let path = self.existing_project_dir(project_id)?.join(PAGES_FILE);
        let mut pages: Vec<Page> = read_json_or_default(&path)?;

        let page = match pages.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                existing.route = route.to_string();
                existing.code = code.to_string();
                existing.updated_at = Utc::now();
                existing.clone()
            }
            None => {
                let page = Page::new(project_id, name, route, code);
                pages.push(page.clone());
                page
            }
        };

        write_json(&path, &pages)?;
        Ok(page)
    }

    async fn append_chat_message(&self, project_id: &str, role: ChatRole, content: &str) -> StoreResult<ChatMessage> {
        let dir = self.existing_project_dir(project_id)?;
        let message = ChatMessage::new(project_id, role, content);
        append_jsonl(&dir.join(MESSAGES_FILE), &message)?;
        Ok(message)
    }

    async fn load_architecture(&self, project_id: &str) -> StoreResult<Architecture> {
        let dir = self.existing_project_dir(project_id)?;

        Ok(Architecture {
            project: self.read_project(&dir)?,
            entities: read_jsonl(&dir.join(ENTITIES_FILE))?,
            components: read_json_or_default(&dir.join(COMPONENTS_FILE))?,
            pages: read_json_or_default(&dir.join(PAGES_FILE))?,
            messages: read_jsonl(&dir.join(MESSAGES_FILE))?,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> StoreResult<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(value)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            records.push(serde_json::from_str(&line)?);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_and_load_project() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        let project = store.create_project("todo", "Build a todo app").await.unwrap();
        let loaded = store.get_project(&project.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, project.id);
        assert_eq!(loaded.prompt, "Build a todo app");
        assert_eq!(loaded.status, ProjectStatus::Draft);
        assert!(temp.path().join(".forge/projects").join(&project.id).join("messages.jsonl").exists());
    }

    #[tokio::test]
    async fn test_artifacts_round_trip_through_files() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        let project = store.create_project("todo", "p").await.unwrap();

        let fields: EntityFields = [("title", FieldType::String), ("done", FieldType::Boolean)]
            .into_iter()
            .collect();
        store.create_entity(&project.id, "Task", &fields).await.unwrap();
        store.upsert_component(&project.id, "Header", "v1").await.unwrap();
        store.upsert_component(&project.id, "Header", "v2").await.unwrap();
        store.upsert_page(&project.id, "Home", "/", "<Home/>").await.unwrap();
        store.append_chat_message(&project.id, ChatRole::User, "Hello").await.unwrap();
        store.append_chat_message(&project.id, ChatRole::Assistant, "Hi there!").await.unwrap();

        // A fresh store instance sees the same state
        let arch = FileStore::new(temp.path()).load_architecture(&project.id).await.unwrap();
        assert_eq!(arch.entities.len(), 1);
        assert_eq!(arch.entities[0].fields, fields);
        assert_eq!(arch.components.len(), 1);
        assert_eq!(arch.components[0].code, "v2");
        assert_eq!(arch.pages[0].route, "/");
        assert_eq!(arch.messages.len(), 2);
        assert_eq!(arch.messages[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_list_projects() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());
        assert!(store.list_projects().await.unwrap().is_empty());

        store.create_project("one", "a").await.unwrap();
        store.create_project("two", "b").await.unwrap();

        assert_eq!(store.list_projects().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_project() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        assert!(store.get_project("nope").await.unwrap().is_none());
        let err = store.upsert_component("nope", "Header", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_the_workspace() {
        let temp = tempdir().unwrap();
        let other = FileStore::new(temp.path().join("other"));
        let foreign = other.create_project("foreign", "p").await.unwrap();

        let store = FileStore::new(temp.path().join("mine"));
        let escaping = format!("../../other/.forge/projects/{}", foreign.id);

        assert!(store.get_project(&escaping).await.unwrap().is_none());
        let err = store.upsert_component(&escaping, "Header", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::ProjectNotFound(_)));
        assert!(other.load_architecture(&foreign.id).await.unwrap().components.is_empty());
    }
}
