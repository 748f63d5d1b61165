//! Staged synthesis of a new project.
//!
//! Stages run strictly in order, each persisting its output before the next
//! prompt is compiled:
//!
//! ```text
//! schema ──▶ components ──▶ pages ──▶ completed
//! ```
//!
//! A failing stage stops the run. Artifacts written by earlier stages stay in
//! the store, and entities are appended rather than upserted, so running
//! synthesis again on the same project duplicates its schema.

use std::sync::Arc;

use forge_core::{
    ArtifactStore, Component, ComponentDraft, Entity, EntityDraft, Page, PageDraft, ProjectStatus,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{EngineResult, Phase};
use crate::gateway::{request_structured, ModelGateway};
use crate::prompts::PromptCompiler;

/// Step of the synthesis state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisStage {
    Schema,
    Components,
    Pages,
    Completed,
}

impl SynthesisStage {
    /// The stage that follows this one
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Schema => Some(Self::Components),
            Self::Components => Some(Self::Pages),
            Self::Pages => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Project status recorded while this stage runs
    pub fn status(self) -> ProjectStatus {
        match self {
            Self::Schema => ProjectStatus::GeneratingSchema,
            Self::Components => ProjectStatus::GeneratingComponents,
            Self::Pages => ProjectStatus::GeneratingPages,
            Self::Completed => ProjectStatus::Completed,
        }
    }
}

/// Artifacts persisted by one synthesis run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisReport {
    pub project_id: String,
    pub entities: Vec<Entity>,
    pub components: Vec<Component>,
    pub pages: Vec<Page>,
}

impl SynthesisReport {
    fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            entities: Vec::new(),
            components: Vec::new(),
            pages: Vec::new(),
        }
    }
}

/// Runs the schema, components and pages stages for a project
pub struct StageOrchestrator {
    store: Arc<dyn ArtifactStore>,
    gateway: Arc<dyn ModelGateway>,
    prompts: PromptCompiler,
}

impl StageOrchestrator {
    pub fn new(store: Arc<dyn ArtifactStore>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            store,
            gateway,
            prompts: PromptCompiler::new(),
        }
    }

    /// Synthesize the application described by `prompt` into `project_id`.
    ///
    /// On failure the project is marked `failed` when possible and the
    /// stage's error is returned unchanged.
    pub async fn run(&self, project_id: &str, prompt: &str) -> EngineResult<SynthesisReport> {
        info!("Starting synthesis for project {}", project_id);

        match self.run_stages(project_id, prompt).await {
            Ok(report) => {
                info!(
                    "Synthesis of {} completed: {} entities, {} components, {} pages",
                    project_id,
                    report.entities.len(),
                    report.components.len(),
                    report.pages.len()
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(status_err) = self
                    .store
                    .set_project_status(project_id, ProjectStatus::Failed)
                    .await
                {
                    warn!("Could not mark project {} as failed: {}", project_id, status_err);
                }
                Err(e)
            }
        }
    }

    async fn run_stages(&self, project_id: &str, prompt: &str) -> EngineResult<SynthesisReport> {
        let mut report = SynthesisReport::new(project_id);
        let mut stage = SynthesisStage::Schema;

        loop {
            self.store.set_project_status(project_id, stage.status()).await?;
            info!("Project {} entering {:?} stage", project_id, stage);

            match stage {
                SynthesisStage::Schema => {
                    report.entities = self.schema_stage(project_id, prompt).await?;
                }
                SynthesisStage::Components => {
                    report.components = self
                        .components_stage(project_id, prompt, &report.entities)
                        .await?;
                }
                SynthesisStage::Pages => {
                    report.pages = self
                        .pages_stage(project_id, prompt, &report.entities, &report.components)
                        .await?;
                }
                SynthesisStage::Completed => return Ok(report),
            }

            stage = match stage.next() {
                Some(next) => next,
                None => return Ok(report),
            };
        }
    }

    async fn schema_stage(&self, project_id: &str, prompt: &str) -> EngineResult<Vec<Entity>> {
        let compiled = self.prompts.schema_prompt(prompt);
        let drafts: Vec<EntityDraft> =
            request_structured(self.gateway.as_ref(), Phase::Schema, &compiled).await?;

        let mut entities = Vec::with_capacity(drafts.len());
        for draft in drafts {
            entities.push(
                self.store
                    .create_entity(project_id, &draft.name, &draft.fields)
                    .await?,
            );
        }
        Ok(entities)
    }

    async fn components_stage(
        &self,
        project_id: &str,
        prompt: &str,
        entities: &[Entity],
    ) -> EngineResult<Vec<Component>> {
        let compiled = self.prompts.components_prompt(prompt, entities);
        let drafts: Vec<ComponentDraft> =
            request_structured(self.gateway.as_ref(), Phase::Components, &compiled).await?;

        let mut components = Vec::with_capacity(drafts.len());
        for draft in drafts {
            components.push(
                self.store
                    .upsert_component(project_id, &draft.name, &draft.code)
                    .await?,
            );
        }
        Ok(components)
    }

    async fn pages_stage(
        &self,
        project_id: &str,
        prompt: &str,
        entities: &[Entity],
        components: &[Component],
    ) -> EngineResult<Vec<Page>> {
        let compiled = self.prompts.pages_prompt(prompt, entities, components);
        let drafts: Vec<PageDraft> =
            request_structured(self.gateway.as_ref(), Phase::Pages, &compiled).await?;

        let mut pages = Vec::with_capacity(drafts.len());
        for draft in drafts {
            pages.push(
                self.store
                    .upsert_page(project_id, &draft.name, &draft.route, &draft.code)
                    .await?,
            );
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, GatewayError};
    use crate::gateway::MockModelGateway;
    use crate::mock::ScriptedGateway;
    use forge_core::{FieldType, InMemoryStore};

    const SCHEMA: &str = r#"[{"name":"Task","fields":{"title":"String","done":"Boolean"}}]"#;
    const COMPONENTS: &str = r#"[{"name":"TaskList","code":"<ul/>"}]"#;
    const PAGES: &str = r#"[{"name":"Home","route":"/","code":"<Home/>"},{"name":"Tasks API","route":"/api/tasks","code":"handler"}]"#;

    #[test]
    fn test_stage_sequence() {
        let mut stages = vec![SynthesisStage::Schema];
        while let Some(next) = stages.last().and_then(|s| s.next()) {
            stages.push(next);
        }
        assert_eq!(
            stages,
            vec![
                SynthesisStage::Schema,
                SynthesisStage::Components,
                SynthesisStage::Pages,
                SynthesisStage::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_full_run_persists_every_stage() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = ScriptedGateway::new()
            .with_reply(SCHEMA)
            .with_reply(format!("```json\n{}\n```", COMPONENTS))
            .with_reply(PAGES);
        let project = store.create_project("Todo", "Build a todo app").await.unwrap();

        let orchestrator = StageOrchestrator::new(store.clone(), Arc::new(gateway.clone()));
        let report = orchestrator.run(&project.id, "Build a todo app").await.unwrap();

        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.components.len(), 1);
        assert_eq!(report.pages.len(), 2);

        let arch = store.load_architecture(&project.id).await.unwrap();
        assert_eq!(arch.project.status, ProjectStatus::Completed);
        assert_eq!(arch.entities[0].fields.get("done"), Some(FieldType::Boolean));

        // Later prompts see earlier output
        let prompts = gateway.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains("- Task { title: String, done: Boolean }"));
        assert!(prompts[2].contains("- TaskList"));
    }

    #[tokio::test]
    async fn test_gateway_failure_stops_before_later_stages() {
        let store = Arc::new(InMemoryStore::new());
        let project = store.create_project("Todo", "Build a todo app").await.unwrap();

        let mut gateway = MockModelGateway::new();
        let mut seq = mockall::Sequence::new();
        gateway
            .expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(SCHEMA.to_string()));
        gateway
            .expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(GatewayError::Api {
                provider: "OpenAI".to_string(),
                status: 429,
                body: "quota".to_string(),
            }));

        let orchestrator = StageOrchestrator::new(store.clone(), Arc::new(gateway));
        let err = orchestrator.run(&project.id, "Build a todo app").await.unwrap_err();

        assert!(matches!(err, EngineError::ModelInvocation { phase: Phase::Components, .. }));
        let arch = store.load_architecture(&project.id).await.unwrap();
        assert_eq!(arch.project.status, ProjectStatus::Failed);
        assert_eq!(arch.entities.len(), 1);
        assert!(arch.components.is_empty());
        assert!(arch.pages.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_field_type_fails_schema_stage() {
        let store = Arc::new(InMemoryStore::new());
        let project = store.create_project("Todo", "p").await.unwrap();
        let gateway = ScriptedGateway::new().with_reply(r#"[{"name":"Task","fields":{"title":"Text"}}]"#);

        let orchestrator = StageOrchestrator::new(store.clone(), Arc::new(gateway));
        let err = orchestrator.run(&project.id, "p").await.unwrap_err();

        assert!(matches!(err, EngineError::JsonExtraction { phase: Phase::Schema, .. }));
        assert!(store.load_architecture(&project.id).await.unwrap().entities.is_empty());
    }

    #[tokio::test]
    async fn test_missing_project() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = ScriptedGateway::new().with_reply(SCHEMA);

        let orchestrator = StageOrchestrator::new(store, Arc::new(gateway.clone()));
        let err = orchestrator.run("missing", "p").await.unwrap_err();

        assert!(matches!(err, EngineError::ProjectNotFound(_)));
        assert!(gateway.prompts().is_empty());
    }
}
