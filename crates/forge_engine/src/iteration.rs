//! Conversational edits to an existing project.

use std::sync::Arc;

use forge_core::{Action, ArtifactStore, ChatRole, IterationReply};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineResult, Phase};
use crate::gateway::{request_structured, ModelGateway};
use crate::prompts::{ActiveFile, PromptCompiler};

/// Result of one iteration turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationOutcome {
    /// Assistant reply recorded in the chat ledger
    pub message: String,
    /// Number of actions the model returned
    pub applied_count: usize,
}

/// Applies one user follow-up message to a project.
///
/// The turn runs in a fixed order:
///
/// 1. load the architecture and chat history
/// 2. record the user message
/// 3. ask the model for `{message, actions}`
/// 4. upsert each action in array order
/// 5. record the assistant reply
///
/// Nothing is wrapped in a transaction. If the model reply cannot be decoded
/// no artifact is touched, but the user message stays recorded. If an upsert
/// fails, the actions before it stay applied and no assistant reply is
/// recorded.
pub struct IterationEngine {
    store: Arc<dyn ArtifactStore>,
    gateway: Arc<dyn ModelGateway>,
    prompts: PromptCompiler,
}

impl IterationEngine {
    pub fn new(store: Arc<dyn ArtifactStore>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            store,
            gateway,
            prompts: PromptCompiler::new(),
        }
    }

    pub async fn apply(
        &self,
        project_id: &str,
        user_message: &str,
        active_file: Option<&ActiveFile>,
    ) -> EngineResult<IterationOutcome> {
        let architecture = self.store.load_architecture(project_id).await?;

        self.store
            .append_chat_message(project_id, ChatRole::User, user_message)
            .await?;

        let prompt = self
            .prompts
            .iteration_prompt(&architecture, user_message, active_file);
        let reply: IterationReply =
            request_structured(self.gateway.as_ref(), Phase::Iteration, &prompt).await?;

        info!(
            "Applying {} action(s) to project {}",
            reply.actions.len(),
            project_id
        );
        for action in &reply.actions {
            self.apply_action(project_id, action).await?;
        }

        let message = reply.message_or_summary();
        self.store
            .append_chat_message(project_id, ChatRole::Assistant, &message)
            .await?;

        Ok(IterationOutcome {
            message,
            applied_count: reply.actions.len(),
        })
    }

    async fn apply_action(&self, project_id: &str, action: &Action) -> EngineResult<()> {
        debug!("Upserting {}", action.label());
        match action {
            Action::Page { name, route, code } => {
                self.store.upsert_page(project_id, name, route, code).await?;
            }
            Action::Component { name, code } => {
                self.store.upsert_component(project_id, name, code).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::mock::ScriptedGateway;
    use forge_core::InMemoryStore;

    async fn setup(replies: &[&str]) -> (Arc<InMemoryStore>, ScriptedGateway, IterationEngine, String) {
        let store = Arc::new(InMemoryStore::new());
        let project = store.create_project("Todo", "Build a todo app").await.unwrap();
        let gateway = replies
            .iter()
            .fold(ScriptedGateway::new(), |g, r| g.with_reply(*r));
        let engine = IterationEngine::new(store.clone(), Arc::new(gateway.clone()));
        (store, gateway, engine, project.id)
    }

    #[tokio::test]
    async fn test_header_component_is_created_then_updated() {
        let (store, _, engine, project_id) = setup(&[
            r#"{"message":"Added a header","actions":[{"type":"component","name":"Header","code":"<h1>v1</h1>"}]}"#,
            r#"{"message":"Restyled the header","actions":[{"type":"component","name":"Header","code":"<h1>v2</h1>"}]}"#,
        ])
        .await;

        let first = engine.apply(&project_id, "Add a header", None).await.unwrap();
        assert_eq!(first.message, "Added a header");
        assert_eq!(first.applied_count, 1);

        engine.apply(&project_id, "Make the header bigger", None).await.unwrap();

        let arch = store.load_architecture(&project_id).await.unwrap();
        assert_eq!(arch.components.len(), 1);
        assert_eq!(arch.components[0].name, "Header");
        assert_eq!(arch.components[0].code, "<h1>v2</h1>");

        let roles: Vec<ChatRole> = arch.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
    }

    #[tokio::test]
    async fn test_last_action_wins_within_one_reply() {
        let (store, _, engine, project_id) = setup(&[r#"{
            "message": "Two takes",
            "actions": [
                {"type":"page","name":"Home","route":"/","code":"first"},
                {"type":"page","name":"Home","route":"/home","code":"second"}
            ]
        }"#])
        .await;

        let outcome = engine.apply(&project_id, "Add a home page", None).await.unwrap();
        assert_eq!(outcome.applied_count, 2);

        let arch = store.load_architecture(&project_id).await.unwrap();
        assert_eq!(arch.pages.len(), 1);
        assert_eq!(arch.pages[0].route, "/home");
        assert_eq!(arch.pages[0].code, "second");
    }

    #[tokio::test]
    async fn test_missing_message_gets_summary() {
        let (store, _, engine, project_id) =
            setup(&[r#"{"actions":[{"type":"component","name":"Footer","code":"f"}]}"#]).await;

        let outcome = engine.apply(&project_id, "Add a footer", None).await.unwrap();
        assert_eq!(outcome.message, "Applied 1 change(s): Footer (component)");

        let arch = store.load_architecture(&project_id).await.unwrap();
        assert_eq!(arch.messages.last().unwrap().content, outcome.message);
    }

    #[tokio::test]
    async fn test_unknown_action_type_rejects_whole_batch() {
        let (store, _, engine, project_id) = setup(&[r#"{
            "message": "Mixed",
            "actions": [
                {"type":"component","name":"Header","code":"h"},
                {"type":"entity","name":"Task","code":"t"}
            ]
        }"#])
        .await;

        let err = engine.apply(&project_id, "Do things", None).await.unwrap_err();
        assert!(matches!(err, EngineError::JsonExtraction { phase: Phase::Iteration, .. }));

        let arch = store.load_architecture(&project_id).await.unwrap();
        assert!(arch.components.is_empty());
        // The user message is recorded before the model is called
        assert_eq!(arch.messages.len(), 1);
        assert_eq!(arch.messages[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_history_excludes_current_message() {
        let (_, gateway, engine, project_id) = setup(&[
            r#"{"message":"one","actions":[]}"#,
            r#"{"message":"two","actions":[]}"#,
        ])
        .await;

        engine.apply(&project_id, "first instruction", None).await.unwrap();
        engine.apply(&project_id, "second instruction", None).await.unwrap();

        let prompts = gateway.prompts();
        assert!(!prompts[0].contains("Recent conversation"));
        assert!(prompts[1].contains("user: first instruction"));
        assert!(prompts[1].contains("assistant: one"));
        assert!(!prompts[1].contains("user: second instruction"));
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let (_, gateway, engine, _) = setup(&[r#"{"actions":[]}"#]).await;

        let err = engine.apply("missing", "hello", None).await.unwrap_err();
        assert!(matches!(err, EngineError::ProjectNotFound(_)));
        assert!(gateway.prompts().is_empty());
    }
}
