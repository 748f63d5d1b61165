//! Caller-facing entry points.
//!
//! Calls that touch the same project are serialized through a per-project
//! async lock, so two iterations on one project never interleave their
//! upserts. Calls on different projects run concurrently. A lock exists only
//! while some call holds or waits for it, and only for known projects.

use std::collections::HashMap;
use std::sync::Arc;

use forge_core::{Architecture, ArtifactStore, Project};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{EngineError, EngineResult};
use crate::gateway::ModelGateway;
use crate::iteration::{IterationEngine, IterationOutcome};
use crate::orchestrator::{StageOrchestrator, SynthesisReport};
use crate::prompts::ActiveFile;

type LockMap = parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Synthesis and iteration over a shared store and model gateway
pub struct SynthesisService {
    store: Arc<dyn ArtifactStore>,
    orchestrator: StageOrchestrator,
    iteration: IterationEngine,
    project_locks: LockMap,
}

/// Exclusive hold on one project; the map entry goes away with the last holder
struct ProjectLease<'a> {
    locks: &'a LockMap,
    project_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProjectLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        drop(self.guard.take());
        // Waiters hold their own clone, so a count of 1 means the map is the only owner
        if locks
            .get(&self.project_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.project_id);
        }
    }
}

impl SynthesisService {
    pub fn new(store: Arc<dyn ArtifactStore>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            orchestrator: StageOrchestrator::new(store.clone(), gateway.clone()),
            iteration: IterationEngine::new(store.clone(), gateway),
            store,
            project_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Wait for exclusive access to an existing project
    async fn lock_project(&self, project_id: &str) -> EngineResult<ProjectLease<'_>> {
        self.require_project(project_id).await?;

        let lock = self
            .project_locks
            .lock()
            .entry(project_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;

        Ok(ProjectLease {
            locks: &self.project_locks,
            project_id: project_id.to_string(),
            guard: Some(guard),
        })
    }

    /// Create a draft project for a request
    pub async fn create_project(&self, name: &str, prompt: &str) -> EngineResult<Project> {
        Ok(self.store.create_project(name, prompt).await?)
    }

    /// Run the staged synthesis of `prompt` into an existing project
    pub async fn start_synthesis(&self, project_id: &str, prompt: &str) -> EngineResult<SynthesisReport> {
        let _lease = self.lock_project(project_id).await?;
        self.orchestrator.run(project_id, prompt).await
    }

    /// Create a project and synthesize it from its prompt
    pub async fn synthesize(&self, name: &str, prompt: &str) -> EngineResult<SynthesisReport> {
        let project = self.create_project(name, prompt).await?;
        self.start_synthesis(&project.id, &project.prompt).await
    }

    /// Apply one conversational edit to a project
    pub async fn apply_iteration(
        &self,
        project_id: &str,
        message: &str,
        active_file: Option<&ActiveFile>,
    ) -> EngineResult<IterationOutcome> {
        let _lease = self.lock_project(project_id).await?;
        self.iteration.apply(project_id, message, active_file).await
    }

    pub async fn architecture(&self, project_id: &str) -> EngineResult<Architecture> {
        Ok(self.store.load_architecture(project_id).await?)
    }

    pub async fn list_projects(&self) -> EngineResult<Vec<Project>> {
        Ok(self.store.list_projects().await?)
    }

    async fn require_project(&self, project_id: &str) -> EngineResult<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayResult;
    use async_trait::async_trait;
    use forge_core::InMemoryStore;
    use std::time::Duration;

    /// Gateway that sleeps before replying, to widen interleaving windows
    struct SlowGateway;

    #[async_trait]
    impl ModelGateway for SlowGateway {
        async fn invoke(&self, prompt: &str) -> GatewayResult<String> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let code = if prompt.contains("User instruction:\nuse red") { "red" } else { "blue" };
            Ok(format!(
                r#"{{"message":"{code}","actions":[{{"type":"component","name":"Button","code":"{code}-1"}},{{"type":"component","name":"Button","code":"{code}-2"}}]}}"#
            ))
        }
    }

    #[tokio::test]
    async fn test_concurrent_iterations_on_one_project_are_serialized() {
        let store = Arc::new(InMemoryStore::new());
        let service = Arc::new(SynthesisService::new(store.clone(), Arc::new(SlowGateway)));
        let project = service.create_project("Demo", "Build a demo").await.unwrap();

        let a = {
            let service = service.clone();
            let id = project.id.clone();
            tokio::spawn(async move { service.apply_iteration(&id, "use red", None).await })
        };
        let b = {
            let service = service.clone();
            let id = project.id.clone();
            tokio::spawn(async move { service.apply_iteration(&id, "use blue", None).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let arch = store.load_architecture(&project.id).await.unwrap();
        assert_eq!(arch.components.len(), 1);
        assert!(arch.components[0].code.ends_with("-2"));

        // Each turn's user and assistant messages are adjacent
        let contents: Vec<&str> = arch.messages.iter().map(|m| m.content.as_str()).collect();
        assert!(
            contents == ["use red", "red", "use blue", "blue"]
                || contents == ["use blue", "blue", "use red", "red"],
            "{:?}",
            contents
        );
    }

    #[tokio::test]
    async fn test_unknown_ids_leave_no_locks_behind() {
        let service = SynthesisService::new(Arc::new(InMemoryStore::new()), Arc::new(SlowGateway));

        for i in 0..200 {
            let id = format!("unknown-{}", i);
            assert!(service.start_synthesis(&id, "p").await.is_err());
            assert!(service.apply_iteration(&id, "hello", None).await.is_err());
        }
        assert!(service.project_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_locks_are_released_after_use() {
        let store = Arc::new(InMemoryStore::new());
        let service = Arc::new(SynthesisService::new(store.clone(), Arc::new(SlowGateway)));
        let project = service.create_project("Demo", "Build a demo").await.unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                let id = project.id.clone();
                tokio::spawn(async move { service.apply_iteration(&id, &format!("edit {}", i), None).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(service.project_locks.lock().is_empty());
        assert_eq!(store.load_architecture(&project.id).await.unwrap().messages.len(), 8);
    }

    #[tokio::test]
    async fn test_start_synthesis_requires_project() {
        let service = SynthesisService::new(Arc::new(InMemoryStore::new()), Arc::new(SlowGateway));

        let err = service.start_synthesis("missing", "p").await.unwrap_err();
        assert!(matches!(err, EngineError::ProjectNotFound(_)));
    }
}
