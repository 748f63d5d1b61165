//! CLI command definitions.
//!
//! Each subcommand maps to one operation of the synthesis service. Global
//! options select the workspace, the log format and, for offline runs, a
//! replay script that stands in for the model provider.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use forge_core::{ArtifactStore, FileStore, Project};
use forge_engine::{ForgeConfig, LlmAdapter, ModelGateway, ScriptedGateway, SynthesisService};

pub mod iterate;
pub mod new;
pub mod projects;
pub mod show;
pub mod synthesize;

/// Forge - synthesize applications from natural-language requests
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "Forge - synthesize applications from natural-language requests")]
#[command(long_about = r#"
Forge turns a free-text request into a data schema, reusable components and
pages, then applies follow-up edits through conversation.

WORKFLOW:
  new         → Create a draft project from a request
  synthesize  → Run schema → components → pages for a project
  iterate     → Apply a conversational edit
  show        → Print a project's architecture
  projects    → List projects in the workspace

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or unknown project
  3 - Model invocation failure
  4 - Structured output could not be extracted
  5 - Persistence failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Workspace directory holding `.forge/` (defaults to the current directory)
    #[arg(short, long, global = true, env = "FORGE_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Replay model responses from a JSON array instead of calling a provider
    #[arg(long, global = true, value_name = "FILE")]
    pub replay: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn workspace_root(&self) -> Result<PathBuf> {
        match &self.workspace {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir().context("Failed to resolve current directory"),
        }
    }

    pub fn store(&self) -> Result<Arc<dyn ArtifactStore>> {
        Ok(Arc::new(FileStore::new(self.workspace_root()?)))
    }

    /// Gateway from the replay script when given, the configured provider otherwise
    pub fn gateway(&self) -> Result<Arc<dyn ModelGateway>> {
        if let Some(path) = &self.replay {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read replay script {}", path.display()))?;
            let gateway = ScriptedGateway::from_json(&content)?;
            info!("Replaying {} scripted response(s) from {}", gateway.remaining(), path.display());
            return Ok(Arc::new(gateway));
        }

        let config = ForgeConfig::load(&self.workspace_root()?)
            .context("Failed to load LLM settings")?;
        let adapter = LlmAdapter::from_config(&config)
            .context("Failed to configure the model gateway")?;
        info!("Using {} ({})", adapter.provider().display_name(), adapter.model());
        Ok(Arc::new(adapter))
    }

    pub fn service(&self) -> Result<SynthesisService> {
        Ok(SynthesisService::new(self.store()?, self.gateway()?))
    }
}

/// Look up a project or fail with a not-found error
pub async fn require_project(store: &dyn ArtifactStore, project_id: &str) -> Result<Project> {
    match store.get_project(project_id).await? {
        Some(project) => Ok(project),
        None => Err(forge_engine::EngineError::ProjectNotFound(project_id.to_string()).into()),
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a draft project from a request
    New(new::NewArgs),

    /// Synthesize schema, components and pages for a project
    Synthesize(synthesize::SynthesizeArgs),

    /// Apply a conversational edit to a project
    Iterate(iterate::IterateArgs),

    /// Show a project's architecture
    Show(show::ShowArgs),

    /// List projects in the workspace
    Projects(projects::ProjectsArgs),
}
