//! # forge_engine
//!
//! Turns a natural-language request into an application description and
//! applies conversational edits to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ SynthesisService │────▶│ PromptCompiler  │────▶│  ModelGateway   │
//! └────────┬─────────┘     └─────────────────┘     └────────┬────────┘
//!          │                                                │ raw text
//!          │               ┌─────────────────┐              ▼
//!          │               │  ArtifactStore  │◀──── normalizer (forge_core)
//!          │               └─────────────────┘
//!          ├── StageOrchestrator: schema → components → pages
//!          └── IterationEngine:   {message, actions} upserts
//! ```
//!
//! Both the store and the gateway are injected as trait objects.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forge_core::FileStore;
//! use forge_engine::{ForgeConfig, LlmAdapter, SynthesisService};
//!
//! let config = ForgeConfig::load(&workspace)?;
//! let service = SynthesisService::new(
//!     Arc::new(FileStore::new(&workspace)),
//!     Arc::new(LlmAdapter::from_config(&config)?),
//! );
//!
//! let report = service.synthesize("Todo", "Build a todo app").await?;
//! service.apply_iteration(&report.project_id, "Add a header", None).await?;
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod iteration;
pub mod llm;
pub mod mock;
pub mod orchestrator;
pub mod prompts;
pub mod service;

pub use config::{ForgeConfig, LlmProvider};
pub use error::{EngineError, EngineResult, GatewayError, GatewayResult, Phase};
pub use gateway::ModelGateway;
pub use iteration::{IterationEngine, IterationOutcome};
pub use llm::{LlmAdapter, LlmResponse};
pub use mock::{ScriptedGateway, ScriptedReply};
pub use orchestrator::{StageOrchestrator, SynthesisReport, SynthesisStage};
pub use prompts::{ActiveFile, PromptCompiler, HISTORY_WINDOW};
pub use service::SynthesisService;
