//! # forge_core
//!
//! Data model and storage for Forge, the generative application synthesizer.
//!
//! This crate holds everything that does not talk to a language model:
//!
//! - **Types**: projects, schema entities, components, pages and chat messages
//! - **Replies**: the shapes the model is asked to return, including the
//!   tagged edit [`Action`] union
//! - **Normalizer**: tiered recovery of JSON from free-form model text
//! - **Stores**: the [`ArtifactStore`] trait with in-memory and filesystem
//!   implementations

pub mod error;
pub mod memory;
pub mod normalizer;
pub mod persistence;
pub mod reply;
pub mod store;
pub mod types;

pub use error::{ExtractionError, StoreError, StoreResult, Tier, TierFailure};
pub use memory::InMemoryStore;
pub use normalizer::{extract, extract_value};
pub use persistence::FileStore;
pub use reply::{
    summarize_actions, Action, ActionKind, ComponentDraft, EntityDraft, IterationReply, PageDraft,
};
pub use store::ArtifactStore;
pub use types::*;
