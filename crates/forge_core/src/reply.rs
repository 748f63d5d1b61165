//! Shapes the model is asked to produce.
//!
//! Model output is decoded straight into these types by the normalizer, so a
//! payload that parses as JSON but does not fit the shape counts as a failed
//! extraction tier rather than an error inside the apply loop.

use serde::{Deserialize, Serialize};

use crate::types::EntityFields;

/// One record of the schema stage output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityDraft {
    pub name: String,
    pub fields: EntityFields,
}

/// One record of the components stage output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentDraft {
    pub name: String,
    pub code: String,
}

/// One record of the pages stage output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDraft {
    pub name: String,
    pub route: String,
    pub code: String,
}

/// Kind of artifact an action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Page,
    Component,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Component => "component",
        }
    }
}

/// A typed edit returned by an iteration call.
///
/// Unknown `type` tags, a missing `code`, or a page without `route` all fail
/// decoding, which rejects the whole reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Page {
        name: String,
        route: String,
        code: String,
    },
    Component {
        name: String,
        code: String,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Page { .. } => ActionKind::Page,
            Self::Component { .. } => ActionKind::Component,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Page { name, .. } | Self::Component { name, .. } => name,
        }
    }

    /// Short label such as `Header (component)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name(), self.kind().as_str())
    }
}

/// Reply to an iteration prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IterationReply {
    #[serde(default)]
    pub message: Option<String>,
    pub actions: Vec<Action>,
}

impl IterationReply {
    /// The model's message, or a summary of the actions when it gave none
    pub fn message_or_summary(&self) -> String {
        match self.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => summarize_actions(&self.actions),
        }
    }
}

/// Fallback assistant message describing a batch of actions
pub fn summarize_actions(actions: &[Action]) -> String {
    if actions.is_empty() {
        return "No changes were needed.".to_string();
    }
    let labels: Vec<String> = actions.iter().map(Action::label).collect();
    format!("Applied {} change(s): {}", actions.len(), labels.join(", "))
}
