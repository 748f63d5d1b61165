//! Core types for the artifact graph of a generated application.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unique identifier for a project
pub type ProjectId = String;

/// Lifecycle of a project through synthesis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Created, synthesis not started
    Draft,
    GeneratingSchema,
    GeneratingComponents,
    GeneratingPages,
    /// All stages persisted
    Completed,
    /// A stage raised an error; earlier artifacts are kept
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::GeneratingSchema => "generating_schema",
            Self::GeneratingComponents => "generating_components",
            Self::GeneratingPages => "generating_pages",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level unit of generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    /// Display name
    pub name: String,
    /// Free-text request the application is synthesized from
    pub prompt: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new draft project
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            prompt: prompt.into(),
            status: ProjectStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Closed set of field types a generated schema may use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int,
    Boolean,
    DateTime,
    Json,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::String,
        FieldType::Int,
        FieldType::Boolean,
        FieldType::DateTime,
        FieldType::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Int => "Int",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Json => "Json",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping from field name to field type.
///
/// Serialized as a JSON object; declaration order is kept on both sides.
/// A repeated name replaces the earlier type in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFields(Vec<(String, FieldType)>);

impl EntityFields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a field, replacing the type of an existing one with the same name
    pub fn insert(&mut self, name: impl Into<String>, field_type: FieldType) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = field_type,
            None => self.0.push((name, field_type)),
        }
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.0.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, FieldType)> for EntityFields {
    fn from_iter<I: IntoIterator<Item = (S, FieldType)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (name, field_type) in iter {
            fields.insert(name, field_type);
        }
        fields
    }
}

impl Serialize for EntityFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, field_type) in &self.0 {
            map.serialize_entry(name, field_type)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EntityFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = EntityFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to field types")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = EntityFields::new();
                while let Some((name, field_type)) = access.next_entry::<String, FieldType>()? {
                    fields.insert(name, field_type);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// A generated data-schema record.
///
/// Entities are append-only: nothing keys them, so repeated synthesis runs
/// on the same project accumulate rows with the same name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub project_id: ProjectId,
    pub name: String,
    pub fields: EntityFields,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>, fields: EntityFields) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            name: name.into(),
            fields,
            created_at: Utc::now(),
        }
    }
}

/// A generated UI component, upserted by `(project_id, name)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub project_id: ProjectId,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Component {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            name: name.into(),
            code: code.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A generated page or API route, upserted by `(project_id, name)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub project_id: ProjectId,
    pub name: String,
    pub route: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        route: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            name: name.into(),
            route: route.into(),
            code: code.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the route serves an API endpoint rather than a view
    pub fn is_api_route(&self) -> bool {
        self.route == "/api" || self.route.starts_with("/api/")
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry of a project's append-only conversation ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub project_id: ProjectId,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(project_id: impl Into<String>, role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Snapshot of everything a project owns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    pub project: Project,
    pub entities: Vec<Entity>,
    pub components: Vec<Component>,
    pub pages: Vec<Page>,
    /// Ordered oldest first
    pub messages: Vec<ChatMessage>,
}

impl Architecture {
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.name == name)
    }

    /// The last `count` messages, oldest first
    pub fn recent_messages(&self, count: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }
}
