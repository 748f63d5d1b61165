//! Prompt compilation for each generation step.
//!
//! Only string assembly happens here. The single piece of policy is the
//! conversation window: iteration prompts carry the last
//! [`HISTORY_WINDOW`] messages.

use forge_core::{Architecture, Component, Entity, FieldType};
use serde::{Deserialize, Serialize};

/// Number of prior chat messages embedded in an iteration prompt
pub const HISTORY_WINDOW: usize = 5;

/// A file the user currently has open in the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFile {
    pub path: String,
    pub content: String,
}

impl ActiveFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Builds the instruction text sent to the model
#[derive(Debug, Clone)]
pub struct PromptCompiler {
    history_window: usize,
}

impl Default for PromptCompiler {
    fn default() -> Self {
        Self {
            history_window: HISTORY_WINDOW,
        }
    }
}

impl PromptCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema stage: a JSON array of `{name, fields}`
    pub fn schema_prompt(&self, request: &str) -> String {
        let types: Vec<&str> = FieldType::ALL.iter().map(FieldType::as_str).collect();
        format!(
            r#"You are designing the data model for a new web application.

User request:
{request}

Return a JSON array of entities. Each entity is an object with:
- "name": a singular PascalCase entity name
- "fields": an object mapping camelCase field names to one of these types: {types}

Example:
[{{"name": "Task", "fields": {{"title": "String", "done": "Boolean"}}}}]

Return only the JSON array."#,
            request = request.trim(),
            types = types.join(", "),
        )
    }

    /// Components stage: a JSON array of `{name, code}`
    pub fn components_prompt(&self, request: &str, entities: &[Entity]) -> String {
        format!(
            r#"You are building the reusable UI components of a web application.

User request:
{request}

Data schema:
{schema}

Return a JSON array of components. Each component is an object with:
- "name": a PascalCase component name
- "code": the complete React component source as a string

Return only the JSON array."#,
            request = request.trim(),
            schema = render_schema(entities),
        )
    }

    /// Pages stage: a JSON array of `{name, route, code}`
    pub fn pages_prompt(&self, request: &str, entities: &[Entity], components: &[Component]) -> String {
        format!(
            r#"You are building the pages and API routes of a web application.

User request:
{request}

Data schema:
{schema}

Available components:
{components}

Return a JSON array of pages. Each page is an object with:
- "name": a human readable page name
- "route": the URL path, e.g. "/tasks"; API routes start with "/api/"
- "code": the complete source as a string

Return only the JSON array."#,
            request = request.trim(),
            schema = render_schema(entities),
            components = render_names(components.iter().map(|c| c.name.as_str())),
        )
    }

    /// Iteration: a single `{message, actions}` object
    pub fn iteration_prompt(
        &self,
        architecture: &Architecture,
        instruction: &str,
        active_file: Option<&ActiveFile>,
    ) -> String {
        let pages: Vec<String> = architecture
            .pages
            .iter()
            .map(|p| format!("{} ({})", p.name, p.route))
            .collect();

        let mut prompt = format!(
            r#"You are editing an existing web application named "{name}".

Original request:
{request}

Data schema:
{schema}

Components:
{components}

Pages:
{pages}

"#,
            name = architecture.project.name,
            request = architecture.project.prompt.trim(),
            schema = render_schema(&architecture.entities),
            components = render_names(architecture.components.iter().map(|c| c.name.as_str())),
            pages = render_names(pages.iter().map(String::as_str)),
        );

        let history = architecture.recent_messages(self.history_window);
        if !history.is_empty() {
            prompt.push_str("Recent conversation:\n");
            for message in history {
                prompt.push_str(&format!("{}: {}\n", message.role.as_str(), message.content));
            }
            prompt.push('\n');
        }

        if let Some(file) = active_file {
            prompt.push_str(&format!(
                "The user is currently viewing {}:\n```\n{}\n```\n\n",
                file.path, file.content
            ));
        }

        prompt.push_str(&format!("User instruction:\n{}\n\n", instruction.trim()));
        prompt.push_str(ITERATION_FORMAT);
        prompt
    }
}

const ITERATION_FORMAT: &str = r#"Respond with a single JSON object:
{
  "message": "short summary of what you changed",
  "actions": [
    {"type": "component", "name": "Header", "code": "..."},
    {"type": "page", "name": "Home", "route": "/", "code": "..."}
  ]
}
Each action replaces the full code of the component or page with that name, creating it if it does not exist.
"type" is either "page" or "component"; pages require "route".
Return only the JSON object."#;

fn render_schema(entities: &[Entity]) -> String {
    if entities.is_empty() {
        return "(none)".to_string();
    }
    entities
        .iter()
        .map(|e| {
            let fields: Vec<String> = e.fields.iter().map(|(n, t)| format!("{}: {}", n, t)).collect();
            format!("- {} {{ {} }}", e.name, fields.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<String> = names.map(|n| format!("- {}", n)).collect();
    if lines.is_empty() {
        "(none)".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{ChatMessage, ChatRole, EntityFields, Page, Project};

    fn architecture(message_count: usize) -> Architecture {
        let project = Project::new("Todo", "Build a todo app");
        let fields: EntityFields = [("title", FieldType::String), ("done", FieldType::Boolean)]
            .into_iter()
            .collect();
        let messages = (0..message_count)
            .map(|i| {
                let role = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
                ChatMessage::new(&project.id, role, format!("message-{}", i))
            })
            .collect();

        Architecture {
            entities: vec![Entity::new(&project.id, "Task", fields)],
            components: vec![Component::new(&project.id, "TaskList", "...")],
            pages: vec![Page::new(&project.id, "Tasks API", "/api/tasks", "...")],
            messages,
            project,
        }
    }

    #[test]
    fn test_schema_prompt_lists_type_vocabulary() {
        let prompt = PromptCompiler::new().schema_prompt("Build a todo app");

        assert!(prompt.contains("Build a todo app"));
        assert!(prompt.contains("String, Int, Boolean, DateTime, Json"));
    }

    #[test]
    fn test_stage_prompts_embed_prior_output() {
        let arch = architecture(0);
        let compiler = PromptCompiler::new();

        let components = compiler.components_prompt("Build a todo app", &arch.entities);
        assert!(components.contains("- Task { title: String, done: Boolean }"));

        let pages = compiler.pages_prompt("Build a todo app", &arch.entities, &arch.components);
        assert!(pages.contains("- Task {"));
        assert!(pages.contains("- TaskList"));
    }

    #[test]
    fn test_iteration_prompt_keeps_last_five_messages() {
        let arch = architecture(8);
        let prompt = PromptCompiler::new().iteration_prompt(&arch, "Add a header", None);

        for dropped in ["message-0", "message-1", "message-2"] {
            assert!(!prompt.contains(dropped), "{} should be outside the window", dropped);
        }
        let first = prompt.find("message-3").unwrap();
        let last = prompt.find("message-7").unwrap();
        assert!(first < last);
        assert!(prompt.contains("user: message-4"));
        assert!(prompt.contains("assistant: message-3"));
    }

    #[test]
    fn test_iteration_prompt_describes_architecture() {
        let arch = architecture(0);
        let prompt = PromptCompiler::new().iteration_prompt(&arch, "Add a header", None);

        assert!(prompt.contains("- TaskList"));
        assert!(prompt.contains("- Tasks API (/api/tasks)"));
        assert!(prompt.contains("User instruction:\nAdd a header"));
        assert!(!prompt.contains("Recent conversation"));
        assert!(!prompt.contains("currently viewing"));
    }

    #[test]
    fn test_iteration_prompt_includes_active_file() {
        let arch = architecture(1);
        let file = ActiveFile::new("components/Header.tsx", "export const Header = () => null;");
        let prompt = PromptCompiler::new().iteration_prompt(&arch, "Make it blue", Some(&file));

        assert!(prompt.contains("currently viewing components/Header.tsx"));
        assert!(prompt.contains("export const Header = () => null;"));
    }

    #[test]
    fn test_iteration_prompt_section_order() {
        let arch = architecture(2);
        let file = ActiveFile::new("pages/api/tasks.ts", "handler");
        let prompt = PromptCompiler::new().iteration_prompt(&arch, "  Add paging  ", Some(&file));

        assert!(prompt.starts_with("You are editing an existing web application named \"Todo\".\n\n"));
        assert!(prompt.contains("Pages:\n- Tasks API (/api/tasks)\n\nRecent conversation:\nuser: message-0\nassistant: message-1\n\n"));
        assert!(prompt.contains("```\nhandler\n```\n\nUser instruction:\nAdd paging\n\n"));

        let order: Vec<usize> = [
            "Original request:",
            "Data schema:",
            "Components:",
            "Pages:",
            "Recent conversation:",
            "currently viewing",
            "User instruction:",
        ]
        .iter()
        .map(|section| prompt.find(section).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }
}
