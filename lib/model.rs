//! Entity and executor data model.
//!
//! Tools, prompts and resources are plain data records. Each tool and resource
//! carries exactly one [`Executor`], a closed sum of the three ways an entity
//! can produce its result.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
// Types: Kinds
//--------------------------------------------------------------------------------------------------

/// The three entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Tool,
    Prompt,
    Resource,
}

/// Common behavior of stored entities.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this entity lives in.
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);

    /// Bump `updated_at`.
    fn touch(&mut self);
}

//--------------------------------------------------------------------------------------------------
// Types: Executors
//--------------------------------------------------------------------------------------------------

/// How a tool or resource produces its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Executor {
    /// Return authored content verbatim.
    Static(StaticExecutor),
    /// Issue an HTTP request built from a template.
    Http(HttpExecutor),
    /// Run a user-authored `(params, context) => result` function in the sandbox.
    Function(FunctionExecutor),
}

/// Static payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticExecutor {
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    /// Editor hint kept for client UIs; not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_mode: Option<String>,
}

/// HTTP request template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpExecutor {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// User-authored function source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExecutor {
    pub code: String,
}

/// Content type of static payloads and execution output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Json,
}

//--------------------------------------------------------------------------------------------------
// Types: Entities
//--------------------------------------------------------------------------------------------------

/// A callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub input_schema: Value,
    pub executor: Executor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub template: String,
    pub arguments: Vec<PromptArgument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A declared prompt argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// A readable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub uri: String,
    pub mime_type: String,
    pub executor: Executor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Any stored entity, for kind-generic operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityRecord {
    Tool(Tool),
    Prompt(Prompt),
    Resource(Resource),
}

//--------------------------------------------------------------------------------------------------
// Types: Drafts & Patches
//--------------------------------------------------------------------------------------------------

/// Data for creating a tool. Unknown fields (`id`, timestamps) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
    pub executor: Executor,
}

/// Data for creating a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub template: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// Data for creating a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub uri: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    pub executor: Executor,
}

/// Partial tool update. `enabled` is changed through toggle only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
    pub executor: Option<Executor>,
}

/// Partial prompt update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template: Option<String>,
    pub arguments: Option<Vec<PromptArgument>>,
}

/// Partial resource update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub executor: Option<Executor>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl EntityKind {
    /// All kinds, in collection order.
    pub fn all() -> &'static [EntityKind] {
        &[EntityKind::Tool, EntityKind::Prompt, EntityKind::Resource]
    }

    /// Collection name used in documents and reports.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Tool => "tools",
            EntityKind::Prompt => "prompts",
            EntityKind::Resource => "resources",
        }
    }
}

impl Executor {
    /// Variant name as serialized in `type`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Executor::Static(_) => "static",
            Executor::Http(_) => "http",
            Executor::Function(_) => "function",
        }
    }
}

impl Tool {
    /// Build a new tool from a validated draft.
    pub fn from_draft(draft: ToolDraft) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: draft.name,
            description: draft.description,
            enabled: draft.enabled,
            input_schema: draft.input_schema,
            executor: draft.executor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Draft with this tool's current content.
    pub fn to_draft(&self) -> ToolDraft {
        ToolDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            input_schema: self.input_schema.clone(),
            executor: self.executor.clone(),
        }
    }

    /// Overwrite every mutable field. `id` and `created_at` are preserved.
    pub fn replace_with(&mut self, draft: ToolDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.enabled = draft.enabled;
        self.input_schema = draft.input_schema;
        self.executor = draft.executor;
        self.touch();
    }

    /// Draft that results from applying `patch`, without mutating self.
    pub fn patched(&self, patch: ToolPatch) -> ToolDraft {
        let mut draft = self.to_draft();
        if let Some(name) = patch.name {
            draft.name = name;
        }
        if let Some(description) = patch.description {
            draft.description = description;
        }
        if let Some(schema) = patch.input_schema {
            draft.input_schema = schema;
        }
        if let Some(executor) = patch.executor {
            draft.executor = executor;
        }
        draft
    }
}

impl Prompt {
    /// Build a new prompt from a validated draft.
    pub fn from_draft(draft: PromptDraft) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: draft.name,
            description: draft.description,
            enabled: draft.enabled,
            template: draft.template,
            arguments: draft.arguments,
            created_at: now,
            updated_at: now,
        }
    }

    /// Draft with this prompt's current content.
    pub fn to_draft(&self) -> PromptDraft {
        PromptDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            template: self.template.clone(),
            arguments: self.arguments.clone(),
        }
    }

    /// Overwrite every mutable field. `id` and `created_at` are preserved.
    pub fn replace_with(&mut self, draft: PromptDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.enabled = draft.enabled;
        self.template = draft.template;
        self.arguments = draft.arguments;
        self.touch();
    }

    /// Draft that results from applying `patch`, without mutating self.
    pub fn patched(&self, patch: PromptPatch) -> PromptDraft {
        let mut draft = self.to_draft();
        if let Some(name) = patch.name {
            draft.name = name;
        }
        if let Some(description) = patch.description {
            draft.description = description;
        }
        if let Some(template) = patch.template {
            draft.template = template;
        }
        if let Some(arguments) = patch.arguments {
            draft.arguments = arguments;
        }
        draft
    }
}

impl Resource {
    /// Build a new resource from a validated draft.
    pub fn from_draft(draft: ResourceDraft) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: draft.name,
            description: draft.description,
            enabled: draft.enabled,
            uri: draft.uri,
            mime_type: draft.mime_type,
            executor: draft.executor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Draft with this resource's current content.
    pub fn to_draft(&self) -> ResourceDraft {
        ResourceDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            uri: self.uri.clone(),
            mime_type: self.mime_type.clone(),
            executor: self.executor.clone(),
        }
    }

    /// Overwrite every mutable field. `id` and `created_at` are preserved.
    pub fn replace_with(&mut self, draft: ResourceDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.enabled = draft.enabled;
        self.uri = draft.uri;
        self.mime_type = draft.mime_type;
        self.executor = draft.executor;
        self.touch();
    }

    /// Draft that results from applying `patch`, without mutating self.
    pub fn patched(&self, patch: ResourcePatch) -> ResourceDraft {
        let mut draft = self.to_draft();
        if let Some(name) = patch.name {
            draft.name = name;
        }
        if let Some(description) = patch.description {
            draft.description = description;
        }
        if let Some(uri) = patch.uri {
            draft.uri = uri;
        }
        if let Some(mime_type) = patch.mime_type {
            draft.mime_type = mime_type;
        }
        if let Some(executor) = patch.executor {
            draft.executor = executor;
        }
        draft
    }
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Tool(_) => EntityKind::Tool,
            EntityRecord::Prompt(_) => EntityKind::Prompt,
            EntityRecord::Resource(_) => EntityKind::Resource,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityRecord::Tool(t) => t.id(),
            EntityRecord::Prompt(p) => p.id(),
            EntityRecord::Resource(r) => r.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntityRecord::Tool(t) => t.name(),
            EntityRecord::Prompt(p) => p.name(),
            EntityRecord::Resource(r) => r.name(),
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            EntityRecord::Tool(t) => t.enabled,
            EntityRecord::Prompt(p) => p.enabled,
            EntityRecord::Resource(r) => r.enabled,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            EntityRecord::Tool(t) => &t.description,
            EntityRecord::Prompt(p) => &p.description,
            EntityRecord::Resource(r) => &r.description,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

macro_rules! impl_entity {
    ($ty:ty, $kind:expr, $variant:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn enabled(&self) -> bool {
                self.enabled
            }

            fn set_enabled(&mut self, enabled: bool) {
                self.enabled = enabled;
            }

            fn touch(&mut self) {
                self.updated_at = Utc::now();
            }
        }

        impl From<$ty> for EntityRecord {
            fn from(entity: $ty) -> Self {
                EntityRecord::$variant(entity)
            }
        }
    };
}

impl_entity!(Tool, EntityKind::Tool, Tool);
impl_entity!(Prompt, EntityKind::Prompt, Prompt);
impl_entity!(Resource, EntityKind::Resource, Resource);

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Tool => write!(f, "Tool"),
            EntityKind::Prompt => write!(f, "Prompt"),
            EntityKind::Resource => write!(f, "Resource"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tool" | "tools" => Ok(EntityKind::Tool),
            "prompt" | "prompts" => Ok(EntityKind::Prompt),
            "resource" | "resources" => Ok(EntityKind::Resource),
            _ => Err(format!(
                "Unknown kind: '{}'. Use 'tool', 'prompt' or 'resource'.",
                s
            )),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Text => write!(f, "text"),
            ContentType::Json => write!(f, "json"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Generate a fresh opaque entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

fn default_input_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_executor_tagged_serialization() {
        let executor: Executor = serde_json::from_value(json!({
            "type": "http",
            "method": "POST",
            "url": "https://api.example.com/{{city}}",
            "headers": { "Authorization": "Bearer {{SECRET.token}}" }
        }))
        .unwrap();

        match &executor {
            Executor::Http(http) => {
                assert_eq!(http.method, "POST");
                assert_eq!(http.headers.len(), 1);
                assert!(http.body.is_none());
            }
            other => panic!("expected http executor, got {:?}", other),
        }

        let value = serde_json::to_value(&executor).unwrap();
        assert_eq!(value["type"], "http");
    }

    #[test]
    fn test_static_executor_defaults() {
        let executor: Executor =
            serde_json::from_value(json!({ "type": "static", "content": "hello" })).unwrap();
        assert_eq!(
            executor,
            Executor::Static(StaticExecutor {
                content: "hello".into(),
                content_type: ContentType::Text,
                editor_mode: None,
            })
        );
    }

    #[test]
    fn test_draft_ignores_record_fields() {
        let draft: ToolDraft = serde_json::from_value(json!({
            "id": "abc",
            "name": "weather",
            "createdAt": "2024-01-01T00:00:00Z",
            "executor": { "type": "function", "code": "(p) => p" }
        }))
        .unwrap();

        assert_eq!(draft.name, "weather");
        assert!(draft.enabled);
        assert_eq!(draft.input_schema["type"], "object");
    }

    #[test]
    fn test_patch_replaces_executor_wholesale() {
        let tool = Tool::from_draft(ToolDraft {
            name: "weather".into(),
            description: "Get weather".into(),
            enabled: false,
            input_schema: default_input_schema(),
            executor: Executor::Http(HttpExecutor {
                method: "GET".into(),
                url: "https://example.com".into(),
                headers: BTreeMap::from([("X-Key".to_string(), "1".to_string())]),
                body: None,
            }),
        });

        let draft = tool.patched(ToolPatch {
            executor: Some(Executor::Function(FunctionExecutor {
                code: "(params) => 1".into(),
            })),
            ..Default::default()
        });

        assert_eq!(draft.name, "weather");
        assert!(!draft.enabled);
        assert!(matches!(draft.executor, Executor::Function(_)));
    }

    #[test]
    fn test_replace_preserves_identity() {
        let mut prompt = Prompt::from_draft(PromptDraft {
            name: "greet".into(),
            description: String::new(),
            enabled: true,
            template: "Hi {{name}}".into(),
            arguments: vec![],
        });
        let id = prompt.id.clone();
        let created = prompt.created_at;

        prompt.replace_with(PromptDraft {
            name: "greet".into(),
            description: "updated".into(),
            enabled: false,
            template: "Hello {{name}}".into(),
            arguments: vec![],
        });

        assert_eq!(prompt.id, id);
        assert_eq!(prompt.created_at, created);
        assert_eq!(prompt.description, "updated");
        assert!(!prompt.enabled);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("tools".parse::<EntityKind>().unwrap(), EntityKind::Tool);
        assert_eq!("Prompt".parse::<EntityKind>().unwrap(), EntityKind::Prompt);
        assert!("widget".parse::<EntityKind>().is_err());
    }
}
