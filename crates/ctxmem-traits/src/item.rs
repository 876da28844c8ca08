//! Conversation item model.
//!
//! Items enter the engine as loosely-shaped JSON objects (responses-API style)
//! and are parsed exactly once into [`ConversationItem`]. Everything past the
//! parse step matches on [`ItemBody`] instead of probing raw maps.
//!
//! Fields the engine does not understand are kept in
//! [`ConversationItem::provider_data`] and written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MemoryError, Result};

/// Coarse classification used by the turn grouper and the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    UserMessage,
    AssistantMessage,
    Reasoning,
    ToolCall,
    ToolResult,
    /// Provider item the engine carries along without interpreting.
    Other,
}

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Developer => "developer",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            "developer" => Some(Role::Developer),
            _ => None,
        }
    }
}

/// One block of structured message content (`{"type": "input_text", "text": ...}`).
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub block_type: String,
    pub text: Option<String>,
    pub extra: Map<String, Value>,
}

impl ContentBlock {
    pub fn text(block_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => {
                let block_type = match map.remove("type") {
                    Some(Value::String(kind)) => kind,
                    Some(other) => {
                        map.insert("type".to_string(), other);
                        "text".to_string()
                    }
                    None => "text".to_string(),
                };
                let text = match map.remove("text") {
                    Some(Value::String(text)) => Some(text),
                    Some(other) => {
                        map.insert("text".to_string(), other);
                        None
                    }
                    None => None,
                };
                Self {
                    block_type,
                    text,
                    extra: map,
                }
            }
            Value::String(text) => Self::text("text", text),
            other => {
                let mut extra = Map::new();
                extra.insert("value".to_string(), other);
                Self {
                    block_type: "unknown".to_string(),
                    text: None,
                    extra,
                }
            }
        }
    }

    fn into_value(self) -> Value {
        let mut map = self.extra;
        map.insert("type".to_string(), Value::String(self.block_type));
        if let Some(text) = self.text {
            map.insert("text".to_string(), Value::String(text));
        }
        Value::Object(map)
    }
}

/// Message content: plain text or structured blocks.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Content {
    /// Text fragments in order. Blocks without text (images, files) contribute nothing.
    pub fn fragments(&self) -> Vec<&str> {
        match self {
            Content::Text(text) => vec![text.as_str()],
            Content::Blocks(blocks) => blocks.iter().filter_map(|b| b.text.as_deref()).collect(),
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Content::Text(text),
            Value::Array(blocks) => {
                Content::Blocks(blocks.into_iter().map(ContentBlock::from_value).collect())
            }
            other => Content::Blocks(vec![ContentBlock::from_value(other)]),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Content::Text(text) => Value::String(text),
            Content::Blocks(blocks) => {
                Value::Array(blocks.into_iter().map(ContentBlock::into_value).collect())
            }
        }
    }
}

/// The closed set of item shapes the engine understands.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemBody {
    Message {
        role: Role,
        /// `None` when the provider sent no content at all.
        content: Option<Content>,
    },
    Reasoning {
        summary: Vec<ContentBlock>,
        /// Raw reasoning trace (`reasoning_text` blocks), when present.
        content: Option<Vec<ContentBlock>>,
    },
    ToolCall {
        call_id: String,
        name: String,
        arguments: Value,
    },
    ToolResult {
        call_id: String,
        name: Option<String>,
        output: Value,
    },
    /// Any other provider item (`web_search_call`, `item_reference`, ...).
    /// Its fields live in `provider_data`; it never anchors a turn and is
    /// never compacted.
    Other {
        item_type: String,
    },
}

/// A single entry of a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ConversationItem {
    pub body: ItemBody,
    /// Set once the payload has been replaced by a compaction placeholder.
    pub compacted: bool,
    /// Unrecognized provider fields, passed through unmodified.
    pub provider_data: Map<String, Value>,
}

impl ConversationItem {
    pub fn new(body: ItemBody) -> Self {
        Self {
            body,
            compacted: false,
            provider_data: Map::new(),
        }
    }

    pub fn message(role: Role, content: impl Into<String>) -> Self {
        Self::new(ItemBody::Message {
            role,
            content: Some(Content::Text(content.into())),
        })
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::message(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::message(Role::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::message(Role::System, content)
    }

    pub fn reasoning(summary: impl Into<String>) -> Self {
        Self::new(ItemBody::Reasoning {
            summary: vec![ContentBlock::text("summary_text", summary)],
            content: None,
        })
    }

    pub fn tool_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<Value>,
    ) -> Self {
        Self::new(ItemBody::ToolCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        })
    }

    pub fn tool_result(call_id: impl Into<String>, output: impl Into<Value>) -> Self {
        Self::new(ItemBody::ToolResult {
            call_id: call_id.into(),
            name: None,
            output: output.into(),
        })
    }

    pub fn kind(&self) -> ItemKind {
        match &self.body {
            ItemBody::Message {
                role: Role::User, ..
            } => ItemKind::UserMessage,
            ItemBody::Message { .. } => ItemKind::AssistantMessage,
            ItemBody::Reasoning { .. } => ItemKind::Reasoning,
            ItemBody::ToolCall { .. } => ItemKind::ToolCall,
            ItemBody::ToolResult { .. } => ItemKind::ToolResult,
            ItemBody::Other { .. } => ItemKind::Other,
        }
    }

    /// Whether this item starts a new user turn.
    pub fn is_user_anchored(&self) -> bool {
        self.kind() == ItemKind::UserMessage
    }

    pub fn role(&self) -> Option<Role> {
        match &self.body {
            ItemBody::Message { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match &self.body {
            ItemBody::ToolCall { call_id, .. } | ItemBody::ToolResult { call_id, .. } => {
                Some(call_id)
            }
            _ => None,
        }
    }

    /// Tool name carried by the item itself. Results usually carry none and
    /// must be resolved through their call.
    pub fn tool_name(&self) -> Option<&str> {
        match &self.body {
            ItemBody::ToolCall { name, .. } => Some(name),
            ItemBody::ToolResult { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    /// All textual content of the item, in order.
    pub fn text_fragments(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match &self.body {
            ItemBody::Message { content, .. } => {
                if let Some(content) = content {
                    out.extend(content.fragments());
                }
            }
            ItemBody::Reasoning { summary, content } => {
                let blocks = summary.iter().chain(content.iter().flatten());
                out.extend(blocks.filter_map(|b| b.text.as_deref()));
            }
            ItemBody::ToolCall { arguments, .. } => collect_strings(arguments, &mut out),
            ItemBody::ToolResult { output, .. } => collect_strings(output, &mut out),
            ItemBody::Other { .. } => self
                .provider_data
                .iter()
                .filter(|(key, _)| !IDENTITY_FIELDS.contains(&key.as_str()))
                .for_each(|(_, value)| collect_strings(value, &mut out)),
        }
        out
    }

    /// Textual content joined with newlines. Empty when the item has none.
    pub fn text(&self) -> String {
        self.text_fragments().join("\n")
    }
}

/// Bookkeeping fields of pass-through items that are not content.
const IDENTITY_FIELDS: &[&str] = &["id", "status"];

/// Collect string leaves. Objects carrying a string `text` field contribute
/// only that field, so block type tags are not counted as content.
fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(text) => out.push(text),
        Value::Array(values) => values.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push(text);
            } else {
                map.values().for_each(|v| collect_strings(v, out));
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(value)) => Some(value),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn take_call_id(map: &mut Map<String, Value>) -> Result<String> {
    take_string(map, "call_id")
        .or_else(|| take_string(map, "tool_call_id"))
        .ok_or_else(|| MemoryError::InvalidItem("tool item without call_id".to_string()))
}

fn tool_result_body(map: &mut Map<String, Value>) -> Result<ItemBody> {
    let call_id = take_call_id(map)?;
    let name = take_string(map, "name");
    let output = map
        .remove("output")
        .or_else(|| map.remove("content"))
        .unwrap_or_else(|| Value::String(String::new()));
    Ok(ItemBody::ToolResult {
        call_id,
        name,
        output,
    })
}

impl TryFrom<Value> for ConversationItem {
    type Error = MemoryError;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(MemoryError::InvalidItem(
                "expected a JSON object".to_string(),
            ));
        };

        let compacted = match map.remove("compacted") {
            Some(Value::Bool(flag)) => flag,
            Some(other) => {
                map.insert("compacted".to_string(), other);
                false
            }
            None => false,
        };

        let item_type = map.get("type").and_then(Value::as_str).map(str::to_owned);
        let body = match item_type.as_deref() {
            Some("function_call" | "custom_tool_call" | "tool_call") => {
                map.remove("type");
                let call_id = take_call_id(&mut map)?;
                let name = take_string(&mut map, "name").unwrap_or_else(|| "unknown".to_string());
                let arguments = map
                    .remove("arguments")
                    .or_else(|| map.remove("input"))
                    .unwrap_or_else(|| Value::String(String::new()));
                ItemBody::ToolCall {
                    call_id,
                    name,
                    arguments,
                }
            }
            Some("function_call_output" | "custom_tool_call_output" | "tool_result") => {
                map.remove("type");
                tool_result_body(&mut map)?
            }
            // Hosted tool outputs (`computer_call_output`, `local_shell_call_output`)
            // pair with their call like function outputs but keep their own type.
            Some(other) if other.ends_with("_call_output") && map.contains_key("call_id") => {
                tool_result_body(&mut map)?
            }
            Some("reasoning") => {
                map.remove("type");
                let summary = match map.remove("summary") {
                    Some(Value::Array(blocks)) => {
                        blocks.into_iter().map(ContentBlock::from_value).collect()
                    }
                    Some(other) => vec![ContentBlock::from_value(other)],
                    None => Vec::new(),
                };
                let content = match map.remove("content") {
                    Some(Value::Array(blocks)) => {
                        Some(blocks.into_iter().map(ContentBlock::from_value).collect())
                    }
                    Some(other) => {
                        map.insert("content".to_string(), other);
                        None
                    }
                    None => None,
                };
                ItemBody::Reasoning { summary, content }
            }
            // Messages keep their optional `type` tag in the provider payload.
            Some("message") | None => {
                let role = take_string(&mut map, "role")
                    .ok_or_else(|| MemoryError::InvalidItem("message without role".to_string()))?;
                let role = Role::parse(&role)
                    .ok_or_else(|| MemoryError::InvalidItem(format!("unknown role `{role}`")))?;
                let content = match map.remove("content") {
                    None => None,
                    Some(Value::Null) => {
                        map.insert("content".to_string(), Value::Null);
                        None
                    }
                    Some(value) => Some(Content::from_value(value)),
                };
                ItemBody::Message { role, content }
            }
            Some(other) => {
                let item_type = other.to_string();
                map.remove("type");
                ItemBody::Other { item_type }
            }
        };

        Ok(Self {
            body,
            compacted,
            provider_data: map,
        })
    }
}

fn blocks_value(blocks: Vec<ContentBlock>) -> Value {
    Value::Array(blocks.into_iter().map(ContentBlock::into_value).collect())
}

impl From<ConversationItem> for Value {
    fn from(item: ConversationItem) -> Self {
        let mut map = item.provider_data;
        match item.body {
            ItemBody::Message { role, content } => {
                map.insert("role".to_string(), Value::String(role.as_str().to_string()));
                if let Some(content) = content {
                    map.insert("content".to_string(), content.into_value());
                }
            }
            ItemBody::Reasoning { summary, content } => {
                map.insert("type".to_string(), Value::String("reasoning".to_string()));
                map.insert("summary".to_string(), blocks_value(summary));
                if let Some(content) = content {
                    map.insert("content".to_string(), blocks_value(content));
                }
            }
            ItemBody::ToolCall {
                call_id,
                name,
                arguments,
            } => {
                map.insert("type".to_string(), Value::String("function_call".to_string()));
                map.insert("call_id".to_string(), Value::String(call_id));
                map.insert("name".to_string(), Value::String(name));
                map.insert("arguments".to_string(), arguments);
            }
            ItemBody::ToolResult {
                call_id,
                name,
                output,
            } => {
                map.entry("type")
                    .or_insert_with(|| Value::String("function_call_output".to_string()));
                map.insert("call_id".to_string(), Value::String(call_id));
                if let Some(name) = name {
                    map.insert("name".to_string(), Value::String(name));
                }
                map.insert("output".to_string(), output);
            }
            ItemBody::Other { item_type } => {
                map.insert("type".to_string(), Value::String(item_type));
            }
        }
        if item.compacted {
            map.insert("compacted".to_string(), Value::Bool(true));
        }
        Value::Object(map)
    }
}
