use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transcript role. The system prompt travels separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of a structured message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Provider block kinds we don't model (thinking, server tools, ...).
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ContentBlock::Unknown)
    }
}

/// Message content: plain text or a list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: MessageContent::Blocks(blocks),
        }
    }
}

/// Uniform handler outcome.
///
/// Serializes flat: `{"success": bool, "error"?: str, ...payload}`. A failed
/// result always has an empty payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ToolResult {
    /// Successful result from any payload that serializes to a JSON object.
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(Value::Object(payload)) => Self {
                success: true,
                error: None,
                payload,
            },
            Ok(other) => Self::err(format!("Tool payload is not an object: {}", other)),
            Err(e) => Self::err(format!("Failed to serialize tool payload: {}", e)),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            payload: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.payload.len() + 2);
        map.insert("success".to_string(), Value::Bool(self.success));
        if let Some(error) = &self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        map.extend(self.payload.clone());
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Success,
    Error,
}

/// One executed tool call, shaped for the front-end cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub input: Value,
    pub output: Value,
    pub status: ToolCallStatus,
}

impl ToolCallRecord {
    /// `tc_` followed by 8 hex characters.
    pub fn new_id() -> String {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        format!("tc_{}", &uuid[..8])
    }
}

/// `POST /chat` body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// `POST /chat` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub role: Role,
    pub content: String,
    /// `null` when no tools ran.
    #[serde(rename = "toolCalls")]
    pub tool_calls: Option<Vec<ToolCallRecord>>,
}

impl ChatResponse {
    pub fn assistant(content: impl Into<String>, log: Vec<ToolCallRecord>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: (!log.is_empty()).then_some(log),
        }
    }
}
