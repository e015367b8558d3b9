//! Wire types for Anthropic's Messages API.
//!
//! These mirror the request/response/stream-event shapes documented at
//! <https://docs.anthropic.com/en/api/messages>. Unknown fields on inbound
//! requests are tolerated via `Option`/`#[serde(default)]` rather than a
//! schema validator.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `max_tokens` default when the client omits it.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Request body for `POST /v1/messages` and `POST /v1/messages/count_tokens`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagesRequest {
    pub model: String,

    pub messages: Vec<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemPrompt>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

impl MessagesRequest {
    /// `max_tokens`, falling back to [`DEFAULT_MAX_TOKENS`] when the client
    /// omits it.
    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// `system` may be a plain string or a list of text blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Text(String),
    Blocks(Vec<Content>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,

    /// `content` may be a plain string or an array of content blocks. We
    /// always normalize to the array form for translation, but accept both
    /// on the way in.
    pub content: MessageContent,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<Content>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content block in an Anthropic message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image")]
    Image { source: ImageSource },

    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: ToolResultContent,
    },
}

/// `tool_result.content` may be a plain string or an array of blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ToolResultBlock>),
}

impl Default for ToolResultContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ToolResultBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "error")]
    Error { error: String },
}

/// An image block's `source`: either inline base64 data or a remote URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Any,
    Tool { name: String },
}

/// Response body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub r#type: String,
    pub role: Role,
    pub content: Vec<Content>,
    pub model: String,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndTurn => write!(f, "end_turn"),
            StopReason::MaxTokens => write!(f, "max_tokens"),
            StopReason::StopSequence => write!(f, "stop_sequence"),
            StopReason::ToolUse => write!(f, "tool_use"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: i32,
    pub output_tokens: i32,
}

/// Response body for `POST /v1/messages/count_tokens`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountTokensResponse {
    pub input_tokens: u64,
}

/// Error envelope matching Anthropic's `{"type": "error", "error": {...}}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Streaming event types for Anthropic SSE responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: StreamMessageStart },

    #[serde(rename = "content_block_start")]
    ContentBlockStart { index: u32, content_block: Content },

    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: u32, delta: ContentDelta },

    #[serde(rename = "content_block_stop")]
    ContentBlockStop { index: u32 },

    #[serde(rename = "message_delta")]
    MessageDelta { delta: MessageDelta, usage: PartialUsage },

    #[serde(rename = "message_stop")]
    MessageStop,

    #[serde(rename = "ping")]
    Ping,

    #[serde(rename = "error")]
    Error { error: ErrorDetails },
}

impl StreamEvent {
    /// The SSE `event:` line name for this event, matching the `type` tag.
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::MessageStart { .. } => "message_start",
            StreamEvent::ContentBlockStart { .. } => "content_block_start",
            StreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            StreamEvent::ContentBlockStop { .. } => "content_block_stop",
            StreamEvent::MessageDelta { .. } => "message_delta",
            StreamEvent::MessageStop => "message_stop",
            StreamEvent::Ping => "ping",
            StreamEvent::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessageStart {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub role: Role,
    pub content: Vec<Content>,
    pub model: String,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },

    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
}

/// `message_delta.usage` only ever carries `output_tokens` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialUsage {
    pub output_tokens: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_string_and_block_content() {
        let as_string: Message = serde_json::from_value(json!({
            "role": "user",
            "content": "hi there"
        }))
        .unwrap();
        assert!(matches!(as_string.content, MessageContent::Text(ref s) if s == "hi there"));

        let as_blocks: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "hi there"}]
        }))
        .unwrap();
        assert!(matches!(as_blocks.content, MessageContent::Blocks(ref b) if b.len() == 1));
    }

    #[test]
    fn serializes_tool_choice_variants() {
        assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap()["type"], "auto");
        assert_eq!(serde_json::to_value(ToolChoice::Any).unwrap()["type"], "any");
        let tool = ToolChoice::Tool { name: "get_weather".into() };
        let value = serde_json::to_value(tool).unwrap();
        assert_eq!(value["type"], "tool");
        assert_eq!(value["name"], "get_weather");
    }

    #[test]
    fn stream_event_name_matches_tag() {
        let event = StreamEvent::ContentBlockDelta {
            index: 0,
            delta: ContentDelta::TextDelta { text: "hi".into() },
        };
        assert_eq!(event.event_name(), "content_block_delta");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "content_block_delta");
    }

    #[test]
    fn deserializes_base64_and_url_image_sources() {
        let base64: Content = serde_json::from_value(json!({
            "type": "image",
            "source": {"type": "base64", "media_type": "image/png", "data": "abc123"}
        }))
        .unwrap();
        assert!(matches!(base64, Content::Image { source: ImageSource::Base64 { .. } }));

        let url: Content = serde_json::from_value(json!({
            "type": "image",
            "source": {"type": "url", "url": "https://example.com/cat.png"}
        }))
        .unwrap();
        assert!(matches!(url, Content::Image { source: ImageSource::Url { url } } if url == "https://example.com/cat.png"));
    }

    #[test]
    fn max_tokens_defaults_when_omitted() {
        let request: MessagesRequest = serde_json::from_value(json!({
            "model": "claude-3-opus-20240229",
            "messages": [{"role": "user", "content": "hello world"}]
        }))
        .unwrap();
        assert_eq!(request.max_tokens_or_default(), DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn deserialize_error_envelope() {
        let json = json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "bad request"}
        });
        let error: ErrorResponse = serde_json::from_value(json).unwrap();
        assert_eq!(error.error_type, "error");
        assert_eq!(error.error.error_type, "invalid_request_error");
    }
}
