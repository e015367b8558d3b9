//! OpenAI `v1/responses` unary response → Anthropic `MessagesResponse`.

use serde_json::Value;

use crate::anthropic::messages::{Content, MessagesResponse, Role, StopReason, Usage};
use crate::upstream::responses::{OutputContentPart, OutputItem, ResponsesResponse};

fn fresh_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

pub fn from_responses_response(response: ResponsesResponse) -> MessagesResponse {
    let mut content = Vec::new();
    let mut stop_reason = StopReason::EndTurn;

    for item in response.output {
        match item {
            OutputItem::Message { content: parts } => {
                for part in parts {
                    if let OutputContentPart::OutputText { text } = part {
                        content.push(Content::Text { text });
                    }
                }
            }
            OutputItem::FunctionCall { call_id, id, name, arguments } => {
                let input: Value = serde_json::from_str(&arguments).unwrap_or(Value::Object(Default::default()));
                content.push(Content::ToolUse { id: call_id.or(id).unwrap_or_default(), name, input });
                stop_reason = StopReason::ToolUse;
            }
            OutputItem::Other => {}
        }
    }

    let usage = response.usage;
    MessagesResponse {
        id: fresh_message_id(),
        r#type: "message".to_string(),
        role: Role::Assistant,
        content,
        model: response.model.unwrap_or_else(|| "unknown".to_string()),
        stop_reason: Some(stop_reason),
        stop_sequence: None,
        usage: Usage {
            input_tokens: usage.as_ref().map(|u| u.input_tokens).unwrap_or(0),
            output_tokens: usage.as_ref().map(|u| u.output_tokens).unwrap_or(0),
        },
    }
}
