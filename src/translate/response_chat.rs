//! OpenAI `v1/chat/completions` unary response → Anthropic `MessagesResponse`.

use serde_json::Value;

use crate::anthropic::messages::{Content, MessagesResponse, Role, StopReason, Usage};
use crate::upstream::chat::ChatCompletionResponse;

fn fresh_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

pub fn from_chat_completion_response(response: ChatCompletionResponse) -> MessagesResponse {
    let choice = response.choices.into_iter().next();
    let mut content = Vec::new();
    let mut stop_reason = StopReason::EndTurn;

    if let Some(choice) = choice {
        if let Some(text) = choice.message.content {
            content.push(Content::Text { text });
        }

        if let Some(tool_calls) = choice.message.tool_calls {
            for call in tool_calls {
                let input: Value = serde_json::from_str(&call.function.arguments).unwrap_or(Value::Object(Default::default()));
                content.push(Content::ToolUse { id: call.id, name: call.function.name, input });
            }
        }

        stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };
    }

    MessagesResponse {
        id: fresh_message_id(),
        r#type: "message".to_string(),
        role: Role::Assistant,
        content,
        model: response.model.unwrap_or_else(|| "unknown".to_string()),
        stop_reason: Some(stop_reason),
        stop_sequence: None,
        usage: Usage {
            input_tokens: response.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
            output_tokens: response.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::chat::{ChatChoice, ChatResponseMessage, ChatToolCall, ChatFunctionCall, ChatUsage};
    use serde_json::json;

    #[test]
    fn text_only_response_maps_to_end_turn() {
        let response = ChatCompletionResponse {
            model: Some("gpt-4o".to_string()),
            choices: vec![ChatChoice {
                message: ChatResponseMessage { content: Some("Hi there!".to_string()), tool_calls: None },
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(ChatUsage { prompt_tokens: 10, completion_tokens: 4 }),
        };

        let anthropic = from_chat_completion_response(response);
        assert_eq!(anthropic.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(anthropic.usage.input_tokens, 10);
        assert_eq!(anthropic.usage.output_tokens, 4);
        assert!(matches!(&anthropic.content[0], Content::Text { text } if text == "Hi there!"));
    }

    #[test]
    fn tool_calls_map_to_tool_use_and_stop_reason() {
        let response = ChatCompletionResponse {
            model: Some("gpt-4o".to_string()),
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    content: None,
                    tool_calls: Some(vec![ChatToolCall {
                        id: "call_1".to_string(),
                        kind: "function".to_string(),
                        function: ChatFunctionCall {
                            name: "get_weather".to_string(),
                            arguments: json!({"location": "SF"}).to_string(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: None,
        };

        let anthropic = from_chat_completion_response(response);
        assert_eq!(anthropic.stop_reason, Some(StopReason::ToolUse));
        let Content::ToolUse { id, name, input } = &anthropic.content[0] else { panic!("expected tool use") };
        assert_eq!(id, "call_1");
        assert_eq!(name, "get_weather");
        assert_eq!(input["location"], "SF");
    }
}
