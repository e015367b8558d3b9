//! Anthropic `MessagesRequest` → OpenAI `v1/chat/completions` request.

use crate::anthropic::messages::{
    self, Content, MessageContent, Role, SystemPrompt, ToolChoice, ToolResultContent,
};
use crate::upstream::chat::{
    ChatCompletionRequest, ChatContentPart, ChatFunctionCall, ChatImageUrl, ChatMessage,
    ChatMessageContent, ChatTool, ChatToolCall, ChatToolFunction,
};

const DEFAULT_TEMPERATURE: f32 = 0.7;

fn data_uri(source: &messages::ImageSource) -> String {
    match source {
        messages::ImageSource::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        messages::ImageSource::Url { url } => url.clone(),
    }
}

fn flatten_system(system: &SystemPrompt) -> String {
    match system {
        SystemPrompt::Text(text) => text.clone(),
        SystemPrompt::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                Content::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn tool_result_text(content: &ToolResultContent) -> String {
    match content {
        ToolResultContent::Text(text) => text.clone(),
        ToolResultContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                messages::ToolResultBlock::Text { text } => Some(text.as_str()),
                messages::ToolResultBlock::Error { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

pub fn to_chat_completion_request(request: &messages::MessagesRequest) -> ChatCompletionRequest {
    let mut out_messages = Vec::new();

    if let Some(system) = &request.system {
        out_messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(ChatMessageContent::Text(flatten_system(system))),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for message in &request.messages {
        match message.role {
            Role::User => push_user_message(&mut out_messages, &message.content),
            Role::Assistant => push_assistant_message(&mut out_messages, &message.content),
        }
    }

    let continuing_assistant = out_messages.last().is_some_and(|m| m.role == "assistant");

    let mut tools = Vec::new();
    if let Some(anthropic_tools) = &request.tools {
        for tool in anthropic_tools {
            tools.push(ChatTool {
                kind: "function".to_string(),
                function: ChatToolFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                },
            });
        }
    }

    ChatCompletionRequest {
        model: request.model.clone(),
        stream: request.stream.unwrap_or(false),
        max_tokens: request.max_tokens_or_default(),
        messages: out_messages,
        temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        continue_final_message: continuing_assistant.then_some(true),
        add_generation_prompt: continuing_assistant.then_some(false),
        stop: request.stop_sequences.clone(),
        top_p: request.top_p,
        presence_penalty: request.presence_penalty,
        frequency_penalty: request.frequency_penalty,
        tool_choice: request.tool_choice.as_ref().map(to_chat_tool_choice),
        tools: (!tools.is_empty()).then_some(tools),
    }
}

fn push_user_message(out: &mut Vec<ChatMessage>, content: &MessageContent) {
    match content {
        MessageContent::Text(text) => out.push(ChatMessage {
            role: "user".to_string(),
            content: Some(ChatMessageContent::Text(text.clone())),
            tool_calls: None,
            tool_call_id: None,
        }),
        MessageContent::Blocks(blocks) => {
            let is_tool_result = blocks.iter().any(|b| matches!(b, Content::ToolResult { .. }));

            if is_tool_result {
                for block in blocks {
                    if let Content::ToolResult { tool_use_id, content } = block {
                        let text = tool_result_text(content);
                        let text = if text.is_empty() { "Success".to_string() } else { text };
                        out.push(ChatMessage {
                            role: "tool".to_string(),
                            content: Some(ChatMessageContent::Text(text)),
                            tool_calls: None,
                            tool_call_id: Some(tool_use_id.clone()),
                        });
                    }
                }
                return;
            }

            let mut parts = Vec::new();
            for block in blocks {
                match block {
                    Content::Text { text } => parts.push(ChatContentPart::Text { text: text.clone() }),
                    Content::Image { source } => {
                        parts.push(ChatContentPart::ImageUrl { image_url: ChatImageUrl { url: data_uri(source) } })
                    }
                    Content::ToolUse { .. } | Content::ToolResult { .. } => {}
                }
            }
            out.push(ChatMessage {
                role: "user".to_string(),
                content: Some(ChatMessageContent::Parts(parts)),
                tool_calls: None,
                tool_call_id: None,
            });
        }
    }
}

fn push_assistant_message(out: &mut Vec<ChatMessage>, content: &MessageContent) {
    match content {
        MessageContent::Text(text) => out.push(ChatMessage {
            role: "assistant".to_string(),
            content: Some(ChatMessageContent::Text(text.clone())),
            tool_calls: None,
            tool_call_id: None,
        }),
        MessageContent::Blocks(blocks) => {
            let mut text_parts = Vec::new();
            let mut tool_calls = Vec::new();

            for block in blocks {
                match block {
                    Content::Text { text } => text_parts.push(text.clone()),
                    Content::ToolUse { id, name, input } => tool_calls.push(ChatToolCall {
                        id: id.clone(),
                        kind: "function".to_string(),
                        function: ChatFunctionCall {
                            name: name.clone(),
                            arguments: serde_json::to_string(input).unwrap_or_else(|_| "{}".to_string()),
                        },
                    }),
                    Content::Image { .. } | Content::ToolResult { .. } => {}
                }
            }

            out.push(ChatMessage {
                role: "assistant".to_string(),
                content: (!text_parts.is_empty()).then(|| ChatMessageContent::Text(text_parts.join("\n"))),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: None,
            });
        }
    }
}

fn to_chat_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Any => serde_json::json!("required"),
        ToolChoice::Auto => serde_json::json!("auto"),
        ToolChoice::Tool { name } => serde_json::json!({ "type": "function", "function": { "name": name } }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anthropic::messages::{Message, MessagesRequest};
    use serde_json::json;

    fn base_request(messages: Vec<Message>) -> MessagesRequest {
        MessagesRequest {
            model: "claude-3-opus-20240229".to_string(),
            messages,
            max_tokens: Some(1024),
            system: None,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            stream: None,
            metadata: None,
            tools: None,
            tool_choice: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }

    #[test]
    fn system_prompt_becomes_leading_system_message() {
        let mut request = base_request(vec![Message { role: Role::User, content: MessageContent::Text("hi".into()) }]);
        request.system = Some(SystemPrompt::Text("You are helpful.".into()));

        let chat = to_chat_completion_request(&request);
        assert_eq!(chat.messages[0].role, "system");
        assert!(matches!(&chat.messages[0].content, Some(ChatMessageContent::Text(t)) if t == "You are helpful."));
    }

    #[test]
    fn tool_result_blocks_become_tool_messages() {
        let request = base_request(vec![Message {
            role: Role::User,
            content: MessageContent::Blocks(vec![Content::ToolResult {
                tool_use_id: "tool_use_1".into(),
                content: ToolResultContent::Text(String::new()),
            }]),
        }]);

        let chat = to_chat_completion_request(&request);
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].role, "tool");
        assert_eq!(chat.messages[0].tool_call_id.as_deref(), Some("tool_use_1"));
        assert!(matches!(&chat.messages[0].content, Some(ChatMessageContent::Text(t)) if t == "Success"));
    }

    #[test]
    fn assistant_tool_use_becomes_tool_call_with_json_arguments() {
        let request = base_request(vec![Message {
            role: Role::Assistant,
            content: MessageContent::Blocks(vec![Content::ToolUse {
                id: "toolu_1".into(),
                name: "get_weather".into(),
                input: json!({"location": "SF"}),
            }]),
        }]);

        let chat = to_chat_completion_request(&request);
        let tool_calls = chat.messages[0].tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls[0].function.name, "get_weather");
        assert_eq!(tool_calls[0].function.arguments, json!({"location": "SF"}).to_string());
    }

    #[test]
    fn trailing_assistant_message_sets_continuation_hints() {
        let request = base_request(vec![Message {
            role: Role::Assistant,
            content: MessageContent::Text("partial...".into()),
        }]);

        let chat = to_chat_completion_request(&request);
        assert_eq!(chat.continue_final_message, Some(true));
        assert_eq!(chat.add_generation_prompt, Some(false));
    }

    #[test]
    fn tool_choice_any_maps_to_required() {
        let mut request = base_request(vec![Message { role: Role::User, content: MessageContent::Text("hi".into()) }]);
        request.tool_choice = Some(ToolChoice::Any);
        request.tools = Some(vec![messages::Tool {
            name: "get_weather".into(),
            description: "".into(),
            input_schema: json!({"type": "object"}),
        }]);

        let chat = to_chat_completion_request(&request);
        assert_eq!(chat.tool_choice, Some(json!("required")));
    }
}
