//! Anthropic `MessagesRequest` → OpenAI `v1/responses` request.

use crate::anthropic::messages::{
    self, Content, MessageContent, Role, SystemPrompt, ToolChoice, ToolResultContent,
};
use crate::upstream::responses::{InputContentPart, InputItem, ResponsesRequest, ResponsesTool};

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

pub fn to_responses_request(request: &messages::MessagesRequest) -> ResponsesRequest {
    let instructions = request.system.as_ref().map(flatten_system);
    let mut input = Vec::new();

    for message in &request.messages {
        match message.role {
            Role::User => push_user_item(&mut input, &message.content),
            Role::Assistant => push_assistant_items(&mut input, &message.content),
        }
    }

    let mut tools = Vec::new();
    if let Some(anthropic_tools) = &request.tools {
        for tool in anthropic_tools {
            tools.push(ResponsesTool {
                kind: "function".to_string(),
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            });
        }
    }

    ResponsesRequest {
        model: request.model.clone(),
        stream: request.stream.unwrap_or(false),
        max_output_tokens: request.max_tokens_or_default(),
        input,
        temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        instructions,
        stop: request.stop_sequences.clone(),
        top_p: request.top_p,
        presence_penalty: request.presence_penalty,
        frequency_penalty: request.frequency_penalty,
        tool_choice: request.tool_choice.as_ref().map(to_responses_tool_choice),
        tools: (!tools.is_empty()).then_some(tools),
    }
}

fn push_user_item(out: &mut Vec<InputItem>, content: &MessageContent) {
    match content {
        MessageContent::Text(text) => out.push(InputItem::Message {
            role: "user".to_string(),
            content: vec![InputContentPart::InputText { text: text.clone() }],
        }),
        MessageContent::Blocks(blocks) => {
            let is_tool_result = blocks.iter().any(|b| matches!(b, Content::ToolResult { .. }));

            if is_tool_result {
                for block in blocks {
                    if let Content::ToolResult { tool_use_id, content } = block {
                        let text = tool_result_text(content);
                        let output = if text.is_empty() { "Success".to_string() } else { text };
                        out.push(InputItem::CustomToolCallOutput { call_id: tool_use_id.clone(), output });
                    }
                }
                return;
            }

            let mut parts = Vec::new();
            for block in blocks {
                match block {
                    Content::Text { text } => parts.push(InputContentPart::InputText { text: text.clone() }),
                    Content::Image { source } => {
                        parts.push(InputContentPart::InputImage { image_url: data_uri(source) })
                    }
                    Content::ToolUse { .. } | Content::ToolResult { .. } => {}
                }
            }
            out.push(InputItem::Message { role: "user".to_string(), content: parts });
        }
    }
}

fn push_assistant_items(out: &mut Vec<InputItem>, content: &MessageContent) {
    match content {
        MessageContent::Text(text) => out.push(InputItem::Message {
            role: "assistant".to_string(),
            content: vec![InputContentPart::OutputText { text: text.clone() }],
        }),
        MessageContent::Blocks(blocks) => {
            let mut content_blocks = Vec::new();

            for block in blocks {
                match block {
                    Content::Text { text } => content_blocks.push(InputContentPart::OutputText { text: text.clone() }),
                    Content::ToolUse { id, name, input } => out.push(InputItem::FunctionCall {
                        call_id: id.clone(),
                        name: name.clone(),
                        arguments: serde_json::to_string(input).unwrap_or_else(|_| "{}".to_string()),
                    }),
                    Content::Image { .. } | Content::ToolResult { .. } => {}
                }
            }

            if !content_blocks.is_empty() {
                out.push(InputItem::Message { role: "assistant".to_string(), content: content_blocks });
            }
        }
    }
}

fn to_responses_tool_choice(choice: &ToolChoice) -> serde_json::Value {
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
    fn system_prompt_becomes_instructions() {
        let mut request = base_request(vec![Message { role: Role::User, content: MessageContent::Text("hi".into()) }]);
        request.system = Some(SystemPrompt::Text("Be terse.".into()));
        let responses = to_responses_request(&request);
        assert_eq!(responses.instructions.as_deref(), Some("Be terse."));
    }

    #[test]
    fn tool_use_becomes_top_level_function_call_item() {
        let request = base_request(vec![Message {
            role: Role::Assistant,
            content: MessageContent::Blocks(vec![
                Content::Text { text: "Checking...".into() },
                Content::ToolUse { id: "toolu_1".into(), name: "get_weather".into(), input: json!({"location": "SF"}) },
            ]),
        }]);

        let responses = to_responses_request(&request);
        assert_eq!(responses.input.len(), 2);
        assert!(matches!(&responses.input[0], InputItem::FunctionCall { name, .. } if name == "get_weather"));
        assert!(matches!(&responses.input[1], InputItem::Message { role, .. } if role == "assistant"));
    }

    #[test]
    fn tool_result_becomes_custom_tool_call_output() {
        let request = base_request(vec![Message {
            role: Role::User,
            content: MessageContent::Blocks(vec![Content::ToolResult {
                tool_use_id: "toolu_1".into(),
                content: ToolResultContent::Text("72F and sunny".into()),
            }]),
        }]);

        let responses = to_responses_request(&request);
        assert_eq!(responses.input.len(), 1);
        assert!(matches!(
            &responses.input[0],
            InputItem::CustomToolCallOutput { call_id, output } if call_id == "toolu_1" && output == "72F and sunny"
        ));
    }
}
