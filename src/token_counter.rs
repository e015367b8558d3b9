//! BPE token counting over a translated Chat-Completions body.
//!
//! Counting always happens against the chat-completions shape, even when the
//! configured upstream speaks `v1/responses` — this mirrors the original
//! adapter's `count_tokens` endpoint, which only ever imports the
//! chat-completions translator.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use crate::upstream::chat::{ChatCompletionRequest, ChatMessageContent};

static ENCODING: OnceLock<CoreBPE> = OnceLock::new();

/// Loads (once) the BPE vocabulary named by `encoding`, falling back to
/// `cl100k_base` if the name is unrecognized or fails to load.
fn encoding(name: &str) -> &'static CoreBPE {
    ENCODING.get_or_init(|| load(name).unwrap_or_else(|| tiktoken_rs::cl100k_base().expect("cl100k_base always loads")))
}

fn load(name: &str) -> Option<CoreBPE> {
    match name {
        "cl100k_base" => tiktoken_rs::cl100k_base().ok(),
        "o200k_base" => tiktoken_rs::o200k_base().ok(),
        "p50k_base" => tiktoken_rs::p50k_base().ok(),
        "r50k_base" => tiktoken_rs::r50k_base().ok(),
        _ => None,
    }
}

/// Counts tokens in a chat-completions-shaped request body, following the
/// original adapter's informal accounting: 3 tokens of per-message overhead,
/// the encoded length of string content, the encoded length of each tool
/// call's function name and arguments, 3 tokens of trailing overhead, and
/// the encoded length of the serialized `tools` array if present.
pub fn count_chat_completion_tokens(body: &ChatCompletionRequest, encoding_name: &str) -> u64 {
    let bpe = encoding(encoding_name);
    let mut num_tokens: u64 = 0;

    for message in &body.messages {
        num_tokens += 3;

        if let Some(ChatMessageContent::Text(text)) = &message.content {
            num_tokens += bpe.encode_with_special_tokens(text).len() as u64;
        }

        if let Some(tool_calls) = &message.tool_calls {
            for call in tool_calls {
                num_tokens += bpe.encode_with_special_tokens(&call.function.name).len() as u64;
                num_tokens += bpe.encode_with_special_tokens(&call.function.arguments).len() as u64;
            }
        }
    }

    num_tokens += 3;

    if let Some(tools) = &body.tools {
        let tools_str = serde_json::to_string(tools).unwrap_or_default();
        num_tokens += bpe.encode_with_special_tokens(&tools_str).len() as u64;
    }

    num_tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::chat::ChatMessage;

    fn message(role: &str, text: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: Some(ChatMessageContent::Text(text.to_string())),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    #[test]
    fn counts_overhead_plus_content() {
        let body = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![message("user", "Hello, Claude!")],
            stream: false,
            max_tokens: 1024,
            temperature: 0.7,
            continue_final_message: None,
            add_generation_prompt: None,
            stop: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
            tools: None,
            tool_choice: None,
        };

        let count = count_chat_completion_tokens(&body, "cl100k_base");
        // 3 (message overhead) + encoded("Hello, Claude!") + 3 (trailing overhead)
        let expected = 6 + encoding("cl100k_base").encode_with_special_tokens("Hello, Claude!").len() as u64;
        assert_eq!(count, expected);
    }

    #[test]
    fn unknown_encoding_falls_back_to_cl100k_base() {
        let body = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![],
            stream: false,
            max_tokens: 1024,
            temperature: 0.7,
            continue_final_message: None,
            add_generation_prompt: None,
            stop: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
            tools: None,
            tool_choice: None,
        };
        assert_eq!(count_chat_completion_tokens(&body, "not-a-real-encoding"), 3);
    }
}
