//! Streaming transducer: OpenAI `v1/chat/completions` SSE chunks → Anthropic
//! `v1/messages` SSE events.

use std::collections::VecDeque;

use eventsource_stream::Event as UpstreamEvent;
use futures_util::{Stream, StreamExt};

use crate::anthropic::messages::{
    Content, ContentDelta, MessageDelta, PartialUsage, Role, StopReason, StreamEvent, StreamMessageStart, Usage,
};
use crate::upstream::chat::ChatCompletionChunk;

/// Per-stream state: which content block index is currently open. Index 0
/// is always the leading text block; tool calls occupy `tool_index + 1`.
struct ChatStreamState {
    msg_id: String,
    current_block_index: u32,
}

impl ChatStreamState {
    fn new(msg_id: String) -> Self {
        Self { msg_id, current_block_index: 0 }
    }

    fn start_events(&self) -> Vec<StreamEvent> {
        vec![
            StreamEvent::MessageStart {
                message: StreamMessageStart {
                    id: self.msg_id.clone(),
                    message_type: "message".to_string(),
                    role: Role::Assistant,
                    content: vec![],
                    model: "proxy".to_string(),
                    stop_reason: None,
                    stop_sequence: None,
                    usage: Usage { input_tokens: 0, output_tokens: 0 },
                },
            },
            StreamEvent::ContentBlockStart { index: 0, content_block: Content::Text { text: String::new() } },
        ]
    }

    fn handle_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let Some(choice) = chunk.choices.into_iter().next() else {
            return events;
        };

        if let Some(text) = choice.delta.content {
            if self.current_block_index != 0 {
                // OpenAI switching back to text after a tool call is not part of
                // the standard flow; dropped rather than guessed at.
            } else if !text.is_empty() {
                events.push(StreamEvent::ContentBlockDelta { index: 0, delta: ContentDelta::TextDelta { text } });
            }
        }

        if let Some(tool_call) = choice.delta.tool_calls.and_then(|calls| calls.into_iter().next()) {
            let target_index = tool_call.index + 1;

            if target_index != self.current_block_index {
                events.push(StreamEvent::ContentBlockStop { index: self.current_block_index });
                self.current_block_index = target_index;

                let tool_id = tool_call.id.unwrap_or_else(|| "pending".to_string());
                let tool_name =
                    tool_call.function.as_ref().and_then(|f| f.name.clone()).unwrap_or_else(|| "pending".to_string());

                events.push(StreamEvent::ContentBlockStart {
                    index: self.current_block_index,
                    content_block: Content::ToolUse { id: tool_id, name: tool_name, input: serde_json::json!({}) },
                });
            }

            if let Some(args) = tool_call.function.and_then(|f| f.arguments) {
                if !args.is_empty() {
                    events.push(StreamEvent::ContentBlockDelta {
                        index: self.current_block_index,
                        delta: ContentDelta::InputJsonDelta { partial_json: args },
                    });
                }
            }
        }

        if let Some(finish_reason) = choice.finish_reason {
            let stop_reason = match finish_reason.as_str() {
                "tool_calls" => StopReason::ToolUse,
                "length" => StopReason::MaxTokens,
                _ => StopReason::EndTurn,
            };
            events.push(StreamEvent::ContentBlockStop { index: self.current_block_index });
            events.push(StreamEvent::MessageDelta {
                delta: MessageDelta { stop_reason: Some(stop_reason), stop_sequence: None },
                usage: PartialUsage { output_tokens: 10 },
            });
        }

        events
    }
}

struct Driver<S> {
    upstream: S,
    state: ChatStreamState,
    pending: VecDeque<StreamEvent>,
    upstream_done: bool,
}

/// Adapts an upstream chat-completions SSE byte stream into a stream of
/// Anthropic `v1/messages` stream events. Malformed upstream chunks and the
/// literal `[DONE]` marker are skipped silently, matching the reference
/// adapter's behavior.
pub fn translate_chat_stream<S, E>(upstream: S) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = Result<UpstreamEvent, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send,
{
    let msg_id = format!("msg_{}", uuid::Uuid::new_v4().simple());
    let state = ChatStreamState::new(msg_id);
    let pending: VecDeque<StreamEvent> = state.start_events().into();

    futures::stream::unfold(Driver { upstream, state, pending, upstream_done: false }, |mut driver| async move {
        loop {
            if let Some(event) = driver.pending.pop_front() {
                return Some((event, driver));
            }
            if driver.upstream_done {
                return None;
            }

            match driver.upstream.next().await {
                None => {
                    driver.pending.push_back(StreamEvent::MessageStop);
                    driver.upstream_done = true;
                }
                Some(Err(err)) => {
                    log::warn!("streaming error: {err}");
                }
                Some(Ok(event)) => {
                    if event.data == "[DONE]" {
                        continue;
                    }
                    match serde_json::from_str::<ChatCompletionChunk>(&event.data) {
                        Ok(chunk) => driver.pending.extend(driver.state.handle_chunk(chunk)),
                        Err(err) => log::warn!("failed to parse upstream chat chunk: {err}"),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::chat::{ChatChunkChoice, ChatChunkDelta, ChatFunctionCallDelta, ChatToolCallDelta};

    #[test]
    fn text_delta_emits_content_block_delta() {
        let mut state = ChatStreamState::new("msg_test".to_string());
        let chunk = ChatCompletionChunk {
            choices: vec![ChatChunkChoice {
                delta: ChatChunkDelta { content: Some("Hi".to_string()), tool_calls: None },
                finish_reason: None,
            }],
        };

        let events = state.handle_chunk(chunk);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::ContentBlockDelta { index: 0, delta: ContentDelta::TextDelta { text } } if text == "Hi"
        ));
    }

    #[test]
    fn tool_call_opens_block_at_tool_index_plus_one() {
        let mut state = ChatStreamState::new("msg_test".to_string());
        let chunk = ChatCompletionChunk {
            choices: vec![ChatChunkChoice {
                delta: ChatChunkDelta {
                    content: None,
                    tool_calls: Some(vec![ChatToolCallDelta {
                        index: 0,
                        id: Some("call_1".to_string()),
                        function: Some(ChatFunctionCallDelta {
                            name: Some("get_weather".to_string()),
                            arguments: Some(String::new()),
                        }),
                    }]),
                },
                finish_reason: None,
            }],
        };

        let events = state.handle_chunk(chunk);
        assert!(matches!(&events[0], StreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(
            &events[1],
            StreamEvent::ContentBlockStart { index: 1, content_block: Content::ToolUse { id, name, .. } }
                if id == "call_1" && name == "get_weather"
        ));
    }

    #[test]
    fn finish_reason_emits_stop_and_message_delta_with_placeholder_usage() {
        let mut state = ChatStreamState::new("msg_test".to_string());
        let chunk = ChatCompletionChunk {
            choices: vec![ChatChunkChoice {
                delta: ChatChunkDelta { content: None, tool_calls: None },
                finish_reason: Some("stop".to_string()),
            }],
        };

        let events = state.handle_chunk(chunk);
        assert!(matches!(&events[0], StreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(
            &events[1],
            StreamEvent::MessageDelta { delta, usage } if delta.stop_reason == Some(StopReason::EndTurn) && usage.output_tokens == 10
        ));
    }

    #[test]
    fn finish_reason_length_maps_to_max_tokens() {
        let mut state = ChatStreamState::new("msg_test".to_string());
        let chunk = ChatCompletionChunk {
            choices: vec![ChatChunkChoice {
                delta: ChatChunkDelta { content: None, tool_calls: None },
                finish_reason: Some("length".to_string()),
            }],
        };

        let events = state.handle_chunk(chunk);
        assert!(matches!(
            &events[1],
            StreamEvent::MessageDelta { delta, .. } if delta.stop_reason == Some(StopReason::MaxTokens)
        ));
    }
}
