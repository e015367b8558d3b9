//! Streaming transducer: OpenAI `v1/responses` SSE events → Anthropic
//! `v1/messages` SSE events.

use std::collections::VecDeque;

use eventsource_stream::Event as UpstreamEvent;
use futures_util::{Stream, StreamExt};

use crate::anthropic::messages::{
    Content, ContentDelta, MessageDelta, PartialUsage, Role, StopReason, StreamEvent, StreamMessageStart, Usage,
};
use crate::upstream::responses::{OutputItem, ResponsesStreamEvent};

struct ResponsesStreamState {
    msg_id: String,
    message_started: bool,
    completed: bool,
    current_block_index: u32,
    current_content_index: u32,
}

impl ResponsesStreamState {
    fn new(msg_id: String) -> Self {
        Self { msg_id, message_started: false, completed: false, current_block_index: 0, current_content_index: 0 }
    }

    fn handle_event(&mut self, event: ResponsesStreamEvent) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        match event {
            ResponsesStreamEvent::ResponseCreated => {
                if !self.message_started {
                    events.push(StreamEvent::MessageStart {
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
                    });
                    self.message_started = true;
                }
            }

            ResponsesStreamEvent::OutputItemAdded { output_index, item } => {
                let output_index = output_index.unwrap_or(self.current_block_index);

                if self.current_block_index > 0 && self.current_block_index != output_index {
                    events.push(StreamEvent::ContentBlockStop { index: self.current_block_index - 1 });
                }
                self.current_block_index = output_index;

                match item.item_type.as_str() {
                    "message" => {
                        events.push(StreamEvent::ContentBlockStart {
                            index: self.current_block_index,
                            content_block: Content::Text { text: String::new() },
                        });
                        self.current_content_index = 0;
                    }
                    "function_call" => {
                        let id = item.call_id.or(item.id).unwrap_or_default();
                        let name = item.name.unwrap_or_default();
                        events.push(StreamEvent::ContentBlockStart {
                            index: self.current_block_index,
                            content_block: Content::ToolUse { id, name, input: serde_json::json!({}) },
                        });
                        self.current_content_index = 0;
                    }
                    _ => {}
                }
            }

            ResponsesStreamEvent::ContentPartAdded { content_index } => {
                if let Some(content_index) = content_index {
                    if content_index > self.current_content_index {
                        if self.current_content_index > 0 {
                            events.push(StreamEvent::ContentBlockStop { index: self.current_block_index - 1 });
                        }
                        self.current_content_index = content_index;
                    }
                }
            }

            ResponsesStreamEvent::OutputTextDelta { delta } => {
                if !delta.is_empty() {
                    events.push(StreamEvent::ContentBlockDelta {
                        index: self.current_block_index,
                        delta: ContentDelta::TextDelta { text: delta },
                    });
                }
            }

            ResponsesStreamEvent::FunctionCallDelta { delta } => {
                if let Some(arguments) = delta.arguments {
                    if !arguments.is_empty() {
                        events.push(StreamEvent::ContentBlockDelta {
                            index: self.current_block_index,
                            delta: ContentDelta::InputJsonDelta { partial_json: arguments },
                        });
                    }
                }
            }

            ResponsesStreamEvent::OutputTextDone | ResponsesStreamEvent::ContentPartDone => {}

            ResponsesStreamEvent::OutputItemDone { output_index } => {
                if output_index.unwrap_or(self.current_block_index) == self.current_block_index {
                    events.push(StreamEvent::ContentBlockStop { index: self.current_block_index });
                }
            }

            ResponsesStreamEvent::ResponseCompleted { response } => {
                let stop_reason = if response.output.iter().any(|item| matches!(item, OutputItem::FunctionCall { .. })) {
                    StopReason::ToolUse
                } else {
                    StopReason::EndTurn
                };
                let output_tokens = response.usage.map(|u| u.output_tokens).unwrap_or(0);

                events.push(StreamEvent::MessageDelta {
                    delta: MessageDelta { stop_reason: Some(stop_reason), stop_sequence: None },
                    usage: PartialUsage { output_tokens },
                });
                events.push(StreamEvent::MessageStop);
                self.completed = true;
            }

            ResponsesStreamEvent::Other => {}
        }

        events
    }

    fn finish(&self) -> Option<StreamEvent> {
        (self.message_started && !self.completed).then_some(StreamEvent::MessageStop)
    }
}

struct Driver<S> {
    upstream: S,
    state: ResponsesStreamState,
    pending: VecDeque<StreamEvent>,
    upstream_done: bool,
}

/// Adapts an upstream `v1/responses` SSE byte stream into a stream of
/// Anthropic `v1/messages` stream events.
pub fn translate_responses_stream<S, E>(upstream: S) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = Result<UpstreamEvent, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send,
{
    let msg_id = format!("msg_{}", uuid::Uuid::new_v4().simple());
    let driver =
        Driver { upstream, state: ResponsesStreamState::new(msg_id), pending: VecDeque::new(), upstream_done: false };

    futures::stream::unfold(driver, |mut driver| async move {
        loop {
            if let Some(event) = driver.pending.pop_front() {
                return Some((event, driver));
            }
            if driver.upstream_done {
                return None;
            }

            match driver.upstream.next().await {
                None => {
                    if let Some(event) = driver.state.finish() {
                        driver.pending.push_back(event);
                    }
                    driver.upstream_done = true;
                }
                Some(Err(err)) => {
                    log::warn!("streaming error: {err}");
                }
                Some(Ok(event)) => {
                    if event.data.is_empty() || event.data == "[DONE]" {
                        continue;
                    }
                    match serde_json::from_str::<ResponsesStreamEvent>(&event.data) {
                        Ok(parsed) => driver.pending.extend(driver.state.handle_event(parsed)),
                        Err(err) => log::warn!("failed to parse upstream responses event: {err}"),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::responses::OutputItemStart;

    #[test]
    fn response_created_emits_message_start_once() {
        let mut state = ResponsesStreamState::new("msg_test".to_string());
        let events = state.handle_event(ResponsesStreamEvent::ResponseCreated);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::MessageStart { .. }));

        let events = state.handle_event(ResponsesStreamEvent::ResponseCreated);
        assert!(events.is_empty());
    }

    #[test]
    fn output_item_added_for_message_opens_text_block() {
        let mut state = ResponsesStreamState::new("msg_test".to_string());
        let events = state.handle_event(ResponsesStreamEvent::OutputItemAdded {
            output_index: Some(0),
            item: OutputItemStart { item_type: "message".to_string(), id: None, call_id: None, name: None },
        });
        assert!(matches!(&events[0], StreamEvent::ContentBlockStart { index: 0, content_block: Content::Text { .. } }));
    }

    #[test]
    fn response_completed_sets_tool_use_stop_reason_and_suppresses_fallback_stop() {
        let mut state = ResponsesStreamState::new("msg_test".to_string());
        state.handle_event(ResponsesStreamEvent::ResponseCreated);

        let response = crate::upstream::responses::ResponsesResponse {
            model: Some("gpt-4o".to_string()),
            output: vec![OutputItem::FunctionCall {
                call_id: Some("call_1".to_string()),
                id: None,
                name: "lookup".to_string(),
                arguments: "{}".to_string(),
            }],
            usage: Some(crate::upstream::responses::ResponsesUsage { input_tokens: 1, output_tokens: 3 }),
        };

        let events = state.handle_event(ResponsesStreamEvent::ResponseCompleted { response });
        assert!(matches!(&events[0], StreamEvent::MessageDelta { delta, .. } if delta.stop_reason == Some(StopReason::ToolUse)));
        assert!(matches!(&events[1], StreamEvent::MessageStop));
        assert!(state.finish().is_none());
    }
}
