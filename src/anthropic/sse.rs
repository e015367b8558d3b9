//! Conversion from [`StreamEvent`] to the axum SSE wire representation.
//!
//! Anthropic's streaming protocol names the event on the `event:` line and
//! repeats the type as a `type` field inside `data:`, e.g.:
//!
//! ```text
//! event: content_block_delta
//! data: {"type":"content_block_delta","index":0,"delta":{...}}
//!
//! ```

use axum::response::sse::Event;

use super::messages::StreamEvent;

impl StreamEvent {
    /// Builds the axum `Event` for this stream event, setting both the
    /// `event:` line and the serialized `data:` payload.
    pub fn into_sse_event(self) -> Event {
        let name = self.event_name();
        // Serialization of our own wire types cannot fail.
        let data = serde_json::to_string(&self).expect("StreamEvent serializes");
        Event::default().event(name).data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_stop_has_no_extra_fields() {
        let event = StreamEvent::MessageStop.into_sse_event();
        assert!(format!("{event:?}").contains("message_stop"));
    }
}
