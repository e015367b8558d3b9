pub mod request_chat;
pub mod request_responses;
pub mod response_chat;
pub mod response_responses;
pub mod stream_chat;
pub mod stream_responses;
