pub mod messages;
pub mod sse;
