use clap::Parser;

/// Anthropic-to-OpenAI API adapter.
#[derive(Debug, Parser)]
#[command(name = "anthropic-openai-adapter", about = "Anthropic-to-OpenAI API Adapter")]
pub struct Args {
    /// Target OpenAI-compatible API URL (the full endpoint, e.g. ending in
    /// `/v1/chat/completions` or `/v1/responses`).
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Target OpenAI API key (can also be passed per-request via the
    /// `x-api-key` header).
    #[arg(long, env = "OPENAI_API_KEY")]
    pub api_key: Option<String>,

    /// tiktoken encoding used for `/v1/messages/count_tokens`.
    #[arg(long, env = "TIKTOKEN_ENCODING")]
    pub tiktoken_encoding: Option<String>,

    /// Host to bind the adapter to.
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to bind the adapter to.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log filter passed to the logger (e.g. "info" or "anthropic_openai_adapter=debug").
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}
