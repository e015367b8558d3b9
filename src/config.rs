use secrecy::SecretString;
use url::Url;

use crate::args::Args;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TIKTOKEN_ENCODING: &str = "cl100k_base";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

/// Which upstream wire format the configured `base_url` speaks.
///
/// Detected once at startup from a substring match on the base URL, mirroring
/// the original adapter's `_detect_api_type`: anything that doesn't look like
/// `v1/responses` is treated as `v1/chat/completions` for backward
/// compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFlavor {
    ChatCompletions,
    Responses,
}

impl UpstreamFlavor {
    fn detect(base_url: &str) -> Self {
        if base_url.contains("/v1/responses") {
            Self::Responses
        } else {
            Self::ChatCompletions
        }
    }
}

/// Process-global, read-mostly configuration resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub api_key: Option<SecretString>,
    pub flavor: UpstreamFlavor,
    pub tiktoken_encoding: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Resolve configuration from parsed CLI args, which already carry
    /// environment-variable fallbacks via `#[arg(env = ...)]`; any field
    /// still unset falls back to the adapter's built-in default.
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let base_url_str = args.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url_str)?;
        let flavor = UpstreamFlavor::detect(base_url.as_str());

        Ok(Self {
            flavor,
            base_url,
            api_key: args.api_key.clone().map(SecretString::from),
            tiktoken_encoding: args
                .tiktoken_encoding
                .clone()
                .unwrap_or_else(|| DEFAULT_TIKTOKEN_ENCODING.to_string()),
            host: args.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.unwrap_or(DEFAULT_PORT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_responses_flavor_from_base_url() {
        assert_eq!(
            UpstreamFlavor::detect("https://api.openai.com/v1/responses"),
            UpstreamFlavor::Responses
        );
        assert_eq!(
            UpstreamFlavor::detect("https://api.openai.com/v1/chat/completions"),
            UpstreamFlavor::ChatCompletions
        );
        assert_eq!(UpstreamFlavor::detect("https://example.com/custom"), UpstreamFlavor::ChatCompletions);
    }
}
