//! The single configured OpenAI-family upstream: a shared HTTP client plus
//! the request/response wire types for both supported flavors.

pub mod chat;
pub mod responses;

use std::sync::OnceLock;
use std::time::Duration;

use eventsource_stream::{Event as UpstreamEvent, EventStreamError, Eventsource};
use futures_util::Stream;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{AdapterError, Result};
use chat::{ChatCompletionRequest, ChatCompletionResponse};
use responses::{ResponsesRequest, ResponsesResponse};

static CLIENT: OnceLock<Client> = OnceLock::new();

fn default_http_client_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
}

/// Process-wide shared HTTP client. A short pooled idle timeout keeps
/// connections from outliving DNS changes to the upstream.
pub fn http_client() -> &'static Client {
    CLIENT.get_or_init(|| default_http_client_builder().build().expect("reqwest client builds with default TLS config"))
}

fn auth_header(api_key: &SecretString) -> String {
    format!("Bearer {}", api_key.expose_secret())
}

async fn map_error_response(response: reqwest::Response) -> AdapterError {
    let status = response.status();
    match response.json::<serde_json::Value>().await {
        Ok(body) => AdapterError::UpstreamStatus {
            status,
            error_type: body["error"]["type"].as_str().unwrap_or("invalid_request_error").to_string(),
            message: body["error"]["message"].as_str().unwrap_or("Unknown error").to_string(),
        },
        Err(_) => AdapterError::UpstreamStatus {
            status,
            error_type: "invalid_request_error".to_string(),
            message: "Unknown error".to_string(),
        },
    }
}

type EventStream = std::pin::Pin<
    Box<dyn Stream<Item = std::result::Result<UpstreamEvent, EventStreamError<reqwest::Error>>> + Send>,
>;

pub async fn send_chat_completion(
    base_url: &url::Url,
    api_key: &SecretString,
    body: &ChatCompletionRequest,
) -> Result<ChatCompletionResponse> {
    let response = http_client()
        .post(base_url.clone())
        .header("Authorization", auth_header(api_key))
        .json(body)
        .send()
        .await
        .map_err(|err| AdapterError::Connection(err.to_string()))?;

    if !response.status().is_success() {
        return Err(map_error_response(response).await);
    }

    response.json().await.map_err(|err| AdapterError::Internal(err.to_string()))
}

pub async fn send_chat_completion_stream(
    base_url: &url::Url,
    api_key: &SecretString,
    body: &ChatCompletionRequest,
) -> Result<EventStream> {
    let response = http_client()
        .post(base_url.clone())
        .header("Authorization", auth_header(api_key))
        .json(body)
        .send()
        .await
        .map_err(|err| AdapterError::Connection(err.to_string()))?;

    if !response.status().is_success() {
        return Err(map_error_response(response).await);
    }

    Ok(Box::pin(response.bytes_stream().eventsource()))
}

pub async fn send_responses(
    base_url: &url::Url,
    api_key: &SecretString,
    body: &ResponsesRequest,
) -> Result<ResponsesResponse> {
    let response = http_client()
        .post(base_url.clone())
        .header("Authorization", auth_header(api_key))
        .json(body)
        .send()
        .await
        .map_err(|err| AdapterError::Connection(err.to_string()))?;

    if !response.status().is_success() {
        return Err(map_error_response(response).await);
    }

    response.json().await.map_err(|err| AdapterError::Internal(err.to_string()))
}

pub async fn send_responses_stream(
    base_url: &url::Url,
    api_key: &SecretString,
    body: &ResponsesRequest,
) -> Result<EventStream> {
    let response = http_client()
        .post(base_url.clone())
        .header("Authorization", auth_header(api_key))
        .json(body)
        .send()
        .await
        .map_err(|err| AdapterError::Connection(err.to_string()))?;

    if !response.status().is_success() {
        return Err(map_error_response(response).await);
    }

    Ok(Box::pin(response.bytes_stream().eventsource()))
}
