pub mod anthropic;
pub mod args;
pub mod config;
pub mod error;
pub mod logger;
pub mod token_counter;
pub mod translate;
pub mod upstream;

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::StreamExt;
use http::HeaderMap;
use secrecy::SecretString;
use tower_http::cors::CorsLayer;

use anthropic::messages::{CountTokensResponse, MessagesRequest};
use config::{Config, UpstreamFlavor};
use error::{AdapterError, CountTokensError, Result};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// Builds the adapter's router: `POST /v1/messages` and
/// `POST /v1/messages/count_tokens`, with a permissive CORS layer matching
/// the original adapter's `CORSMiddleware(allow_origins=["*"], ...)`.
pub fn router(config: Config) -> Router {
    let state = AppState { config: Arc::new(config) };

    Router::new()
        .route("/v1/messages", post(create_message))
        .route("/v1/messages/count_tokens", post(count_tokens))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn resolve_api_key(state: &AppState, headers: &HeaderMap) -> Result<SecretString> {
    if let Some(value) = headers.get("x-api-key") {
        if let Ok(value) = value.to_str() {
            if !value.is_empty() {
                return Ok(SecretString::from(value.to_string()));
            }
        }
    }

    state.config.api_key.clone().ok_or(AdapterError::MissingApiKey)
}

async fn create_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> std::result::Result<Response, AdapterError> {
    let request: MessagesRequest =
        serde_json::from_slice(&body).map_err(|err| AdapterError::MalformedRequest(err.to_string()))?;
    let api_key = resolve_api_key(&state, &headers)?;
    let streaming = request.stream.unwrap_or(false);

    match state.config.flavor {
        UpstreamFlavor::ChatCompletions => {
            let chat_request = translate::request_chat::to_chat_completion_request(&request);

            if streaming {
                let upstream = upstream::send_chat_completion_stream(&state.config.base_url, &api_key, &chat_request).await?;
                let events = translate::stream_chat::translate_chat_stream(upstream)
                    .map(|event| Ok::<_, std::convert::Infallible>(event.into_sse_event()));
                Ok(Sse::new(events).into_response())
            } else {
                let upstream_response =
                    upstream::send_chat_completion(&state.config.base_url, &api_key, &chat_request).await?;
                let response = translate::response_chat::from_chat_completion_response(upstream_response);
                Ok(Json(response).into_response())
            }
        }
        UpstreamFlavor::Responses => {
            let responses_request = translate::request_responses::to_responses_request(&request);

            if streaming {
                let upstream =
                    upstream::send_responses_stream(&state.config.base_url, &api_key, &responses_request).await?;
                let events = translate::stream_responses::translate_responses_stream(upstream)
                    .map(|event| Ok::<_, std::convert::Infallible>(event.into_sse_event()));
                Ok(Sse::new(events).into_response())
            } else {
                let upstream_response =
                    upstream::send_responses(&state.config.base_url, &api_key, &responses_request).await?;
                let response = translate::response_responses::from_responses_response(upstream_response);
                Ok(Json(response).into_response())
            }
        }
    }
}

/// `POST /v1/messages/count_tokens` always counts against the
/// chat-completions-shaped translation of the body, regardless of the
/// configured upstream flavor — matching the original adapter, whose
/// `count_tokens` route only ever imports the chat-completions transform.
async fn count_tokens(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> std::result::Result<Json<CountTokensResponse>, CountTokensError> {
    let request: MessagesRequest =
        serde_json::from_slice(&body).map_err(|err| CountTokensError(err.to_string()))?;
    let chat_request = translate::request_chat::to_chat_completion_request(&request);
    let input_tokens = token_counter::count_chat_completion_tokens(&chat_request, &state.config.tiktoken_encoding);
    Ok(Json(CountTokensResponse { input_tokens }))
}
