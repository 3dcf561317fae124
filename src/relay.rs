use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::any,
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use crate::constants::SYSTEM_INSTRUCTION;
use crate::error::RelayError;

/// Upstream settings for one relay deployment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the completion API for an event stream and pass it through.
    pub stream: bool,
    /// Cut each forwarded message to this many characters.
    pub max_message_chars: Option<usize>,
}

#[derive(Clone)]
struct RelayState {
    config: Arc<RelayConfig>,
    http: reqwest::Client,
}

// Entries are kept as raw JSON so roles and content shapes the relay does not
// know about still reach the completion API untouched.
#[derive(Deserialize)]
struct RelayPayload {
    messages: Vec<Value>,
}

#[derive(Serialize, Debug)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

/// Permissive cross-origin headers carried by every relay response.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers
}

pub fn router(config: RelayConfig) -> Router {
    let state = RelayState {
        config: Arc::new(config),
        http: reqwest::Client::new(),
    };
    Router::new()
        // Method dispatch happens in the handler so that rejections carry CORS headers.
        .route("/", any(relay_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn relay_handler(
    State(state): State<RelayState>,
    method: Method,
    body: Bytes,
) -> Response {
    match relay(&state, method, body).await {
        Ok(response) => response,
        Err(e) => {
            warn!(status = %e.status(), "Rejecting relay request: {}", e);
            e.into_response()
        }
    }
}

#[instrument(skip(state, body), fields(body_len = body.len()))]
async fn relay(state: &RelayState, method: Method, body: Bytes) -> Result<Response, RelayError> {
    if method == Method::OPTIONS {
        return Ok((StatusCode::OK, cors_headers()).into_response());
    }
    if method != Method::POST {
        return Err(RelayError::MethodNotAllowed);
    }

    let config = &state.config;
    let api_key = config
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or(RelayError::MissingCredential)?;

    let payload: RelayPayload = serde_json::from_slice(&body).map_err(|e| {
        debug!("Invalid relay payload: {}", e);
        RelayError::InvalidPayload
    })?;

    let request = CompletionRequest {
        model: &config.model,
        messages: augment(payload.messages, config.max_message_chars),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        stream: config.stream,
    };
    debug!(turns = request.messages.len(), stream = request.stream, "Forwarding conversation");

    let upstream = state
        .http
        .post(&config.api_url)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .with_context(|| format!("Failed to send request to completion API at {}", config.api_url))
        .map_err(RelayError::Internal)?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        let text = upstream
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        let details = serde_json::from_str(&text).unwrap_or(Value::String(text));
        return Err(RelayError::Upstream { status, details });
    }

    if config.stream {
        let content_type = upstream
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("text/event-stream"));
        let mut headers = cors_headers();
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        return Ok((
            StatusCode::OK,
            headers,
            Body::from_stream(upstream.bytes_stream()),
        )
            .into_response());
    }

    let completion: Value = upstream
        .json()
        .await
        .context("Failed to parse JSON response from completion API")
        .map_err(RelayError::Internal)?;
    Ok((StatusCode::OK, cors_headers(), Json(completion)).into_response())
}

/// Prepends the fixed instruction. Caller-supplied system messages are dropped
/// so the instruction cannot be overridden; every other entry is forwarded
/// as sent, apart from the optional cap on string content.
fn augment(messages: Vec<Value>, max_chars: Option<usize>) -> Vec<Value> {
    let mut forwarded = Vec::with_capacity(messages.len() + 1);
    forwarded.push(json!({
        "role": "system",
        "content": SYSTEM_INSTRUCTION.content,
    }));
    for mut message in messages {
        if message.get("role").and_then(Value::as_str) == Some("system") {
            debug!("Dropping caller-supplied system message");
            continue;
        }
        if let (Some(max), Some(Value::String(content))) = (max_chars, message.get_mut("content")) {
            if content.chars().count() > max {
                *content = content.chars().take(max).collect::<String>() + "...";
            }
        }
        forwarded.push(message);
    }
    forwarded
}

pub async fn start_relay_server(port: u16, config: RelayConfig) -> Result<()> {
    if config.api_key.is_none() {
        warn!("No completion API key configured; every chat request will fail with 500");
    }
    info!(
        model = %config.model,
        stream = config.stream,
        "Relaying to {}",
        config.api_url
    );
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Relay listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down relay");
            }
        })
        .await
        .context("Relay server failed")?;

    Ok(())
}
