use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::conversation::ChatMessage;
use crate::error::ChatError;
use crate::stream::FrameDecoder;

#[derive(Serialize)]
struct RelayRequest<'a> {
    messages: &'a [ChatMessage],
}

// Shape of a non-streamed completion, as echoed by the relay.
#[derive(Deserialize, Debug)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Debug)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize, Debug)]
struct CompletionMessage {
    content: Option<String>,
}

/// Lazy, finite, non-restartable sequence of content deltas.
pub type DeltaStream = BoxStream<'static, Result<String, ChatError>>;

pub enum RelayReply {
    Complete(String),
    Streaming(DeltaStream),
}

impl RelayReply {
    /// Normalizes both reply modes into a delta stream. A complete reply
    /// becomes a single delta.
    pub fn into_deltas(self) -> DeltaStream {
        match self {
            RelayReply::Complete(content) => stream::once(async move { Ok(content) }).boxed(),
            RelayReply::Streaming(deltas) => deltas,
        }
    }
}

#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends the conversation to the relay. The reply mode follows the
    /// response's content type.
    #[instrument(skip(self, messages), fields(url = %self.url, turns = messages.len()))]
    pub async fn send(&self, messages: &[ChatMessage]) -> Result<RelayReply, ChatError> {
        let response = self
            .http
            .post(&self.url)
            .json(&RelayRequest { messages })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Relay request failed");
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        if is_stream {
            debug!("Relay answered with an event stream");
            Ok(RelayReply::Streaming(delta_stream(response.bytes_stream().boxed())))
        } else {
            let completion: CompletionResponse = response.json().await?;
            debug!(?completion, "Relay answered with a complete reply");
            completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message)
                .and_then(|message| message.content)
                .map(RelayReply::Complete)
                .ok_or(ChatError::MissingContent)
        }
    }
}

struct DeltaState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: FrameDecoder,
    pending: VecDeque<Result<String, ChatError>>,
    finished: bool,
}

fn delta_stream(body: BoxStream<'static, reqwest::Result<Bytes>>) -> DeltaStream {
    let state = DeltaState {
        body,
        decoder: FrameDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    // Nothing after an error is trustworthy.
                    state.finished = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => state.pending.extend(state.decoder.push(&bytes)),
                Some(Err(e)) => state.pending.push_back(Err(ChatError::Transport(e))),
                None => {
                    state.finished = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
