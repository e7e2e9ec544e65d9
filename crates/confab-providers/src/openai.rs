// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming adapter for the OpenAI Chat Completions API.
//!
//! Sends `stream: true` requests and converts the SSE chunk stream into
//! [`GenerationEvent`]s: every non-empty `choices[0].delta.content` fragment
//! becomes a `Delta`, and the `[DONE]` sentinel closes the stream with a
//! `Completed` carrying the accumulated text.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use confab_config::model::OpenAiConfig;
use confab_core::{
    ChatRole, ConfabError, GenerationEvent, GenerationProvider, GenerationRequest,
    GenerationStream, ProviderKind,
};
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::prompt::compose_system_prompt;
use crate::transient::is_transient_status;

/// HTTP client for OpenAI-compatible chat-completion backends.
///
/// API keys are per-user, so they travel with each [`GenerationRequest`]
/// rather than living in the client's default headers.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ConfabError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfabError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    /// Sends a streaming request; on transient statuses (429, 500, 503)
    /// retries once after a 1-second delay before failing hard.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream, ConfabError> {
        let body = ChatCompletionRequest::from_generation(&request);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying chat-completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(self.completions_url())
                .bearer_auth(request.api_key.expose_secret())
                .json(&body)
                .send()
                .await
                .map_err(|e| ConfabError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "chat-completion response received");

            if status.is_success() {
                return Ok(accumulate_sse(response));
            }

            if is_transient_status(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(ConfabError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("OpenAI API error: {}", api_err.error.message),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(ConfabError::Provider {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| ConfabError::Provider {
            message: "chat-completion request failed after retries".into(),
            source: None,
        }))
    }
}

// --- Wire types ---

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl ChatCompletionRequest {
    fn from_generation(request: &GenerationRequest) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: compose_system_prompt(request.system_prompt.as_deref()),
        });
        for message in &request.messages {
            messages.push(WireMessage {
                role: match message.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => "system",
                },
                content: message.content.clone(),
            });
        }
        Self {
            model: request.model.clone(),
            messages,
            stream: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// --- SSE accumulation ---

type WireEvents = Pin<
    Box<
        dyn Stream<
                Item = Result<
                    eventsource_stream::Event,
                    eventsource_stream::EventStreamError<reqwest::Error>,
                >,
            > + Send,
    >,
>;

struct SseState {
    events: WireEvents,
    text: String,
    finished: bool,
}

/// Converts the SSE body into `Delta`s and a final `Completed`, accumulating
/// fragments along the way. Chunks without content (role announcements,
/// finish markers) are skipped.
fn accumulate_sse(response: reqwest::Response) -> GenerationStream {
    let state = SseState {
        events: Box::pin(response.bytes_stream().eventsource()),
        text: String::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            match state.events.next().await {
                Some(Ok(event)) => {
                    if event.data.trim() == "[DONE]" {
                        state.finished = true;
                        let text = std::mem::take(&mut state.text);
                        return Some((Ok(GenerationEvent::Completed(text)), state));
                    }
                    match serde_json::from_str::<ChatChunk>(&event.data) {
                        Ok(chunk) => {
                            let fragment = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|choice| choice.delta.content);
                            match fragment {
                                Some(text) if !text.is_empty() => {
                                    state.text.push_str(&text);
                                    return Some((Ok(GenerationEvent::Delta(text)), state));
                                }
                                _ => continue,
                            }
                        }
                        Err(e) => {
                            state.finished = true;
                            return Some((
                                Err(ConfabError::Provider {
                                    message: format!("failed to parse stream chunk: {e}"),
                                    source: Some(Box::new(e)),
                                }),
                                state,
                            ));
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(ConfabError::Provider {
                            message: format!("SSE stream error: {e}"),
                            source: None,
                        }),
                        state,
                    ));
                }
                None => {
                    // The server closed the connection without [DONE].
                    state.finished = true;
                    return Some((
                        Err(ConfabError::Provider {
                            message: "stream ended before [DONE]".into(),
                            source: None,
                        }),
                        state,
                    ));
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_core::ChatMessage;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(&OpenAiConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 30,
        })
        .unwrap()
    }

    fn test_request() -> GenerationRequest {
        GenerationRequest {
            model: "gpt-4o-mini".into(),
            system_prompt: Some("Be terse.".into()),
            messages: vec![ChatMessage::new(ChatRole::User, "Hello")],
            api_key: SecretString::from("sk-test-key"),
        }
    }

    fn sse_body(chunks: &[&str]) -> String {
        let mut body = String::new();
        for chunk in chunks {
            body.push_str("data: ");
            body.push_str(chunk);
            body.push_str("\n\n");
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    async fn collect(stream: GenerationStream) -> Vec<Result<GenerationEvent, ConfabError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn deltas_accumulate_into_completed() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"Hello"}}]}"#,
            r#"{"choices":[{"delta":{"content":", world"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ]);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let events = collect(provider.generate(test_request()).await.unwrap()).await;

        let events: Vec<GenerationEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                GenerationEvent::Delta("Hello".into()),
                GenerationEvent::Delta(", world".into()),
                GenerationEvent::Completed("Hello, world".into()),
            ]
        );
    }

    #[tokio::test]
    async fn system_prompt_carries_context_instructions() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "stream": true,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[r#"{"choices":[{"delta":{"content":"ok"}}]}"#])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let events = collect(provider.generate(test_request()).await.unwrap()).await;
        assert_eq!(events.len(), 2);

        // The composed prompt starts with the thread's custom prompt.
        let sent = &server.received_requests().await.unwrap()[0];
        let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.starts_with("Be terse."));
        assert!(system.contains("<chat-context>"));
    }

    #[tokio::test]
    async fn retries_once_on_429_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[r#"{"choices":[{"delta":{"content":"ok"}}]}"#])),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let events = collect(provider.generate(test_request()).await.unwrap()).await;
        assert!(matches!(
            events.last().unwrap().as_ref().unwrap(),
            GenerationEvent::Completed(text) if text == "ok"
        ));
    }

    #[tokio::test]
    async fn non_transient_error_fails_with_api_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider.generate(test_request()).await.err().unwrap();
        assert!(err.to_string().contains("Incorrect API key"), "got: {err}");
    }

    #[tokio::test]
    async fn exhausted_retries_fail_hard() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider.generate(test_request()).await.err().unwrap();
        assert!(err.to_string().contains("503"), "got: {err}");
    }

    #[tokio::test]
    async fn truncated_stream_surfaces_an_error() {
        let server = MockServer::start().await;

        // No [DONE] sentinel.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n"),
            )
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let events = collect(provider.generate(test_request()).await.unwrap()).await;
        assert!(matches!(
            events.first().unwrap().as_ref().unwrap(),
            GenerationEvent::Delta(text) if text == "partial"
        ));
        assert!(events.last().unwrap().is_err());
    }
}
