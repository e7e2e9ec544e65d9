// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted generation provider for deterministic orchestrator tests.
//!
//! Replies are popped from a FIFO queue; each call is recorded so tests can
//! assert on the exact request the orchestrator built (shaped history,
//! system prompt, resolved API key).

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use confab_core::{
    ChatMessage, ConfabError, GenerationEvent, GenerationProvider, GenerationRequest,
    GenerationStream, ProviderKind,
};
use futures::stream;
use secrecy::ExposeSecret;
use tokio::sync::Mutex;

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub api_key: String,
}

enum Script {
    /// Stream items to emit, in order.
    Events(Vec<Result<GenerationEvent, String>>),
    /// `generate` itself fails before any stream exists.
    Refuse(String),
}

/// A mock provider that replays scripted replies.
///
/// When the script queue is empty, `generate` emits a single default
/// `Completed("scripted reply")`.
pub struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Queue a streaming reply: one `Delta` per chunk, then `Completed`
    /// carrying the concatenation.
    pub async fn reply_with_chunks(&self, chunks: &[&str]) {
        let mut events: Vec<Result<GenerationEvent, String>> = chunks
            .iter()
            .map(|chunk| Ok(GenerationEvent::Delta((*chunk).to_string())))
            .collect();
        events.push(Ok(GenerationEvent::Completed(chunks.concat())));
        self.script.lock().await.push_back(Script::Events(events));
    }

    /// Queue a single-shot reply: no `Delta`s, one `Completed`.
    pub async fn reply_single_shot(&self, text: &str) {
        self.script
            .lock()
            .await
            .push_back(Script::Events(vec![Ok(GenerationEvent::Completed(
                text.to_string(),
            ))]));
    }

    /// Queue a call-level failure (`generate` returns `Err`).
    pub async fn fail_with(&self, message: &str) {
        self.script
            .lock()
            .await
            .push_back(Script::Refuse(message.to_string()));
    }

    /// Queue a mid-stream failure: the given chunks stream out, then the
    /// stream yields an error instead of completing.
    pub async fn fail_mid_stream(&self, chunks: &[&str], message: &str) {
        let mut events: Vec<Result<GenerationEvent, String>> = chunks
            .iter()
            .map(|chunk| Ok(GenerationEvent::Delta((*chunk).to_string())))
            .collect();
        events.push(Err(message.to_string()));
        self.script.lock().await.push_back(Script::Events(events));
    }

    /// Every call made so far, oldest first.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream, ConfabError> {
        self.calls.lock().await.push(RecordedCall {
            model: request.model.clone(),
            system_prompt: request.system_prompt.clone(),
            messages: request.messages.clone(),
            api_key: request.api_key.expose_secret().to_string(),
        });

        let script = self.script.lock().await.pop_front();
        match script {
            None => Ok(Box::pin(stream::iter(vec![Ok(GenerationEvent::Completed(
                "scripted reply".to_string(),
            ))]))),
            Some(Script::Refuse(message)) => Err(ConfabError::Provider {
                message,
                source: None,
            }),
            Some(Script::Events(events)) => {
                let items: Vec<Result<GenerationEvent, ConfabError>> = events
                    .into_iter()
                    .map(|event| {
                        event.map_err(|message| ConfabError::Provider {
                            message,
                            source: None,
                        })
                    })
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use secrecy::SecretString;

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "gpt-4o-mini".into(),
            system_prompt: None,
            messages: vec![],
            api_key: SecretString::from("sk-test"),
        }
    }

    #[tokio::test]
    async fn chunked_reply_streams_then_completes() {
        let provider = ScriptedProvider::new(ProviderKind::OpenAi);
        provider.reply_with_chunks(&["Hel", "lo"]).await;

        let events: Vec<_> = provider.generate(request()).await.unwrap().collect().await;
        let events: Vec<GenerationEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                GenerationEvent::Delta("Hel".into()),
                GenerationEvent::Delta("lo".into()),
                GenerationEvent::Completed("Hello".into()),
            ]
        );

        let calls = provider.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].api_key, "sk-test");
    }

    #[tokio::test]
    async fn refused_call_errors_before_streaming() {
        let provider = ScriptedProvider::new(ProviderKind::Gemini);
        provider.fail_with("401 bad key").await;

        let err = provider.generate(request()).await.err().unwrap();
        assert!(err.to_string().contains("401 bad key"));
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_error() {
        let provider = ScriptedProvider::new(ProviderKind::OpenAi);
        provider.fail_mid_stream(&["partial"], "connection reset").await;

        let events: Vec<_> = provider.generate(request()).await.unwrap().collect().await;
        assert!(events[0].is_ok());
        assert!(events[1].is_err());
    }
}
