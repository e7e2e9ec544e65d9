// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation provider seam.
//!
//! Both backends are normalized into one cadence: zero or more
//! [`GenerationEvent::Delta`] fragments followed by exactly one
//! [`GenerationEvent::Completed`] carrying the full final text. A streaming
//! backend emits many deltas; a single-shot backend emits none. Consumers
//! must treat zero deltas as a valid stream, not an error.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use secrecy::SecretString;

use crate::error::ConfabError;
use crate::types::{ChatMessage, ProviderKind};

/// One event in a normalized generation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// A partial-output fragment, in emission order.
    Delta(String),
    /// The final full assistant text. Always the last event.
    Completed(String),
}

/// Everything a provider adapter needs for one generation call.
pub struct GenerationRequest {
    pub model: String,
    /// The thread's custom system prompt, if any. Adapters append the
    /// fixed context-interpretation segment before sending.
    pub system_prompt: Option<String>,
    /// Shaped transcript, oldest first.
    pub messages: Vec<ChatMessage>,
    pub api_key: SecretString,
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("messages", &self.messages.len())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Boxed event stream returned by [`GenerationProvider::generate`].
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationEvent, ConfabError>> + Send>>;

/// Adapter over one generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Which backend this adapter speaks to.
    fn kind(&self) -> ProviderKind;

    /// Starts a generation call and returns the normalized event stream.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream, ConfabError>;
}
