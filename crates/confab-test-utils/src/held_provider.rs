// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation provider that blocks inside `generate` until released.
//!
//! Lets tests hold a run open for real: the submitting task sits inside the
//! provider call while the test asserts on busy-state behavior, then
//! `release_one` lets the held call finish.

use std::sync::Arc;

use async_trait::async_trait;
use confab_core::{
    ConfabError, GenerationEvent, GenerationProvider, GenerationRequest, GenerationStream,
    ProviderKind,
};
use futures::stream;
use tokio::sync::Semaphore;

/// A provider whose calls block until the test releases them.
pub struct HeldProvider {
    kind: ProviderKind,
    reply: String,
    started: Semaphore,
    gate: Semaphore,
}

impl HeldProvider {
    pub fn new(kind: ProviderKind, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            reply: reply.to_string(),
            started: Semaphore::new(0),
            gate: Semaphore::new(0),
        })
    }

    /// Waits until a `generate` call has entered the provider. Each call to
    /// this consumes one entry signal.
    pub async fn wait_until_called(&self) {
        match self.started.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => unreachable!("held provider semaphore is never closed"),
        }
    }

    /// Lets one held `generate` call proceed to its reply.
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl GenerationProvider for HeldProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationStream, ConfabError> {
        self.started.add_permits(1);
        match self.gate.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => {
                return Err(ConfabError::Internal(
                    "held provider gate closed".to_string(),
                ))
            }
        }
        Ok(Box::pin(stream::iter(vec![Ok(GenerationEvent::Completed(
            self.reply.clone(),
        ))])))
    }
}
