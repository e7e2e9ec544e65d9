// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Confab AI-thread orchestration subsystem.
//!
//! This crate provides the foundational trait definitions, error type, and
//! common types used throughout the Confab workspace. The surrounding chat
//! application (rooms, membership, realtime mirroring) talks to the
//! orchestration core exclusively through the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ConfabError;
pub use types::{
    ChatMessage, ChatRole, CredentialScheme, ProviderKind, QueueStatus, RunId, RunStatus,
    SenderKind, ThreadId, ThreadInfo, UserId, CHAT_CONTEXT_CLOSE, CHAT_CONTEXT_OPEN,
    CHAT_CONTEXT_PREFIX,
};

// Re-export the collaborator and provider seams at crate root.
pub use traits::{
    CredentialResolver, GenerationProvider, GenerationRequest, GenerationStream, ProfileRegistry,
    ThreadRegistry,
};
pub use traits::provider::GenerationEvent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confab_error_variants_render_readable_messages() {
        let not_found = ConfabError::ThreadNotFound {
            thread_id: "t-1".into(),
        };
        assert_eq!(not_found.to_string(), "thread not found: t-1");

        let archived = ConfabError::ThreadArchived {
            thread_id: "t-2".into(),
        };
        assert_eq!(archived.to_string(), "thread is archived: t-2");

        let missing = ConfabError::CredentialMissing {
            provider: ProviderKind::OpenAi,
        };
        assert_eq!(missing.to_string(), "no openai credential stored for this user");

        let client_key = ConfabError::ClientKeyRequired {
            provider: ProviderKind::Gemini,
        };
        assert!(client_key.to_string().contains("client-side decryption"));

        let provider = ConfabError::Provider {
            message: "status 500".into(),
            source: None,
        };
        assert_eq!(provider.to_string(), "provider error: status 500");
    }

    #[test]
    fn trait_objects_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ThreadRegistry>();
        assert_send_sync::<dyn ProfileRegistry>();
        assert_send_sync::<dyn CredentialResolver>();
        assert_send_sync::<dyn GenerationProvider>();
    }
}
