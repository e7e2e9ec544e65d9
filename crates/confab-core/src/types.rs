// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Confab workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for an AI conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

/// Unique identifier for a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

/// Unique identifier for a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a submission came from the thread owner or a collaborator with
/// access through a shared room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    Owner,
    Collaborator,
}

/// Lifecycle state of a generation run. `Running` is exclusive per thread;
/// `Completed` and `Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Lifecycle state of a queued submission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Consumed,
    Discarded,
}

/// Role of a transcript message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Which encryption generation produced a stored credential.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CredentialScheme {
    /// Sealed server-side; the server can decrypt it.
    Server,
    /// Encrypted in the browser; opaque to the server.
    Client,
}

/// Generation backend bound to a thread. Stored as a tagged value at
/// thread-assignment time and never re-derived on the generation path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ProviderKind {
    #[strum(serialize = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
    #[strum(serialize = "gemini")]
    #[serde(rename = "gemini")]
    Gemini,
}

impl ProviderKind {
    /// Guesses the backend from a model name. Assignment-time tooling only;
    /// the orchestration path always reads the stored tag.
    pub fn infer(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        if model.starts_with("gemini") {
            Some(Self::Gemini)
        } else if ["gpt", "chatgpt", "o1", "o3", "o4"]
            .iter()
            .any(|prefix| model.starts_with(prefix))
        {
            Some(Self::OpenAi)
        } else {
            None
        }
    }
}

/// Thread metadata the orchestration core reads through [`crate::traits::ThreadRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub owner_id: UserId,
    pub title: String,
    pub provider: ProviderKind,
    pub model: String,
    pub system_prompt: Option<String>,
    pub archived: bool,
}

/// Prefix the chat-room bridge puts on system messages that carry injected
/// room context. History shaping strips it and re-wraps the body in the
/// `<chat-context>` markers below.
pub const CHAT_CONTEXT_PREFIX: &str = "[chat-context]";

/// Opening marker for injected chat context in provider-bound messages.
pub const CHAT_CONTEXT_OPEN: &str = "<chat-context>";

/// Closing marker for injected chat context in provider-bound messages.
pub const CHAT_CONTEXT_CLOSE: &str = "</chat-context>";

/// A provider-ready transcript entry, after history shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
