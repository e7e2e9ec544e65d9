// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history loading and shaping.
//!
//! Reconstructs the ordered transcript for a thread and applies two
//! content-shape transforms before it reaches a provider:
//! - system messages carrying the `[chat-context]` prefix become user-role
//!   content wrapped in `<chat-context>` markers, so injected room context
//!   reads as background information instead of a directive;
//! - user messages are annotated `[Name]: content` for the chat-completion
//!   provider, where speaker attribution helps the model track a
//!   multi-party thread. Skipped for Gemini, whose strict role alternation
//!   already merges speakers.

use std::collections::HashMap;
use std::str::FromStr;

use confab_core::{
    ChatMessage, ChatRole, ConfabError, ProfileRegistry, ProviderKind, ThreadId, UserId,
    CHAT_CONTEXT_CLOSE, CHAT_CONTEXT_OPEN, CHAT_CONTEXT_PREFIX,
};
use confab_store::queries::messages;
use confab_store::Database;

/// Load the provider-ready message list for a thread.
pub async fn load_history(
    db: &Database,
    profiles: &dyn ProfileRegistry,
    thread_id: &ThreadId,
    provider: ProviderKind,
) -> Result<Vec<ChatMessage>, ConfabError> {
    let rows = messages::messages_for_thread(db, &thread_id.0).await?;
    let annotate = provider == ProviderKind::OpenAi;

    // One registry lookup per distinct sender.
    let mut name_cache: HashMap<String, Option<String>> = HashMap::new();

    let mut shaped = Vec::with_capacity(rows.len());
    for row in rows {
        let role = ChatRole::from_str(&row.role).map_err(|_| {
            ConfabError::Internal(format!(
                "message {} has unrecognized role '{}'",
                row.id, row.role
            ))
        })?;

        let message = match role {
            ChatRole::System => match row.content.strip_prefix(CHAT_CONTEXT_PREFIX) {
                Some(body) => ChatMessage::new(
                    ChatRole::User,
                    format!("{CHAT_CONTEXT_OPEN}\n{}\n{CHAT_CONTEXT_CLOSE}", body.trim()),
                ),
                None => ChatMessage::new(ChatRole::System, row.content),
            },
            ChatRole::User if annotate => {
                let name = resolve_name(profiles, &mut name_cache, &row.sender_id).await?;
                match name.or(row.sender_name) {
                    Some(name) => {
                        ChatMessage::new(ChatRole::User, format!("[{name}]: {}", row.content))
                    }
                    None => ChatMessage::new(ChatRole::User, row.content),
                }
            }
            _ => ChatMessage::new(role, row.content),
        };
        shaped.push(message);
    }
    Ok(shaped)
}

async fn resolve_name(
    profiles: &dyn ProfileRegistry,
    cache: &mut HashMap<String, Option<String>>,
    sender_id: &Option<String>,
) -> Result<Option<String>, ConfabError> {
    let Some(sender_id) = sender_id else {
        return Ok(None);
    };
    if let Some(cached) = cache.get(sender_id) {
        return Ok(cached.clone());
    }
    let name = profiles.display_name(&UserId(sender_id.clone())).await?;
    cache.insert(sender_id.clone(), name.clone());
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_store::database::now_timestamp;
    use confab_store::models::{MessageRow, ThreadRow};
    use confab_store::queries::profiles::upsert_profile;
    use confab_store::queries::threads::insert_thread;
    use confab_store::SqliteProfileRegistry;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        insert_thread(
            &db,
            &ThreadRow {
                id: "t-1".to_string(),
                owner_id: "user-1".to_string(),
                title: String::new(),
                provider: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                system_prompt: None,
                archived: false,
                created_at: now_timestamp(),
                updated_at: now_timestamp(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    async fn append(
        db: &Database,
        id: &str,
        role: &str,
        sender_id: Option<&str>,
        sender_name: Option<&str>,
        content: &str,
    ) {
        messages::append_message(
            db,
            &MessageRow {
                id: id.to_string(),
                thread_id: "t-1".to_string(),
                role: role.to_string(),
                sender_id: sender_id.map(str::to_string),
                sender_name: sender_name.map(str::to_string),
                content: content.to_string(),
                created_at: now_timestamp(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn chat_context_messages_become_wrapped_user_content() {
        let (db, _dir) = setup_db().await;
        append(&db, "m-1", "system", None, None, "[chat-context] Alice joined the room").await;
        append(&db, "m-2", "user", Some("user-1"), None, "hello").await;

        let profiles = SqliteProfileRegistry::new(db.clone());
        let history = load_history(&db, &profiles, &ThreadId("t-1".into()), ProviderKind::Gemini)
            .await
            .unwrap();

        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(
            history[0].content,
            "<chat-context>\nAlice joined the room\n</chat-context>"
        );
        assert_eq!(history[1].content, "hello");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn user_messages_are_annotated_for_openai_only() {
        let (db, _dir) = setup_db().await;
        upsert_profile(&db, "user-1", Some("Ada")).await.unwrap();
        append(&db, "m-1", "user", Some("user-1"), None, "hello").await;
        append(&db, "m-2", "assistant", None, None, "hi").await;

        let profiles = SqliteProfileRegistry::new(db.clone());

        let openai = load_history(&db, &profiles, &ThreadId("t-1".into()), ProviderKind::OpenAi)
            .await
            .unwrap();
        assert_eq!(openai[0].content, "[Ada]: hello");
        assert_eq!(openai[1].content, "hi");

        let gemini = load_history(&db, &profiles, &ThreadId("t-1".into()), ProviderKind::Gemini)
            .await
            .unwrap();
        assert_eq!(gemini[0].content, "hello");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn captured_sender_name_is_the_fallback() {
        let (db, _dir) = setup_db().await;
        // No profile row; the captured name on the message row is used.
        append(&db, "m-1", "user", Some("user-2"), Some("Guest"), "hey").await;
        // No profile and no captured name: unannotated.
        append(&db, "m-2", "user", Some("user-3"), None, "anonymous hello").await;

        let profiles = SqliteProfileRegistry::new(db.clone());
        let history = load_history(&db, &profiles, &ThreadId("t-1".into()), ProviderKind::OpenAi)
            .await
            .unwrap();

        assert_eq!(history[0].content, "[Guest]: hey");
        assert_eq!(history[1].content, "anonymous hello");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn plain_system_messages_pass_through() {
        let (db, _dir) = setup_db().await;
        append(&db, "m-1", "system", None, None, "Generation failed: timeout").await;

        let profiles = SqliteProfileRegistry::new(db.clone());
        let history = load_history(&db, &profiles, &ThreadId("t-1".into()), ProviderKind::OpenAi)
            .await
            .unwrap();

        assert_eq!(history[0].role, ChatRole::System);
        assert_eq!(history[0].content, "Generation failed: timeout");

        db.close().await.unwrap();
    }
}
