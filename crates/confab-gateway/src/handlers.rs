// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers for the thread endpoints.
//!
//! Covers POST /v1/threads/{id}/messages, POST /v1/threads/{id}/drain,
//! GET /v1/threads/{id}/messages, and GET /health.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use confab_core::{ConfabError, SenderKind, ThreadId, UserId};
use confab_runner::{DrainOutcome, SubmitOutcome, Submission};
use confab_store::models::MessageRow;
use confab_store::queries::{messages, threads};

use crate::server::GatewayState;

/// Request body for POST /v1/threads/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    /// Already-authorized identity of the sender.
    pub user_id: String,
    /// Message text.
    pub content: String,
    /// Owner or collaborator; defaults to owner.
    #[serde(default)]
    pub sender_kind: Option<SenderKind>,
    /// Browser-decrypted API key for client-scheme credentials.
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

/// Request body for POST /v1/threads/{id}/drain. The whole body is optional.
#[derive(Debug, Default, Deserialize)]
pub struct DrainBody {
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

/// Response body for POST /v1/threads/{id}/messages.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResponse {
    Started { run_id: String },
    Queued { position: i64 },
}

/// Response body for POST /v1/threads/{id}/drain.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrainResponse {
    Processed { run_id: String },
    Idle,
    Busy,
}

/// One transcript entry in GET /v1/threads/{id}/messages.
#[derive(Debug, Serialize)]
pub struct TranscriptMessage {
    pub id: String,
    pub role: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub content: String,
    pub created_at: String,
}

impl From<MessageRow> for TranscriptMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            role: row.role,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Response body for GET /v1/threads/{id}/messages.
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<TranscriptMessage>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(error: ConfabError) -> Response {
    let status = match &error {
        ConfabError::ThreadNotFound { .. } => StatusCode::NOT_FOUND,
        ConfabError::ThreadArchived { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %error, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// POST /v1/threads/{id}/messages
///
/// Submits a message: starts a run when the thread is free, queues the
/// message when a run is active. Generation failures are recorded on the
/// run and in the transcript, not surfaced as HTTP errors.
pub async fn post_thread_message(
    State(state): State<GatewayState>,
    Path(thread_id): Path<String>,
    Json(body): Json<SubmitBody>,
) -> Response {
    if body.content.trim().is_empty() {
        return bad_request("content must not be empty");
    }

    let submission = Submission {
        thread_id: ThreadId(thread_id),
        user_id: UserId(body.user_id),
        content: body.content,
        sender_kind: body.sender_kind.unwrap_or(SenderKind::Owner),
    };

    match state.orchestrator.submit(submission, body.api_key).await {
        Ok(SubmitOutcome::Started(run_id)) => {
            Json(SubmitResponse::Started { run_id: run_id.0 }).into_response()
        }
        Ok(SubmitOutcome::Queued { position }) => {
            Json(SubmitResponse::Queued { position }).into_response()
        }
        Err(error) => error_response(error),
    }
}

/// POST /v1/threads/{id}/drain
///
/// Consumes the oldest pending queue item, if any, and drives a run for it.
pub async fn post_thread_drain(
    State(state): State<GatewayState>,
    Path(thread_id): Path<String>,
    body: Option<Json<DrainBody>>,
) -> Response {
    let api_key = body.and_then(|Json(body)| body.api_key);

    match state.orchestrator.drain(&ThreadId(thread_id), api_key).await {
        Ok(DrainOutcome::Processed(run_id)) => {
            Json(DrainResponse::Processed { run_id: run_id.0 }).into_response()
        }
        Ok(DrainOutcome::Idle) => Json(DrainResponse::Idle).into_response(),
        Ok(DrainOutcome::Busy) => Json(DrainResponse::Busy).into_response(),
        Err(error) => error_response(error),
    }
}

/// GET /v1/threads/{id}/messages
///
/// Returns the thread transcript, oldest first. Archived threads stay
/// readable.
pub async fn get_thread_messages(
    State(state): State<GatewayState>,
    Path(thread_id): Path<String>,
) -> Response {
    match threads::get_thread(&state.db, &thread_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(ConfabError::ThreadNotFound { thread_id });
        }
        Err(error) => return error_response(error),
    }

    match messages::messages_for_thread(&state.db, &thread_id).await {
        Ok(rows) => Json(TranscriptResponse {
            messages: rows.into_iter().map(TranscriptMessage::from).collect(),
        })
        .into_response(),
        Err(error) => error_response(error),
    }
}

/// GET /health
///
/// Liveness probe; unauthenticated.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_body_deserializes_with_required_fields_only() {
        let json = r#"{"user_id": "user-1", "content": "hello"}"#;
        let body: SubmitBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.user_id, "user-1");
        assert_eq!(body.content, "hello");
        assert!(body.sender_kind.is_none());
        assert!(body.api_key.is_none());
    }

    #[test]
    fn submit_body_deserializes_with_all_fields() {
        let json = r#"{
            "user_id": "user-2",
            "content": "hi",
            "sender_kind": "collaborator",
            "api_key": "ck-plaintext"
        }"#;
        let body: SubmitBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.sender_kind, Some(SenderKind::Collaborator));
        assert!(body.api_key.is_some());
    }

    #[test]
    fn submit_body_debug_redacts_the_key() {
        let json = r#"{"user_id": "u", "content": "c", "api_key": "ck-secret"}"#;
        let body: SubmitBody = serde_json::from_str(json).unwrap();
        let rendered = format!("{body:?}");
        assert!(!rendered.contains("ck-secret"));
    }

    #[test]
    fn submit_response_carries_status_tag() {
        let started = SubmitResponse::Started {
            run_id: "r-1".to_string(),
        };
        let json = serde_json::to_string(&started).unwrap();
        assert!(json.contains("\"status\":\"started\""));
        assert!(json.contains("\"run_id\":\"r-1\""));

        let queued = SubmitResponse::Queued { position: 3 };
        let json = serde_json::to_string(&queued).unwrap();
        assert!(json.contains("\"status\":\"queued\""));
        assert!(json.contains("\"position\":3"));
    }

    #[test]
    fn drain_response_unit_variants_serialize() {
        assert_eq!(
            serde_json::to_string(&DrainResponse::Idle).unwrap(),
            r#"{"status":"idle"}"#
        );
        assert_eq!(
            serde_json::to_string(&DrainResponse::Busy).unwrap(),
            r#"{"status":"busy"}"#
        );
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "thread not found: t-9".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("thread not found: t-9"));
    }
}
