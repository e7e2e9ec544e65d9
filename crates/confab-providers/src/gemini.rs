// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-shot adapter for the Google Gemini `generateContent` API.
//!
//! Gemini contents must strictly alternate user/model roles and end on a
//! user entry, so the transcript is reshaped before the call: consecutive
//! same-role entries merge (joined with a blank line), system-role entries
//! fold into the user side, and a trailing model-authored entry is dropped.
//! The adapter emits no `Delta`s; the whole reply arrives as one
//! `Completed`.

use std::time::Duration;

use async_trait::async_trait;
use confab_config::model::GeminiConfig;
use confab_core::{
    ChatMessage, ChatRole, ConfabError, GenerationEvent, GenerationProvider, GenerationRequest,
    GenerationStream, ProviderKind,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::prompt::compose_system_prompt;
use crate::transient::is_transient_status;

/// HTTP client for the Gemini generateContent API. Auth is an API key as a
/// query parameter, supplied per-request.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Result<Self, ConfabError> {
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

    // The key rides in the query string, so this URL must never be logged.
    fn generate_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        )
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    /// Single-shot request; on transient statuses (429, 500, 503) retries
    /// once after a 1-second delay before failing hard.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream, ConfabError> {
        let body = GenerateContentRequest {
            contents: shape_contents(&request.messages),
            system_instruction: Instruction {
                parts: vec![TextPart {
                    text: compose_system_prompt(request.system_prompt.as_deref()),
                }],
            },
        };
        let url = self.generate_url(&request.model, request.api_key.expose_secret());

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying generateContent request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| ConfabError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "generateContent response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| ConfabError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let parsed: GenerateContentResponse =
                    serde_json::from_str(&body).map_err(|e| ConfabError::Provider {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                let text = extract_text(parsed)?;
                return Ok(Box::pin(futures::stream::iter(vec![Ok(
                    GenerationEvent::Completed(text),
                )])));
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
                Ok(api_err) => format!("Gemini API error: {}", api_err.error.message),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(ConfabError::Provider {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| ConfabError::Provider {
            message: "generateContent request failed after retries".into(),
            source: None,
        }))
    }
}

/// Reshape the transcript into strictly alternating user/model contents.
fn shape_contents(messages: &[ChatMessage]) -> Vec<Content> {
    let mut shaped: Vec<(&'static str, String)> = Vec::new();
    for message in messages {
        let role = match message.role {
            ChatRole::Assistant => "model",
            // Gemini has no system role inside contents.
            ChatRole::User | ChatRole::System => "user",
        };
        match shaped.last_mut() {
            Some((last_role, text)) if *last_role == role => {
                text.push_str("\n\n");
                text.push_str(&message.content);
            }
            _ => shaped.push((role, message.content.clone())),
        }
    }

    // The final content must be user-authored.
    if matches!(shaped.last(), Some(("model", _))) {
        shaped.pop();
    }

    shaped
        .into_iter()
        .map(|(role, text)| Content {
            role,
            parts: vec![TextPart { text }],
        })
        .collect()
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ConfabError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ConfabError::Provider {
            message: "Gemini returned no candidates with text".into(),
            source: None,
        });
    }
    Ok(text)
}

// --- Wire types ---

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Instruction,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
struct Instruction {
    parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
