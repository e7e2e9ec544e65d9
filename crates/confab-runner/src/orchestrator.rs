// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The run/queue orchestrator.
//!
//! Decides, for each inbound submission, whether to start a generation run
//! immediately or durably queue the message behind the thread's active run,
//! then drives accepted runs to completion inline. All coordination happens
//! through conditional writes in the store; there are no in-memory locks, so
//! any number of processes can share one database safely.

use std::collections::HashMap;
use std::sync::Arc;

use confab_core::{
    ChatRole, ConfabError, CredentialResolver, GenerationEvent, GenerationProvider,
    GenerationRequest, ProfileRegistry, ProviderKind, RunId, SenderKind, ThreadId, ThreadInfo,
    ThreadRegistry, UserId,
};
use confab_store::database::now_timestamp;
use confab_store::models::MessageRow;
use confab_store::queries::{messages, queue, runs, stream as stream_events};
use confab_store::Database;
use futures::StreamExt;
use secrecy::SecretString;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::history;
use crate::reaper;

/// An inbound message for an AI thread, already authorized by the caller.
#[derive(Debug, Clone)]
pub struct Submission {
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub content: String,
    pub sender_kind: SenderKind,
}

/// What `submit` did with the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A run was created and driven; the message is in the transcript.
    Started(RunId),
    /// The thread was busy; the message waits in the queue. Position is
    /// 1-based among pending items at enqueue time.
    Queued { position: i64 },
}

/// What `drain` did with the thread's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The oldest pending item was consumed and a run driven for it.
    Processed(RunId),
    /// Nothing pending (or another drainer claimed the item first).
    Idle,
    /// A run is active; come back after it finishes.
    Busy,
}

/// Orchestrates runs and queues over the shared store.
pub struct Orchestrator {
    db: Database,
    threads: Arc<dyn ThreadRegistry>,
    profiles: Arc<dyn ProfileRegistry>,
    credentials: Arc<dyn CredentialResolver>,
    providers: HashMap<ProviderKind, Arc<dyn GenerationProvider>>,
    stale_after_secs: u64,
}

impl Orchestrator {
    pub fn new(
        db: Database,
        threads: Arc<dyn ThreadRegistry>,
        profiles: Arc<dyn ProfileRegistry>,
        credentials: Arc<dyn CredentialResolver>,
        providers: Vec<Arc<dyn GenerationProvider>>,
        stale_after_secs: u64,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.kind(), provider))
            .collect();
        Self {
            db,
            threads,
            profiles,
            credentials,
            providers,
            stale_after_secs,
        }
    }

    /// Accept a message for a thread: start a run if the thread is free,
    /// queue the message if not.
    ///
    /// `client_key` carries the browser-decrypted API key for client-scheme
    /// credentials; it is never persisted, so queued messages need the
    /// drain trigger to supply it again.
    ///
    /// Returns `Started` even when generation itself failed; the failure is
    /// recorded on the run and in the transcript. Only precondition and
    /// storage errors surface as `Err`.
    pub async fn submit(
        &self,
        submission: Submission,
        client_key: Option<SecretString>,
    ) -> Result<SubmitOutcome, ConfabError> {
        let thread = self.require_active_thread(&submission.thread_id).await?;

        // A fresh running run blocks the thread; a stale one is abandoned
        // and reaped so the slot frees up.
        if let Some(running) = runs::get_running_run(&self.db, &thread.id.0).await? {
            if !reaper::is_stale(&running, self.stale_after_secs) {
                return self.enqueue(&thread, &submission).await;
            }
            // Whether this process won the reap does not matter; the run
            // insert below is the authority either way.
            reaper::reap_if_stale(&self.db, &running, self.stale_after_secs).await?;
        }

        let run_id = RunId(Uuid::new_v4().to_string());
        if !runs::try_start_run(&self.db, &run_id.0, &thread.id.0).await? {
            debug!(thread_id = %thread.id, "lost the run gate, queueing instead");
            return self.enqueue(&thread, &submission).await;
        }
        info!(thread_id = %thread.id, run_id = %run_id, "run started");

        // The transcript must include the new message before the provider
        // sees the history.
        self.append_user_message(&thread, &submission.user_id, &submission.content)
            .await?;

        self.drive_generation(&thread, &run_id, client_key).await?;
        Ok(SubmitOutcome::Started(run_id))
    }

    /// Consume the oldest pending queue item for a thread, if any, and
    /// drive a run for it.
    pub async fn drain(
        &self,
        thread_id: &ThreadId,
        client_key: Option<SecretString>,
    ) -> Result<DrainOutcome, ConfabError> {
        let thread = self.require_active_thread(thread_id).await?;

        if runs::get_running_run(&self.db, &thread.id.0).await?.is_some() {
            return Ok(DrainOutcome::Busy);
        }

        let Some(item) = queue::oldest_pending(&self.db, &thread.id.0).await? else {
            return Ok(DrainOutcome::Idle);
        };

        // Exactly-once consumption: losing the claim means another drainer
        // took the item, which is indistinguishable from an empty queue.
        if !queue::claim(&self.db, item.id).await? {
            debug!(thread_id = %thread.id, item_id = item.id, "queue item claimed elsewhere");
            return Ok(DrainOutcome::Idle);
        }

        let sender = UserId(item.user_id.clone());
        self.append_user_message(&thread, &sender, &item.content).await?;

        let run_id = RunId(Uuid::new_v4().to_string());
        if !runs::try_start_run(&self.db, &run_id.0, &thread.id.0).await? {
            // A submission slipped in since the busy check. The materialized
            // message stays; that run's successor will cover it.
            debug!(thread_id = %thread.id, "drain lost the run gate after materializing");
            return Ok(DrainOutcome::Busy);
        }
        info!(thread_id = %thread.id, run_id = %run_id, item_id = item.id, "queued item drained");

        self.drive_generation(&thread, &run_id, client_key).await?;
        Ok(DrainOutcome::Processed(run_id))
    }

    async fn require_active_thread(&self, thread_id: &ThreadId) -> Result<ThreadInfo, ConfabError> {
        let thread = self
            .threads
            .lookup(thread_id)
            .await?
            .ok_or_else(|| ConfabError::ThreadNotFound {
                thread_id: thread_id.0.clone(),
            })?;
        if thread.archived {
            return Err(ConfabError::ThreadArchived {
                thread_id: thread_id.0.clone(),
            });
        }
        Ok(thread)
    }

    async fn enqueue(
        &self,
        thread: &ThreadInfo,
        submission: &Submission,
    ) -> Result<SubmitOutcome, ConfabError> {
        let receipt = queue::enqueue(
            &self.db,
            &thread.id.0,
            &submission.user_id.0,
            submission.sender_kind,
            &submission.content,
        )
        .await?;
        debug!(
            thread_id = %thread.id,
            item_id = receipt.item_id,
            position = receipt.position,
            "submission queued behind active run"
        );
        Ok(SubmitOutcome::Queued {
            position: receipt.position,
        })
    }

    async fn append_user_message(
        &self,
        thread: &ThreadInfo,
        user_id: &UserId,
        content: &str,
    ) -> Result<(), ConfabError> {
        // Capture the display name at write time; history shaping falls
        // back to it if the profile later disappears.
        let sender_name = self.profiles.display_name(user_id).await?;
        messages::append_message(
            &self.db,
            &MessageRow {
                id: Uuid::new_v4().to_string(),
                thread_id: thread.id.0.clone(),
                role: ChatRole::User.to_string(),
                sender_id: Some(user_id.0.clone()),
                sender_name,
                content: content.to_string(),
                created_at: now_timestamp(),
            },
        )
        .await
    }

    /// Drive one run: resolve the credential, load shaped history, call the
    /// provider, mirror deltas into the stream sink, and land the terminal
    /// state.
    ///
    /// Generation failures are recorded (run failed + system message) and
    /// swallowed; storage failures propagate and leave the run for the
    /// reaper.
    async fn drive_generation(
        &self,
        thread: &ThreadInfo,
        run_id: &RunId,
        client_key: Option<SecretString>,
    ) -> Result<(), ConfabError> {
        match self.generate_reply(thread, run_id, client_key).await {
            Ok(final_text) => {
                messages::append_message(
                    &self.db,
                    &MessageRow {
                        id: Uuid::new_v4().to_string(),
                        thread_id: thread.id.0.clone(),
                        role: ChatRole::Assistant.to_string(),
                        sender_id: None,
                        sender_name: None,
                        content: final_text,
                        created_at: now_timestamp(),
                    },
                )
                .await?;
                if !runs::complete_run(&self.db, &run_id.0).await? {
                    // The reaper got here first; the reply stays in the
                    // transcript regardless.
                    warn!(run_id = %run_id, "run was reaped before completion");
                } else {
                    info!(thread_id = %thread.id, run_id = %run_id, "run completed");
                }
                Ok(())
            }
            Err(error) if !matches!(error, ConfabError::Storage { .. }) => {
                let detail = error.to_string();
                warn!(thread_id = %thread.id, run_id = %run_id, error = %detail, "generation failed");
                runs::fail_run(&self.db, &run_id.0, &detail).await?;
                // The transcript is the error log.
                messages::append_message(
                    &self.db,
                    &MessageRow {
                        id: Uuid::new_v4().to_string(),
                        thread_id: thread.id.0.clone(),
                        role: ChatRole::System.to_string(),
                        sender_id: None,
                        sender_name: None,
                        content: format!("Generation failed: {detail}"),
                        created_at: now_timestamp(),
                    },
                )
                .await?;
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    async fn generate_reply(
        &self,
        thread: &ThreadInfo,
        run_id: &RunId,
        client_key: Option<SecretString>,
    ) -> Result<String, ConfabError> {
        let provider = self.provider_for(thread.provider)?;
        let api_key = self
            .credentials
            .resolve(&thread.owner_id, thread.provider, client_key)
            .await?;
        let history =
            history::load_history(&self.db, self.profiles.as_ref(), &thread.id, thread.provider)
                .await?;

        let request = GenerationRequest {
            model: thread.model.clone(),
            system_prompt: thread.system_prompt.clone(),
            messages: history,
            api_key,
        };
        let mut stream = provider.generate(request).await?;

        let mut seq: i64 = 0;
        while let Some(event) = stream.next().await {
            match event? {
                GenerationEvent::Delta(delta) => {
                    stream_events::append_event(&self.db, &thread.id.0, &run_id.0, seq, &delta)
                        .await?;
                    seq += 1;
                }
                GenerationEvent::Completed(text) => return Ok(text),
            }
        }
        Err(ConfabError::Provider {
            message: "stream ended without a final message".into(),
            source: None,
        })
    }

    fn provider_for(&self, kind: ProviderKind) -> Result<Arc<dyn GenerationProvider>, ConfabError> {
        self.providers.get(&kind).cloned().ok_or_else(|| {
            ConfabError::Internal(format!("no generation adapter registered for {kind}"))
        })
    }
}
