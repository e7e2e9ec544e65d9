// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run orchestration for Confab AI threads.
//!
//! This crate owns the submit/drain lifecycle: the single-flight run gate,
//! durable queueing behind an active run, history shaping for provider
//! calls, and lazy recovery of runs whose process died mid-generation.
//!
//! ## Components
//!
//! - [`Orchestrator`]: accepts submissions, starts or queues them, and
//!   drives accepted runs to a terminal state.
//! - [`history`]: turns stored transcript rows into the provider-ready
//!   message list (speaker annotation, chat-context wrapping).
//! - [`reaper`]: staleness checks for runs abandoned by a crashed process.

pub mod history;
pub mod orchestrator;
pub mod reaper;

pub use orchestrator::{DrainOutcome, Orchestrator, SubmitOutcome, Submission};
