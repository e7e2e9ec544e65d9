// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Confab integration tests.
//!
//! Deterministic stand-ins for the orchestrator's collaborators, so the
//! integration suites run without network access or real credentials:
//!
//! - [`ScriptedProvider`] replays scripted replies and records every call
//! - [`HeldProvider`] blocks mid-generation until released, for busy-state
//!   tests
//! - [`StaticCredentials`] resolves keys from an in-memory table

pub mod held_provider;
pub mod scripted_provider;
pub mod static_credentials;

pub use held_provider::HeldProvider;
pub use scripted_provider::{RecordedCall, ScriptedProvider};
pub use static_credentials::StaticCredentials;
