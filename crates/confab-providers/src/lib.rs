// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation provider adapters for Confab.
//!
//! Two backends implement [`confab_core::GenerationProvider`]: the
//! OpenAI-compatible streaming adapter and the Gemini single-shot adapter.
//! Both compose the outbound system prompt the same way and share retry
//! policy for transient HTTP errors.

pub mod gemini;
pub mod openai;
pub mod prompt;
mod transient;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use prompt::compose_system_prompt;
