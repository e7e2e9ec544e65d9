// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the orchestration core and its collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility and are
//! object-safe so callers can hold them as `Arc<dyn Trait + Send + Sync>`.

pub mod credentials;
pub mod provider;
pub mod registry;

pub use credentials::CredentialResolver;
pub use provider::{GenerationProvider, GenerationRequest, GenerationStream};
pub use registry::{ProfileRegistry, ThreadRegistry};
