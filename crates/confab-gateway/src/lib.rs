// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Confab orchestration core.
//!
//! Exposes the submit/drain surface and a transcript read over REST. The
//! gateway trusts the identity in the request body; authenticating callers
//! belongs to the surrounding application, not this crate.

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, GatewayState, ServerConfig};
