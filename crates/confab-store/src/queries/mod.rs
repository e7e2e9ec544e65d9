// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL operations, grouped by table.

pub mod credentials;
pub mod messages;
pub mod profiles;
pub mod queue;
pub mod runs;
pub mod stream;
pub mod threads;
