// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic test doubles for the Macrodesk support agent.

pub mod mock_provider;

pub use mock_provider::{FailingProvider, MockProvider};
