// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Macrodesk support agent.
//!
//! Three pieces, in dependency order:
//! - [`context`]: assembles the cross-channel transcript the model sees.
//! - [`engine`]: the bounded tool-calling loop producing one outbound reply
//!   per batch, with channel-selection parsing.
//! - [`batcher`]: the polling coordinator that claims quiet batches and
//!   feeds them to the engine.

pub mod batcher;
pub mod context;
pub mod engine;
pub mod prompts;

pub use batcher::BatchCoordinator;
pub use engine::{BatchOutcome, ConversationEngine, EngineConfig, parse_channel_directive};
