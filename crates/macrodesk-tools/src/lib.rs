// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry and escalation policy for the Macrodesk support agent.
//!
//! The model names a tool by string and supplies an open argument map; this
//! crate owns the fixed registry of tool schemas, argument validation, and
//! execution against the Persistence Gateway. Escalation decisions (refund
//! limits, fraud signals) live in [`escalation`] as pure functions.

pub mod escalation;
pub mod executor;
pub mod schema;

pub use escalation::{EscalationPolicy, EscalationTrigger, RefundDecision};
pub use executor::ToolExecutor;
pub use schema::{text_channel_tools, validate_args, voice_tools};
