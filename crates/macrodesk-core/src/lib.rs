// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Macrodesk support agent.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Macrodesk workspace.

pub mod error;
pub mod traits;
pub mod types;

pub use error::MacrodeskError;
pub use types::{AdapterType, Channel, Direction, HealthStatus};

pub use traits::{PluginAdapter, ProviderAdapter, StorageAdapter};
