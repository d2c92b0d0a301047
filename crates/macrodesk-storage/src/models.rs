// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `macrodesk-core::types` for use across
//! adapter trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use macrodesk_core::types::{
    BatchRecord, BatchStatus, Channel, Customer, CustomerUpdate, Direction, Inventory,
    KnowledgeArticle, Message, Order, OrderItem, OrderStatus, Product, Ticket, TicketStatus,
};
