// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Macrodesk workspace.
//!
//! These are the canonical domain types. The storage crate re-exports them
//! rather than defining its own row structs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Returns the current UTC time as an ISO-8601 string with millisecond
/// precision and a trailing `Z`.
///
/// This matches the format SQLite produces with
/// `strftime('%Y-%m-%dT%H:%M:%fZ','now')`, so timestamps written from Rust
/// and from SQL compare correctly as strings.
pub fn now_iso() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Identifies the type of adapter behind a [`crate::PluginAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Provider,
    Storage,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// A communication surface a customer can reach the agent on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Voice,
}

/// Direction of a stored message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Lifecycle of an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Whether this order may transition to `next`.
    ///
    /// Delivered, cancelled, and refunded are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Shipped)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

/// Lifecycle of a batch coordination record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Open,
    Processing,
    Completed,
    Failed,
}

/// Lifecycle of a support ticket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Escalated,
    Resolved,
    Closed,
}

/// Derived stock level for an inventory row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

// --- Domain entities ---

/// A customer, identified by phone number and/or email (at most one of each).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub account_tier: Option<String>,
    /// Open-ended key/value facts accumulated over the conversation
    /// (issue_type, severity, order_number, ...). Merged last-write-wins
    /// per key by `save_customer_info`.
    pub extracted_data: serde_json::Map<String, serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// A single message in a customer's conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub customer_id: String,
    pub direction: Direction,
    pub channel: Channel,
    pub content: String,
    /// Groups inbound messages processed together in one model invocation.
    pub batch_id: Option<String>,
    /// JSON text. Outbound messages carry `{"tool_calls": [...]}`.
    pub metadata: Option<String>,
    pub created_at: String,
}

/// Per-customer batch scheduling record in the coordination store.
///
/// At most one `open` and one `processing` batch exist per customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: String,
    pub customer_id: String,
    pub status: BatchStatus,
    /// Updated on every inbound message; the debounce window is measured
    /// from this timestamp.
    pub last_activity_at: String,
    pub created_at: String,
}

/// A support ticket created by the escalation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub customer_id: String,
    pub status: TicketStatus,
    pub issue_type: Option<String>,
    pub severity: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A product in the catalog. Prices are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category: Option<String>,
}

/// Stock levels for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub warehouse: String,
    pub low_stock_threshold: i64,
}

impl Inventory {
    /// Stock status derived from quantity and threshold.
    pub fn stock_status(&self) -> StockStatus {
        if self.quantity == 0 {
            StockStatus::OutOfStock
        } else if self.quantity <= self.low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// A customer order. Totals are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub customer_id: Option<String>,
    pub status: OrderStatus,
    pub total_cents: i64,
    /// JSON text: `{"street": ..., "city": ..., "state": ..., "zip": ...}`.
    pub shipping_address: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A line item in an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderItem {
    pub fn line_total_cents(&self) -> i64 {
        self.quantity.saturating_mul(self.unit_price_cents)
    }
}

/// A help article the agent can surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeArticle {
    pub id: String,
    pub article_id: String,
    pub title: String,
    pub content: String,
    /// JSON text: `{"category": ..., "tags": [...]}`.
    pub metadata: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Record of one tool call made during a conversation turn.
///
/// Serialized into the outbound message's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
    pub result: serde_json::Value,
}

/// Profile fields collected by `save_customer_info`, applied to a customer
/// as one atomic merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub account_tier: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// Merged into `extracted_data` last-write-wins per key.
    pub extracted: serde_json::Map<String, serde_json::Value>,
}

impl CustomerUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.company_name.is_none()
            && self.account_tier.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.extracted.is_empty()
    }
}

// --- Provider types ---

/// A tool definition handed to the LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A single turn in the provider conversation format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// "system", "user", "assistant", or "tool".
    pub role: String,
    pub content: String,
    /// Tool calls attached to an assistant turn.
    pub tool_calls: Vec<ToolInvocation>,
    /// Set on "tool" turns: the id of the call this result answers.
    pub tool_call_id: Option<String>,
}

impl ProviderMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A request to an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub tools: Option<Vec<ToolSchema>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Token usage statistics reported by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A response from an LLM provider. May carry text, tool calls, or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub tool_calls: Vec<ToolInvocation>,
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
}
