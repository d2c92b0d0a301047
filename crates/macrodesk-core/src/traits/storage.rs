// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait: the Persistence Gateway the rest of the system
//! talks to.
//!
//! Every mutation is atomic with respect to its own read-then-write; no
//! multi-call transactional rollback is offered or required.

use async_trait::async_trait;

use crate::error::MacrodeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    BatchRecord, Customer, CustomerUpdate, Inventory, KnowledgeArticle, Message, Order, OrderItem,
    OrderStatus, Product, Ticket,
};

/// Typed persistence operations over customers, messages, batches, and the
/// e-commerce reference data.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, pragmas).
    async fn initialize(&self) -> Result<(), MacrodeskError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), MacrodeskError>;

    // --- Customers ---

    async fn create_customer(&self, customer: &Customer) -> Result<(), MacrodeskError>;

    async fn get_customer(&self, id: &str) -> Result<Option<Customer>, MacrodeskError>;

    async fn find_customer_by_phone(&self, phone: &str)
    -> Result<Option<Customer>, MacrodeskError>;

    async fn find_customer_by_email(&self, email: &str)
    -> Result<Option<Customer>, MacrodeskError>;

    async fn list_customers(&self, limit: i64) -> Result<Vec<Customer>, MacrodeskError>;

    /// Backfills a missing phone number (channel linking). No-op semantics
    /// are the caller's concern; the column must currently be NULL.
    async fn set_customer_phone(&self, id: &str, phone: &str) -> Result<(), MacrodeskError>;

    /// Backfills a missing email (channel linking).
    async fn set_customer_email(&self, id: &str, email: &str) -> Result<(), MacrodeskError>;

    /// Applies a profile update atomically: column fields overwrite when
    /// present, `extracted` merges into `extracted_data` last-write-wins
    /// per key. Returns the updated customer.
    async fn update_customer_profile(
        &self,
        id: &str,
        update: &CustomerUpdate,
    ) -> Result<Customer, MacrodeskError>;

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), MacrodeskError>;

    /// All messages for a customer, oldest first. `limit`, when set, keeps
    /// the most recent N (still returned oldest first).
    async fn messages_for_customer(
        &self,
        customer_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, MacrodeskError>;

    /// Inbound messages stamped with the given batch id, oldest first.
    async fn messages_for_batch(&self, batch_id: &str) -> Result<Vec<Message>, MacrodeskError>;

    // --- Batches (debounce coordination store) ---

    /// Finds the customer's open batch or creates one, then stamps
    /// `last_activity_at` to now. This is the debounce timer reset.
    async fn open_batch(&self, customer_id: &str) -> Result<BatchRecord, MacrodeskError>;

    /// Atomically claims every open batch that has been quiet for at least
    /// `window_seconds`, flipping it to `processing`. Customers that
    /// already have a batch in flight are skipped.
    async fn claim_due_batches(
        &self,
        window_seconds: u64,
    ) -> Result<Vec<BatchRecord>, MacrodeskError>;

    async fn complete_batch(&self, batch_id: &str) -> Result<(), MacrodeskError>;

    async fn fail_batch(&self, batch_id: &str) -> Result<(), MacrodeskError>;

    async fn get_batch(&self, batch_id: &str) -> Result<Option<BatchRecord>, MacrodeskError>;

    // --- Orders ---

    async fn find_order(
        &self,
        order_number: &str,
    ) -> Result<Option<(Order, Vec<OrderItem>)>, MacrodeskError>;

    /// Marks the order refunded and reduces its total by `amount_cents`,
    /// in one transaction. Returns the updated order.
    async fn apply_refund(
        &self,
        order_number: &str,
        amount_cents: i64,
    ) -> Result<Order, MacrodeskError>;

    /// Sets the order status (and tracking/carrier when provided).
    /// Transition validity is the caller's responsibility.
    async fn set_order_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        tracking_number: Option<&str>,
        carrier: Option<&str>,
    ) -> Result<Order, MacrodeskError>;

    // --- Catalog ---

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<Product>, MacrodeskError>;

    /// Case-insensitive substring search on product name.
    async fn search_products(&self, name: &str) -> Result<Vec<Product>, MacrodeskError>;

    async fn inventory_for_product(
        &self,
        product_id: &str,
    ) -> Result<Option<Inventory>, MacrodeskError>;

    // --- Knowledge base ---

    async fn published_articles(&self) -> Result<Vec<KnowledgeArticle>, MacrodeskError>;

    // --- Tickets ---

    async fn create_ticket(&self, ticket: &Ticket) -> Result<(), MacrodeskError>;

    async fn tickets_for_customer(&self, customer_id: &str)
    -> Result<Vec<Ticket>, MacrodeskError>;
}
