// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use macrodesk_config::model::StorageConfig;
use macrodesk_core::types::{
    BatchRecord, BatchStatus, Customer, CustomerUpdate, Inventory, KnowledgeArticle, Message,
    Order, OrderItem, OrderStatus, Product, Ticket,
};
use macrodesk_core::{AdapterType, HealthStatus, MacrodeskError, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, MacrodeskError> {
        self.db.get().ok_or_else(|| MacrodeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MacrodeskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MacrodeskError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), MacrodeskError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MacrodeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MacrodeskError> {
        self.db()?.close().await
    }

    // --- Customers ---

    async fn create_customer(&self, customer: &Customer) -> Result<(), MacrodeskError> {
        queries::customers::create_customer(self.db()?, customer).await
    }

    async fn get_customer(&self, id: &str) -> Result<Option<Customer>, MacrodeskError> {
        queries::customers::get_customer(self.db()?, id).await
    }

    async fn find_customer_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<Customer>, MacrodeskError> {
        queries::customers::find_by_phone(self.db()?, phone).await
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, MacrodeskError> {
        queries::customers::find_by_email(self.db()?, email).await
    }

    async fn list_customers(&self, limit: i64) -> Result<Vec<Customer>, MacrodeskError> {
        queries::customers::list_customers(self.db()?, limit).await
    }

    async fn set_customer_phone(&self, id: &str, phone: &str) -> Result<(), MacrodeskError> {
        queries::customers::set_phone(self.db()?, id, phone).await
    }

    async fn set_customer_email(&self, id: &str, email: &str) -> Result<(), MacrodeskError> {
        queries::customers::set_email(self.db()?, id, email).await
    }

    async fn update_customer_profile(
        &self,
        id: &str,
        update: &CustomerUpdate,
    ) -> Result<Customer, MacrodeskError> {
        queries::customers::update_profile(self.db()?, id, update).await
    }

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), MacrodeskError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn messages_for_customer(
        &self,
        customer_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, MacrodeskError> {
        queries::messages::messages_for_customer(self.db()?, customer_id, limit).await
    }

    async fn messages_for_batch(&self, batch_id: &str) -> Result<Vec<Message>, MacrodeskError> {
        queries::messages::messages_for_batch(self.db()?, batch_id).await
    }

    // --- Batches ---

    async fn open_batch(&self, customer_id: &str) -> Result<BatchRecord, MacrodeskError> {
        queries::batches::open_batch(self.db()?, customer_id).await
    }

    async fn claim_due_batches(
        &self,
        window_seconds: u64,
    ) -> Result<Vec<BatchRecord>, MacrodeskError> {
        queries::batches::claim_due_batches(self.db()?, window_seconds).await
    }

    async fn complete_batch(&self, batch_id: &str) -> Result<(), MacrodeskError> {
        queries::batches::set_status(self.db()?, batch_id, BatchStatus::Completed).await
    }

    async fn fail_batch(&self, batch_id: &str) -> Result<(), MacrodeskError> {
        queries::batches::set_status(self.db()?, batch_id, BatchStatus::Failed).await
    }

    async fn get_batch(&self, batch_id: &str) -> Result<Option<BatchRecord>, MacrodeskError> {
        queries::batches::get_batch(self.db()?, batch_id).await
    }

    // --- Orders ---

    async fn find_order(
        &self,
        order_number: &str,
    ) -> Result<Option<(Order, Vec<OrderItem>)>, MacrodeskError> {
        queries::orders::find_order(self.db()?, order_number).await
    }

    async fn apply_refund(
        &self,
        order_number: &str,
        amount_cents: i64,
    ) -> Result<Order, MacrodeskError> {
        queries::orders::apply_refund(self.db()?, order_number, amount_cents).await
    }

    async fn set_order_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        tracking_number: Option<&str>,
        carrier: Option<&str>,
    ) -> Result<Order, MacrodeskError> {
        queries::orders::set_order_status(self.db()?, order_number, status, tracking_number, carrier)
            .await
    }

    // --- Catalog ---

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<Product>, MacrodeskError> {
        queries::catalog::find_product_by_sku(self.db()?, sku).await
    }

    async fn search_products(&self, name: &str) -> Result<Vec<Product>, MacrodeskError> {
        queries::catalog::search_products(self.db()?, name).await
    }

    async fn inventory_for_product(
        &self,
        product_id: &str,
    ) -> Result<Option<Inventory>, MacrodeskError> {
        queries::catalog::inventory_for_product(self.db()?, product_id).await
    }

    // --- Knowledge base ---

    async fn published_articles(&self) -> Result<Vec<KnowledgeArticle>, MacrodeskError> {
        queries::knowledge::published_articles(self.db()?).await
    }

    // --- Tickets ---

    async fn create_ticket(&self, ticket: &Ticket) -> Result<(), MacrodeskError> {
        queries::tickets::create_ticket(self.db()?, ticket).await
    }

    async fn tickets_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Ticket>, MacrodeskError> {
        queries::tickets::tickets_for_customer(self.db()?, customer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrodesk_core::types::{Channel, Direction, now_iso};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    fn make_customer(id: &str) -> Customer {
        Customer {
            id: id.to_string(),
            phone_number: Some(format!("+1555000{id}")),
            email: None,
            first_name: None,
            last_name: None,
            company_name: None,
            account_tier: None,
            extracted_data: serde_json::Map::new(),
            created_at: now_iso(),
            updated_at: now_iso(),
        }
    }

    #[tokio::test]
    async fn adapter_identity() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("identity.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn health_check_fails_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("uninit.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        assert!(store.health_check().await.is_err());
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn full_conversation_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);

        let customer = make_customer("c1");
        store.create_customer(&customer).await.unwrap();

        let batch = store.open_batch("c1").await.unwrap();
        let inbound = Message {
            id: "m1".to_string(),
            customer_id: "c1".to_string(),
            direction: Direction::Inbound,
            channel: Channel::Sms,
            content: "where is my order?".to_string(),
            batch_id: Some(batch.batch_id.clone()),
            metadata: None,
            created_at: now_iso(),
        };
        store.insert_message(&inbound).await.unwrap();

        let claimed = store.claim_due_batches(0).await.unwrap();
        assert_eq!(claimed.len(), 1);

        let members = store.messages_for_batch(&batch.batch_id).await.unwrap();
        assert_eq!(members.len(), 1);

        store.complete_batch(&batch.batch_id).await.unwrap();
        let finished = store.get_batch(&batch.batch_id).await.unwrap().unwrap();
        assert_eq!(finished.status, BatchStatus::Completed);

        store.close().await.unwrap();
    }
}
