// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool execution against the Persistence Gateway.
//!
//! Tools are pure with respect to the calling loop: they take validated
//! arguments, touch only storage, and always return a JSON result. Domain
//! problems (unknown order, policy rejection) are ordinary results carrying
//! an `error` or decision field; an internal storage failure is converted
//! into an error-kind result rather than raised into the loop.

use std::sync::Arc;

use macrodesk_core::StorageAdapter;
use macrodesk_core::types::{
    Channel, CustomerUpdate, Direction, Message, OrderStatus, Ticket, TicketStatus, ToolSchema,
    now_iso,
};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::escalation::{EscalationPolicy, EscalationTrigger, RefundDecision};
use crate::schema;

/// Keys in `save_customer_info` that map to dedicated customer columns.
const COLUMN_KEYS: &[&str] = &[
    "first_name",
    "last_name",
    "company_name",
    "account_tier",
    "email",
    "phone",
];

/// Executes tools named by the model against storage.
///
/// One executor is built per conversation turn (or voice session), carrying
/// the customer it acts for.
pub struct ToolExecutor {
    store: Arc<dyn StorageAdapter + Send + Sync>,
    policy: EscalationPolicy,
    customer_id: Option<String>,
    definitions: Vec<ToolSchema>,
}

impl ToolExecutor {
    /// Executor for the text channels (email, SMS).
    pub fn new(
        store: Arc<dyn StorageAdapter + Send + Sync>,
        policy: EscalationPolicy,
        customer_id: Option<String>,
    ) -> Self {
        Self {
            store,
            policy,
            customer_id,
            definitions: schema::text_channel_tools(),
        }
    }

    /// Executor for voice sessions: same tools plus `send_followup`.
    pub fn for_voice(
        store: Arc<dyn StorageAdapter + Send + Sync>,
        policy: EscalationPolicy,
        customer_id: Option<String>,
    ) -> Self {
        Self {
            store,
            policy,
            customer_id,
            definitions: schema::voice_tools(),
        }
    }

    /// The tool definitions this executor accepts.
    pub fn definitions(&self) -> &[ToolSchema] {
        &self.definitions
    }

    /// Execute a tool by name. Never fails: every outcome is a JSON result.
    pub async fn execute(&self, name: &str, args: &Value) -> Value {
        let Some(definition) = self.definitions.iter().find(|t| t.name == name) else {
            return json!({"error": format!("unknown tool: {name}")});
        };
        if let Err(message) = schema::validate_args(&definition.parameters, args) {
            return json!({"error": message});
        }

        info!(tool = name, "executing tool");
        let result = match name {
            "save_customer_info" => self.save_customer_info(args).await,
            "lookup_order" => self.lookup_order(args).await,
            "check_inventory" => self.check_inventory(args).await,
            "process_refund" => self.process_refund(args).await,
            "update_order_status" => self.update_order_status(args).await,
            "create_return_label" => self.create_return_label(args).await,
            "search_knowledge_base" => self.search_knowledge_base(args).await,
            "escalate_to_human" => self.escalate_to_human(args).await,
            "send_followup" => self.send_followup(args).await,
            other => Ok(json!({"error": format!("unknown tool: {other}")})),
        };

        match result {
            Ok(value) => value,
            Err(e) => {
                error!(tool = name, error = %e, "tool execution failed");
                json!({"error": format!("tool execution failed: {e}")})
            }
        }
    }

    async fn lookup_order(&self, args: &Value) -> Result<Value, macrodesk_core::MacrodeskError> {
        let order_number = normalize_order_number(str_arg(args, "order_number"));

        let Some((order, items)) = self.store.find_order(&order_number).await? else {
            return Ok(json!({
                "error": format!("Order {order_number} not found"),
                "suggestion": "Please verify the order number and try again."
            }));
        };

        let items_summary: Vec<Value> = items
            .iter()
            .map(|item| {
                json!({
                    "sku": item.sku,
                    "name": item.product_name,
                    "quantity": item.quantity,
                    "unit_price": cents_to_dollars(item.unit_price_cents),
                })
            })
            .collect();

        Ok(json!({
            "order_number": order.order_number,
            "status": order.status.to_string(),
            "total": cents_to_dollars(order.total_cents),
            "items": items_summary,
            "item_count": items.len(),
            "customer_name": order.customer_name,
            "customer_email": order.customer_email,
            "shipping_address": format_address(order.shipping_address.as_deref()),
            "tracking_number": order.tracking_number,
            "carrier": order.carrier,
            "notes": order.notes,
            "created_at": order.created_at,
            "message": format!(
                "Order {}: {} - {}",
                order.order_number,
                order.status,
                format_dollars(order.total_cents)
            ),
        }))
    }

    async fn check_inventory(&self, args: &Value) -> Result<Value, macrodesk_core::MacrodeskError> {
        let sku = str_arg(args, "sku").to_uppercase();
        let product_name = str_arg(args, "product_name");

        if sku.is_empty() && product_name.is_empty() {
            return Ok(json!({"error": "provide either sku or product_name"}));
        }

        let mut product = None;
        if !sku.is_empty() {
            product = self.store.find_product_by_sku(&sku).await?;
        }

        if product.is_none() && !product_name.is_empty() {
            let matches = self.store.search_products(product_name).await?;
            match matches.len() {
                0 => {}
                1 => product = matches.into_iter().next(),
                _ => {
                    // More than one name match: hand the model the candidates
                    // instead of guessing.
                    let candidates: Vec<Value> = matches
                        .iter()
                        .map(|p| json!({"sku": p.sku, "name": p.name}))
                        .collect();
                    return Ok(json!({
                        "ambiguous": true,
                        "candidates": candidates,
                        "message": format!(
                            "{} products match '{product_name}'; ask the customer which one or retry with a SKU.",
                            candidates.len()
                        ),
                    }));
                }
            }
        }

        let Some(product) = product else {
            let searched = if sku.is_empty() { product_name.to_string() } else { sku };
            return Ok(json!({
                "error": format!("Product not found: {searched}"),
                "suggestion": "Try searching with a different SKU or product name."
            }));
        };

        let inventory = self.store.inventory_for_product(&product.id).await?;
        let (quantity, warehouse, threshold) = match &inventory {
            Some(inv) => (inv.quantity, inv.warehouse.clone(), inv.low_stock_threshold),
            None => (0, "main".to_string(), 5),
        };
        let stock_status = match &inventory {
            Some(inv) => inv.stock_status().to_string(),
            None => "out_of_stock".to_string(),
        };

        Ok(json!({
            "sku": product.sku,
            "name": product.name,
            "price": cents_to_dollars(product.price_cents),
            "category": product.category,
            "quantity": quantity,
            "warehouse": warehouse,
            "low_stock_threshold": threshold,
            "stock_status": stock_status,
            "message": format!("{}: {} in stock ({})", product.name, quantity, stock_status),
        }))
    }

    async fn process_refund(&self, args: &Value) -> Result<Value, macrodesk_core::MacrodeskError> {
        let order_number = normalize_order_number(str_arg(args, "order_number"));
        let reason = str_arg(args, "reason");

        let Some((order, _items)) = self.store.find_order(&order_number).await? else {
            return Ok(json!({"error": format!("Order {order_number} not found")}));
        };

        if order.status == OrderStatus::Refunded {
            return Ok(json!({
                "error": format!("Order {order_number} has already been refunded"),
                "status": "refunded"
            }));
        }

        let (refund_cents, refund_type) = match args.get("amount").and_then(Value::as_f64) {
            Some(amount) => (dollars_to_cents(amount), "partial"),
            None => (order.total_cents, "full"),
        };

        if refund_cents <= 0 {
            return Ok(json!({
                "error": "refund amount must be greater than zero",
                "refund_amount": cents_to_dollars(refund_cents),
            }));
        }
        if refund_cents > order.total_cents {
            return Ok(json!({
                "error": format!(
                    "refund of {} exceeds the order total of {}",
                    format_dollars(refund_cents),
                    format_dollars(order.total_cents)
                ),
                "order_total": cents_to_dollars(order.total_cents),
            }));
        }

        match self.policy.assess_refund(refund_cents, reason) {
            RefundDecision::Escalate(trigger) => {
                // Forced escalation: no mutation, a ticket is opened for the
                // human queue.
                let ticket_id = self
                    .open_escalation_ticket(
                        "refund",
                        "high",
                        &format!(
                            "refund of {} for {order_number} requires approval ({})",
                            format_dollars(refund_cents),
                            trigger_label(trigger)
                        ),
                    )
                    .await?;

                Ok(json!({
                    "success": false,
                    "needs_approval": true,
                    "order_number": order_number,
                    "refund_amount": cents_to_dollars(refund_cents),
                    "reason": reason,
                    "escalation_trigger": trigger_label(trigger),
                    "ticket_id": ticket_id,
                    "message": format!(
                        "Refund of {} requires manager approval (limit {}). Escalated to the support team.",
                        format_dollars(refund_cents),
                        format_dollars(self.policy.refund_limit_cents())
                    ),
                }))
            }
            RefundDecision::Proceed => {
                let updated = self.store.apply_refund(&order_number, refund_cents).await?;
                Ok(json!({
                    "success": true,
                    "order_number": order_number,
                    "refund_amount": cents_to_dollars(refund_cents),
                    "refund_type": refund_type,
                    "original_total": cents_to_dollars(order.total_cents),
                    "new_status": updated.status.to_string(),
                    "reason": reason,
                    "customer_email": order.customer_email,
                    "message": format!(
                        "Refund of {} initiated for {order_number}. The customer will see it in 3-5 business days.",
                        format_dollars(refund_cents)
                    ),
                }))
            }
        }
    }

    async fn update_order_status(
        &self,
        args: &Value,
    ) -> Result<Value, macrodesk_core::MacrodeskError> {
        let order_number = normalize_order_number(str_arg(args, "order_number"));
        let requested = str_arg(args, "status").to_lowercase();
        let tracking = opt_str_arg(args, "tracking_number");
        let carrier = opt_str_arg(args, "carrier");

        const SETTABLE: &[OrderStatus] = &[
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ];
        let Ok(new_status) = requested.parse::<OrderStatus>() else {
            return Ok(json!({
                "error": "Invalid status. Must be one of: processing, shipped, delivered, cancelled"
            }));
        };
        if !SETTABLE.contains(&new_status) {
            return Ok(json!({
                "error": "Invalid status. Must be one of: processing, shipped, delivered, cancelled"
            }));
        }

        let Some((order, _items)) = self.store.find_order(&order_number).await? else {
            return Ok(json!({"error": format!("Order {order_number} not found")}));
        };

        if !order.status.can_transition_to(new_status) {
            return Ok(json!({
                "error": format!(
                    "Order {order_number} cannot move from {} to {new_status}",
                    order.status
                ),
                "current_status": order.status.to_string(),
            }));
        }

        if new_status == OrderStatus::Shipped && tracking.is_none() {
            return Ok(json!({
                "error": "Tracking number required when marking an order as shipped",
                "suggestion": "Please provide a tracking number."
            }));
        }

        let updated = self
            .store
            .set_order_status(&order_number, new_status, tracking, carrier)
            .await?;

        let tracking_note = updated
            .tracking_number
            .as_deref()
            .map(|t| format!(" (tracking: {t})"))
            .unwrap_or_default();
        Ok(json!({
            "success": true,
            "order_number": order_number,
            "previous_status": order.status.to_string(),
            "new_status": updated.status.to_string(),
            "tracking_number": updated.tracking_number,
            "carrier": updated.carrier,
            "message": format!(
                "Order {order_number} updated: {} -> {}{tracking_note}",
                order.status, updated.status
            ),
        }))
    }

    async fn create_return_label(
        &self,
        args: &Value,
    ) -> Result<Value, macrodesk_core::MacrodeskError> {
        let order_number = normalize_order_number(str_arg(args, "order_number"));

        let Some((order, _items)) = self.store.find_order(&order_number).await? else {
            return Ok(json!({"error": format!("Order {order_number} not found")}));
        };

        if !matches!(order.status, OrderStatus::Shipped | OrderStatus::Delivered) {
            return Ok(json!({
                "error": format!(
                    "Order {order_number} is {}; a return label can only be issued once it has shipped or been delivered",
                    order.status
                ),
                "status": order.status.to_string(),
            }));
        }

        let suffix = uuid::Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        let label_id = format!("RTN-{}-{suffix}", order_number.trim_start_matches("ORD-"));

        Ok(json!({
            "success": true,
            "order_number": order_number,
            "return_label_id": label_id,
            "carrier": "USPS",
            "return_address": "Macrocenter Returns, 123 Warehouse Way, Austin TX 78701",
            "valid_until": "30 days from today",
            "message": format!(
                "Return label {label_id} created. The customer can print it from their \
                 order confirmation email or use the ID at any USPS location."
            ),
        }))
    }

    async fn search_knowledge_base(
        &self,
        args: &Value,
    ) -> Result<Value, macrodesk_core::MacrodeskError> {
        let query = str_arg(args, "query").to_lowercase();
        let category = str_arg(args, "category").to_lowercase();

        let articles = self.store.published_articles().await?;
        let mut matches = Vec::new();

        for article in &articles {
            let metadata: Value = article
                .metadata
                .as_deref()
                .and_then(|m| serde_json::from_str(m).ok())
                .unwrap_or(Value::Null);
            let article_category = metadata
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            if !category.is_empty() && article_category != category {
                continue;
            }

            let title = article.title.to_lowercase();
            let content = article.content.to_lowercase();
            let tags: Vec<String> = metadata
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_lowercase)
                        .collect()
                })
                .unwrap_or_default();

            // Keyword scoring: title hits weigh most, tags next, body least.
            let mut score = 0i64;
            for word in query.split_whitespace() {
                if title.contains(word) {
                    score += 3;
                }
                if tags.iter().any(|tag| tag.contains(word)) {
                    score += 2;
                }
                if content.contains(word) {
                    score += 1;
                }
            }

            if score > 0 {
                matches.push(json!({
                    "article_id": article.article_id,
                    "title": article.title,
                    "category": metadata.get("category").cloned().unwrap_or(Value::Null),
                    "summary": truncate_chars(&article.content, 150),
                    "score": score,
                }));
            }
        }

        matches.sort_by_key(|m| -m["score"].as_i64().unwrap_or(0));
        let found = matches.len();
        matches.truncate(5);

        let message = if found > 0 {
            format!("Found {found} relevant article(s)")
        } else {
            "No matching articles found".to_string()
        };
        Ok(json!({"found": found, "articles": matches, "message": message}))
    }

    async fn save_customer_info(
        &self,
        args: &Value,
    ) -> Result<Value, macrodesk_core::MacrodeskError> {
        let Some(customer_id) = self.customer_id.as_deref() else {
            return Ok(json!({"error": "no customer associated with this conversation"}));
        };
        let Some(fields) = args.as_object() else {
            return Ok(json!({"error": "arguments must be a JSON object"}));
        };

        let mut update = CustomerUpdate::default();
        let mut saved = Vec::new();

        for (key, value) in fields {
            if value.is_null() {
                continue;
            }
            if COLUMN_KEYS.contains(&key.as_str()) {
                let Some(text) = value.as_str() else {
                    return Ok(json!({"error": format!("field {key} must be a string")}));
                };
                if text.is_empty() {
                    continue;
                }
                match key.as_str() {
                    "first_name" => update.first_name = Some(text.to_string()),
                    "last_name" => update.last_name = Some(text.to_string()),
                    "company_name" => update.company_name = Some(text.to_string()),
                    "account_tier" => update.account_tier = Some(text.to_string()),
                    "email" => update.email = Some(text.to_string()),
                    "phone" => update.phone_number = Some(text.to_string()),
                    _ => unreachable!(),
                }
                saved.push(format!("{key}: {text}"));
            } else {
                // Extracted-data keys. Known keys are strings; unknown keys
                // are tolerated as long as they are scalar.
                if !value.is_string() && !value.is_number() {
                    return Ok(json!({
                        "error": format!("field {key} must be a string or number")
                    }));
                }
                update.extracted.insert(key.clone(), value.clone());
                saved.push(format!("{key}: {}", scalar_to_string(value)));
            }
        }

        if update.is_empty() {
            return Ok(json!({
                "success": true,
                "saved": [],
                "message": "No new information to save"
            }));
        }

        let customer = self.store.update_customer_profile(customer_id, &update).await?;
        Ok(json!({
            "success": true,
            "saved": saved,
            "extracted_data": Value::Object(customer.extracted_data),
            "message": format!("Saved: {}", saved.join(", ")),
        }))
    }

    async fn escalate_to_human(
        &self,
        args: &Value,
    ) -> Result<Value, macrodesk_core::MacrodeskError> {
        let reason = str_arg(args, "reason");
        let priority = match str_arg(args, "priority") {
            "" => "normal",
            other => other,
        };
        let summary = str_arg(args, "summary");

        let notes = if summary.is_empty() {
            reason.to_string()
        } else {
            format!("{reason}: {summary}")
        };
        let ticket_id = self.open_escalation_ticket(reason, priority, &notes).await?;

        let expected_response = match priority {
            "urgent" => "within 1 hour",
            "high" => "within 4 hours",
            _ => "within 24 hours",
        };
        let ticket_id_display = ticket_id.clone().unwrap_or_default();
        Ok(json!({
            "success": true,
            "ticket_id": ticket_id,
            "priority": priority,
            "reason": reason,
            "expected_response": expected_response,
            "message": format!(
                "Escalated to the support team. Ticket {ticket_id_display}; a human agent will respond {expected_response}."
            ),
        }))
    }

    async fn send_followup(&self, args: &Value) -> Result<Value, macrodesk_core::MacrodeskError> {
        let Some(customer_id) = self.customer_id.as_deref() else {
            return Ok(json!({"error": "no customer associated with this session"}));
        };

        let channel = match str_arg(args, "channel").parse::<Channel>() {
            Ok(Channel::Email) => Channel::Email,
            Ok(Channel::Sms) => Channel::Sms,
            _ => {
                return Ok(json!({
                    "error": format!(
                        "Invalid channel: {}. Use 'email' or 'sms'.",
                        str_arg(args, "channel")
                    )
                }));
            }
        };
        let content = str_arg(args, "message");

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            direction: Direction::Outbound,
            channel,
            content: content.to_string(),
            batch_id: None,
            metadata: Some(json!({"followup_from": "voice"}).to_string()),
            created_at: now_iso(),
        };
        self.store.insert_message(&message).await?;

        info!(channel = %channel, "voice follow-up queued");
        Ok(json!({
            "success": true,
            "channel": channel.to_string(),
            "message_id": message.id,
            "message": format!("Follow-up sent via {}.", channel.to_string().to_uppercase()),
        }))
    }

    async fn open_escalation_ticket(
        &self,
        issue_type: &str,
        severity: &str,
        notes: &str,
    ) -> Result<Option<String>, macrodesk_core::MacrodeskError> {
        let Some(customer_id) = self.customer_id.as_deref() else {
            // No customer attached (e.g. anonymous voice demo); the
            // escalation notice still reaches the model.
            return Ok(None);
        };
        let ticket = Ticket {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            status: TicketStatus::Escalated,
            issue_type: Some(issue_type.to_string()),
            severity: Some(severity.to_string()),
            notes: Some(notes.to_string()),
            created_at: now_iso(),
            updated_at: now_iso(),
        };
        self.store.create_ticket(&ticket).await?;
        info!(ticket_id = ticket.id, severity, "escalation ticket created");
        Ok(Some(ticket.id))
    }
}

fn trigger_label(trigger: EscalationTrigger) -> &'static str {
    match trigger {
        EscalationTrigger::OverRefundLimit => "over_refund_limit",
        EscalationTrigger::FraudSignal => "fraud_signal",
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn opt_str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Uppercases and prefixes bare numbers: "1001" -> "ORD-1001".
pub fn normalize_order_number(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if upper.starts_with("ORD-") {
        upper
    } else {
        format!("ORD-{upper}")
    }
}

fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn dollars_to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

fn format_dollars(cents: i64) -> String {
    format!("${:.2}", cents as f64 / 100.0)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

fn format_address(raw: Option<&str>) -> String {
    let Some(parsed) = raw.and_then(|r| serde_json::from_str::<Value>(r).ok()) else {
        return String::new();
    };
    let get = |key: &str| {
        parsed
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    format!("{}, {}, {} {}", get("street"), get("city"), get("state"), get("zip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrodesk_core::types::Customer;
    use macrodesk_storage::SqliteStore;
    use macrodesk_storage::fixtures::seed_demo_data;
    use tempfile::tempdir;

    async fn setup() -> (Arc<SqliteStore>, ToolExecutor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tools.db");
        let store = SqliteStore::new(macrodesk_config::model::StorageConfig {
            database_path: db_path.to_str().unwrap().to_string(),
            wal_mode: true,
        });
        store.initialize().await.unwrap();

        // Seed via a second handle on the same file; the store's writer is
        // not exposed.
        let db = macrodesk_storage::Database::open(db_path.to_str().unwrap())
            .await
            .unwrap();
        seed_demo_data(&db).await.unwrap();
        db.close().await.unwrap();

        let store = Arc::new(store);
        let customer = Customer {
            id: "c1".to_string(),
            phone_number: Some("+15551234567".to_string()),
            email: Some("kal@example.com".to_string()),
            first_name: None,
            last_name: None,
            company_name: None,
            account_tier: None,
            extracted_data: serde_json::Map::new(),
            created_at: now_iso(),
            updated_at: now_iso(),
        };
        store.create_customer(&customer).await.unwrap();

        let executor = ToolExecutor::new(
            store.clone(),
            EscalationPolicy::default(),
            Some("c1".to_string()),
        );
        (store, executor, dir)
    }

    #[tokio::test]
    async fn unknown_tool_returns_structured_error() {
        let (_store, executor, _dir) = setup().await;
        let result = executor.execute("teleport_package", &json!({})).await;
        assert!(result["error"].as_str().unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_a_validation_result() {
        let (_store, executor, _dir) = setup().await;
        let result = executor.execute("lookup_order", &json!({})).await;
        assert!(result["error"].as_str().unwrap().contains("order_number"));
    }

    #[tokio::test]
    async fn lookup_order_normalizes_bare_numbers() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute("lookup_order", &json!({"order_number": "1001"}))
            .await;
        assert_eq!(result["order_number"], "ORD-1001");
        assert_eq!(result["status"], "delivered");
        assert_eq!(result["total"], 329.99);
        assert_eq!(result["item_count"], 1);
    }

    #[tokio::test]
    async fn lookup_order_not_found_is_a_result_not_a_fault() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute("lookup_order", &json!({"order_number": "ORD-9999"}))
            .await;
        assert!(result["error"].as_str().unwrap().contains("ORD-9999"));
        assert!(result["suggestion"].is_string());
    }

    #[tokio::test]
    async fn check_inventory_by_sku() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute("check_inventory", &json!({"sku": "gpu-rtx4090"}))
            .await;
        assert_eq!(result["sku"], "GPU-RTX4090");
        assert_eq!(result["quantity"], 3);
        assert_eq!(result["stock_status"], "low_stock");
    }

    #[tokio::test]
    async fn check_inventory_ambiguous_name_returns_candidates() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute("check_inventory", &json!({"product_name": "GeForce"}))
            .await;
        assert_eq!(result["ambiguous"], true);
        assert!(result["candidates"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn check_inventory_requires_some_identifier() {
        let (_store, executor, _dir) = setup().await;
        let result = executor.execute("check_inventory", &json!({})).await;
        assert!(result["error"].as_str().unwrap().contains("sku or product_name"));
    }

    #[tokio::test]
    async fn refund_under_limit_mutates_order() {
        let (store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "process_refund",
                &json!({"order_number": "ORD-1001", "reason": "item_damaged"}),
            )
            .await;
        assert_eq!(result["success"], true);
        assert_eq!(result["refund_type"], "full");
        assert_eq!(result["refund_amount"], 329.99);

        let (order, _) = store.find_order("ORD-1001").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(order.total_cents, 0);
    }

    #[tokio::test]
    async fn refund_over_limit_escalates_without_mutation() {
        let (store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "process_refund",
                &json!({"order_number": "ORD-1004", "reason": "customer_request"}),
            )
            .await;
        assert_eq!(result["success"], false);
        assert_eq!(result["needs_approval"], true);
        assert_eq!(result["escalation_trigger"], "over_refund_limit");
        assert!(result["ticket_id"].is_string());

        // Order untouched.
        let (order, _) = store.find_order("ORD-1004").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.total_cents, 92_998);

        // An escalated ticket exists.
        let tickets = store.tickets_for_customer("c1").await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status, TicketStatus::Escalated);
    }

    #[tokio::test]
    async fn refund_with_fraud_reason_escalates_even_when_small() {
        let (store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "process_refund",
                &json!({"order_number": "ORD-1001", "reason": "dispute over charge", "amount": 20.0}),
            )
            .await;
        assert_eq!(result["needs_approval"], true);
        assert_eq!(result["escalation_trigger"], "fraud_signal");

        let (order, _) = store.find_order("ORD-1001").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn refund_exceeding_total_is_rejected() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "process_refund",
                &json!({"order_number": "ORD-1001", "reason": "courtesy", "amount": 400.0}),
            )
            .await;
        assert!(result["error"].as_str().unwrap().contains("exceeds the order total"));
    }

    #[tokio::test]
    async fn refund_twice_is_rejected() {
        let (_store, executor, _dir) = setup().await;
        executor
            .execute(
                "process_refund",
                &json!({"order_number": "ORD-1001", "reason": "courtesy", "amount": 10.0}),
            )
            .await;
        let second = executor
            .execute(
                "process_refund",
                &json!({"order_number": "ORD-1001", "reason": "courtesy", "amount": 10.0}),
            )
            .await;
        assert!(second["error"].as_str().unwrap().contains("already been refunded"));
    }

    #[tokio::test]
    async fn update_status_enforces_transitions() {
        let (_store, executor, _dir) = setup().await;

        // delivered -> shipped is not a legal move.
        let result = executor
            .execute(
                "update_order_status",
                &json!({"order_number": "ORD-1001", "status": "shipped", "tracking_number": "X"}),
            )
            .await;
        assert!(result["error"].as_str().unwrap().contains("cannot move"));

        // shipped -> delivered is.
        let result = executor
            .execute(
                "update_order_status",
                &json!({"order_number": "ORD-1002", "status": "delivered"}),
            )
            .await;
        assert_eq!(result["success"], true);
        assert_eq!(result["previous_status"], "shipped");
        assert_eq!(result["new_status"], "delivered");
    }

    #[tokio::test]
    async fn update_status_shipped_requires_tracking() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "update_order_status",
                &json!({"order_number": "ORD-1003", "status": "shipped"}),
            )
            .await;
        assert!(result["error"].as_str().unwrap().contains("Tracking number required"));
    }

    #[tokio::test]
    async fn update_status_rejects_unknown_status() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "update_order_status",
                &json!({"order_number": "ORD-1003", "status": "teleported"}),
            )
            .await;
        assert!(result["error"].as_str().unwrap().contains("Invalid status"));
    }

    #[tokio::test]
    async fn return_label_requires_shipped_or_delivered() {
        let (_store, executor, _dir) = setup().await;

        let rejected = executor
            .execute("create_return_label", &json!({"order_number": "ORD-1003"}))
            .await;
        assert!(rejected["error"].as_str().unwrap().contains("pending"));

        let ok = executor
            .execute("create_return_label", &json!({"order_number": "ORD-1001"}))
            .await;
        assert_eq!(ok["success"], true);
        assert!(ok["return_label_id"].as_str().unwrap().starts_with("RTN-1001-"));
    }

    #[tokio::test]
    async fn knowledge_search_ranks_title_matches_first() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute("search_knowledge_base", &json!({"query": "return policy"}))
            .await;
        assert!(result["found"].as_i64().unwrap() >= 1);
        assert_eq!(result["articles"][0]["article_id"], "KB-1001");
    }

    #[tokio::test]
    async fn knowledge_search_category_filter() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "search_knowledge_base",
                &json!({"query": "return", "category": "shipping"}),
            )
            .await;
        let articles = result["articles"].as_array().unwrap();
        assert!(articles.iter().all(|a| a["category"] == "shipping"));
    }

    #[tokio::test]
    async fn knowledge_search_no_matches_is_empty_not_error() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute("search_knowledge_base", &json!({"query": "quantum flux"}))
            .await;
        assert_eq!(result["found"], 0);
        assert!(result["articles"].as_array().unwrap().is_empty());
        assert!(result.get("error").is_none());
    }

    #[tokio::test]
    async fn save_customer_info_merges_and_is_idempotent() {
        let (store, executor, _dir) = setup().await;

        let args = json!({"first_name": "Kal", "issue_type": "refund", "severity": "high"});
        let first = executor.execute("save_customer_info", &args).await;
        assert_eq!(first["success"], true);

        let second = executor.execute("save_customer_info", &args).await;
        assert_eq!(second["extracted_data"], first["extracted_data"]);

        // Overwriting one key leaves the rest alone.
        let third = executor
            .execute("save_customer_info", &json!({"severity": "urgent"}))
            .await;
        assert_eq!(third["extracted_data"]["severity"], "urgent");
        assert_eq!(third["extracted_data"]["issue_type"], "refund");

        let customer = store.get_customer("c1").await.unwrap().unwrap();
        assert_eq!(customer.first_name.as_deref(), Some("Kal"));
    }

    #[tokio::test]
    async fn save_customer_info_rejects_non_scalar_values() {
        let (_store, executor, _dir) = setup().await;
        let result = executor
            .execute("save_customer_info", &json!({"issue_type": ["a", "b"]}))
            .await;
        assert!(result["error"].as_str().unwrap().contains("issue_type"));
    }

    #[tokio::test]
    async fn escalate_to_human_creates_ticket() {
        let (store, executor, _dir) = setup().await;
        let result = executor
            .execute(
                "escalate_to_human",
                &json!({"reason": "customer requested a human", "priority": "urgent", "summary": "wants to talk billing"}),
            )
            .await;
        assert_eq!(result["success"], true);
        assert_eq!(result["expected_response"], "within 1 hour");

        let tickets = store.tickets_for_customer("c1").await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].severity.as_deref(), Some("urgent"));
    }

    #[tokio::test]
    async fn send_followup_is_voice_only() {
        let (store, text_executor, _dir) = setup().await;

        let result = text_executor
            .execute("send_followup", &json!({"channel": "email", "message": "hi"}))
            .await;
        assert!(result["error"].as_str().unwrap().contains("unknown tool"));

        let voice_executor = ToolExecutor::for_voice(
            store.clone(),
            EscalationPolicy::default(),
            Some("c1".to_string()),
        );
        let result = voice_executor
            .execute(
                "send_followup",
                &json!({"channel": "email", "message": "Here is your return label."}),
            )
            .await;
        assert_eq!(result["success"], true);

        let messages = store.messages_for_customer("c1", None).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel, Channel::Email);
        assert_eq!(messages[0].direction, Direction::Outbound);
    }

    #[tokio::test]
    async fn send_followup_rejects_voice_channel() {
        let (store, _executor, _dir) = setup().await;
        let voice_executor = ToolExecutor::for_voice(
            store.clone(),
            EscalationPolicy::default(),
            Some("c1".to_string()),
        );
        let result = voice_executor
            .execute("send_followup", &json!({"channel": "voice", "message": "hi"}))
            .await;
        assert!(result["error"].as_str().unwrap().contains("Invalid channel"));
    }

    #[test]
    fn order_number_normalization() {
        assert_eq!(normalize_order_number("1001"), "ORD-1001");
        assert_eq!(normalize_order_number("ord-1001"), "ORD-1001");
        assert_eq!(normalize_order_number(" ORD-1001 "), "ORD-1001");
    }
}
