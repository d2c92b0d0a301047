// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers: webhook ingestion for SMS and email, plus the read API
//! used by the UI poller.
//!
//! Signature validation of webhook payloads (Twilio/SendGrid style) is an
//! external collaborator concern and deliberately absent here.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use macrodesk_core::MacrodeskError;
use macrodesk_core::types::{Channel, Customer, Direction, Message, Ticket, now_iso};

use crate::AppState;

/// Handler-level error: storage problems become an opaque 500 so internal
/// error text never reaches a customer-facing channel.
pub enum ApiError {
    NotFound(&'static str),
    Internal,
}

impl From<MacrodeskError> for ApiError {
    fn from(e: MacrodeskError) -> Self {
        error!(error = %e, "request failed");
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

/// Incoming SMS webhook payload.
#[derive(Debug, Deserialize)]
pub struct SmsWebhookRequest {
    #[serde(rename = "from", alias = "from_number")]
    pub from_number: String,
    pub body: String,
}

/// Incoming email webhook payload.
#[derive(Debug, Deserialize)]
pub struct EmailWebhookRequest {
    pub from_email: String,
    #[serde(default)]
    pub subject: String,
    pub body: String,
}

/// Acknowledgment returned for both webhook kinds.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub customer_id: String,
    pub message_id: String,
    pub batch_id: String,
}

/// Customer plus their full ordered message history.
#[derive(Debug, Serialize)]
pub struct CustomerWithMessages {
    #[serde(flatten)]
    pub customer: Customer,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// POST /webhook/sms
pub async fn receive_sms(
    State(state): State<AppState>,
    Json(payload): Json<SmsWebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let customer = resolve_sms_customer(&state, &payload.from_number).await?;
    let response = ingest(&state, &customer, Channel::Sms, &payload.body).await?;
    Ok(Json(response))
}

/// POST /webhook/email
pub async fn receive_email(
    State(state): State<AppState>,
    Json(payload): Json<EmailWebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let customer = resolve_email_customer(&state, &payload.from_email).await?;
    let body = if payload.subject.is_empty() {
        payload.body
    } else {
        format!("Subject: {}\n\n{}", payload.subject, payload.body)
    };
    let response = ingest(&state, &customer, Channel::Email, &body).await?;
    Ok(Json(response))
}

/// Stores the inbound message inside the customer's open batch window.
async fn ingest(
    state: &AppState,
    customer: &Customer,
    channel: Channel,
    body: &str,
) -> Result<WebhookResponse, MacrodeskError> {
    let batch = state.store.open_batch(&customer.id).await?;
    let message = Message {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: customer.id.clone(),
        direction: Direction::Inbound,
        channel,
        content: body.to_string(),
        batch_id: Some(batch.batch_id.clone()),
        metadata: None,
        created_at: now_iso(),
    };
    state.store.insert_message(&message).await?;

    info!(
        customer_id = customer.id,
        channel = %channel,
        batch_id = batch.batch_id,
        "inbound message stored"
    );

    Ok(WebhookResponse {
        status: "received".to_string(),
        customer_id: customer.id.clone(),
        message_id: message.id,
        batch_id: batch.batch_id,
    })
}

/// Resolves an SMS sender to a customer.
///
/// Order: exact phone match; then demo channel linking (a phone-less
/// customer holding the configured demo email gets this number backfilled);
/// else a fresh customer.
pub async fn resolve_sms_customer(
    state: &AppState,
    phone: &str,
) -> Result<Customer, MacrodeskError> {
    if let Some(customer) = state.store.find_customer_by_phone(phone).await? {
        return Ok(customer);
    }

    if let Some(ref link_email) = state.config.gateway.demo_link_email
        && let Some(existing) = state.store.find_customer_by_email(link_email).await?
        && existing.phone_number.is_none()
    {
        state.store.set_customer_phone(&existing.id, phone).await?;
        info!(customer_id = existing.id, "linked phone to existing email customer");
        return Ok(Customer {
            phone_number: Some(phone.to_string()),
            ..existing
        });
    }

    let customer = new_customer(Some(phone.to_string()), None);
    state.store.create_customer(&customer).await?;
    info!(customer_id = customer.id, "created customer from SMS webhook");
    Ok(customer)
}

/// Resolves an email sender to a customer (mirror of
/// [`resolve_sms_customer`]).
pub async fn resolve_email_customer(
    state: &AppState,
    email: &str,
) -> Result<Customer, MacrodeskError> {
    if let Some(customer) = state.store.find_customer_by_email(email).await? {
        return Ok(customer);
    }

    if let Some(ref link_phone) = state.config.gateway.demo_link_phone
        && let Some(existing) = state.store.find_customer_by_phone(link_phone).await?
        && existing.email.is_none()
    {
        state.store.set_customer_email(&existing.id, email).await?;
        info!(customer_id = existing.id, "linked email to existing phone customer");
        return Ok(Customer {
            email: Some(email.to_string()),
            ..existing
        });
    }

    let customer = new_customer(None, Some(email.to_string()));
    state.store.create_customer(&customer).await?;
    info!(customer_id = customer.id, "created customer from email webhook");
    Ok(customer)
}

fn new_customer(phone_number: Option<String>, email: Option<String>) -> Customer {
    Customer {
        id: uuid::Uuid::new_v4().to_string(),
        phone_number,
        email,
        first_name: None,
        last_name: None,
        company_name: None,
        account_tier: None,
        extracted_data: serde_json::Map::new(),
        created_at: now_iso(),
        updated_at: now_iso(),
    }
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /customers
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(state.store.list_customers(query.limit).await?))
}

/// GET /customers/{id} -- customer plus ordered cross-channel history.
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerWithMessages>, ApiError> {
    let Some(customer) = state.store.get_customer(&id).await? else {
        return Err(ApiError::NotFound("customer not found"));
    };
    let messages = state.store.messages_for_customer(&id, None).await?;
    Ok(Json(CustomerWithMessages { customer, messages }))
}

/// GET /messages/{customer_id}
pub async fn get_customer_messages(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    if state.store.get_customer(&customer_id).await?.is_none() {
        return Err(ApiError::NotFound("customer not found"));
    }
    Ok(Json(
        state.store.messages_for_customer(&customer_id, None).await?,
    ))
}

/// GET /tickets/{customer_id}
pub async fn get_customer_tickets(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    if state.store.get_customer(&customer_id).await?.is_none() {
        return Err(ApiError::NotFound("customer not found"));
    }
    Ok(Json(state.store.tickets_for_customer(&customer_id).await?))
}

/// GET /articles
pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<macrodesk_core::types::KnowledgeArticle>>, ApiError> {
    Ok(Json(state.store.published_articles().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sms_payload_accepts_both_field_spellings() {
        let wire: SmsWebhookRequest =
            serde_json::from_str(r#"{"from": "+15551234567", "body": "hi"}"#).unwrap();
        assert_eq!(wire.from_number, "+15551234567");

        let alias: SmsWebhookRequest =
            serde_json::from_str(r#"{"from_number": "+15551234567", "body": "hi"}"#).unwrap();
        assert_eq!(alias.from_number, "+15551234567");
    }

    #[test]
    fn email_payload_subject_defaults_empty() {
        let wire: EmailWebhookRequest =
            serde_json::from_str(r#"{"from_email": "kal@example.com", "body": "help"}"#).unwrap();
        assert_eq!(wire.subject, "");
    }

    #[test]
    fn webhook_response_serializes_all_ids() {
        let response = WebhookResponse {
            status: "received".into(),
            customer_id: "c1".into(),
            message_id: "m1".into(),
            batch_id: "b1".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "received");
        assert_eq!(json["batch_id"], "b1");
    }

    #[test]
    fn customer_with_messages_flattens_customer_fields() {
        let customer = new_customer(Some("+15550001111".into()), None);
        let body = CustomerWithMessages {
            customer,
            messages: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["id"].is_string());
        assert_eq!(json["phone_number"], "+15550001111");
        assert!(json["messages"].as_array().unwrap().is_empty());
    }
}
