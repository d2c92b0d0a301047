// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice WebSocket bridge.
//!
//! The browser connects to `/ws/voice`; the bridge opens a second socket to
//! the speech-agent provider (STT -> LLM -> TTS in one connection), sends a
//! Settings frame carrying the system preamble (a read-only snapshot of the
//! cross-channel context taken at session start), the tool definitions, and
//! a greeting, then relays frames both ways:
//!
//! - browser binary audio -> provider
//! - provider binary audio (TTS) -> browser
//! - provider JSON control events -> browser protocol
//!   `{type: ready|transcript|thinking|tool_call|response|audio_done|error}`
//! - provider `FunctionCallRequest` -> tool executor -> `FunctionCallResponse`
//!
//! Closing the browser socket ends the session; the provider socket is
//! dropped with it, which discards any buffered audio state.

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as TgMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use macrodesk_agent::context;
use macrodesk_core::MacrodeskError;
use macrodesk_core::types::{Customer, ToolSchema, now_iso};
use macrodesk_tools::ToolExecutor;

use crate::AppState;

type BrowserSink = SplitSink<WebSocket, WsMessage>;
type BrowserStream = SplitStream<WebSocket>;
type Upstream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type UpstreamSink = SplitSink<Upstream, TgMessage>;

/// Fallback demo identifiers when none are configured: the voice demo has
/// no caller metadata, so one well-known customer carries the session.
const DEMO_PHONE: &str = "+15551234567";
const DEMO_EMAIL: &str = "kal@example.com";

/// GET /ws/voice
pub async fn voice_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_voice_session(socket, state).await {
            warn!(error = %e, "voice session ended with error");
        }
    })
}

async fn run_voice_session(mut browser: WebSocket, state: AppState) -> Result<(), MacrodeskError> {
    info!("voice websocket connected");

    let Some(api_key) = resolve_voice_api_key(&state) else {
        let _ = browser
            .send(WsMessage::Text(
                json!({
                    "type": "error",
                    "message": "Voice not configured. Missing speech provider API key."
                })
                .to_string()
                .into(),
            ))
            .await;
        return Ok(());
    };

    // Resolve the demo customer, backfilling both identifiers so the
    // session is recognized from every channel afterwards.
    let customer = resolve_voice_customer(&state).await?;

    // Read-only context snapshot at connection time; not live-updated
    // during the call.
    let history = state.store.messages_for_customer(&customer.id, None).await?;
    let snapshot = context::voice_context_snapshot(&history);
    if !snapshot.is_empty() {
        info!(
            messages = history.len(),
            "loaded cross-channel context for voice session"
        );
    }

    let executor = ToolExecutor::for_voice(
        state.store.clone(),
        state.policy.clone(),
        Some(customer.id.clone()),
    );

    // Connect upstream to the speech-agent provider.
    let mut request = state
        .config
        .voice
        .endpoint
        .as_str()
        .into_client_request()
        .map_err(|e| MacrodeskError::Channel {
            message: format!("invalid voice endpoint: {e}"),
            source: Some(Box::new(e)),
        })?;
    let token = format!("Token {api_key}");
    request.headers_mut().insert(
        "authorization",
        token.parse().map_err(|_| MacrodeskError::Channel {
            message: "voice API key contains invalid header characters".to_string(),
            source: None,
        })?,
    );

    let (upstream, _) =
        tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| MacrodeskError::Channel {
                message: format!("failed to connect to speech provider: {e}"),
                source: Some(Box::new(e)),
            })?;
    let (mut upstream_tx, upstream_rx) = upstream.split();

    // Configure the agent before any audio flows.
    let settings = build_settings(&state, &snapshot, executor.definitions());
    upstream_tx
        .send(TgMessage::Text(settings.to_string().into()))
        .await
        .map_err(|e| MacrodeskError::Channel {
            message: format!("failed to send voice settings: {e}"),
            source: Some(Box::new(e)),
        })?;

    let (mut browser_tx, browser_rx) = browser.split();
    send_browser_json(
        &mut browser_tx,
        json!({"type": "ready", "message": "Voice agent connected"}),
    )
    .await;

    relay(browser_tx, browser_rx, upstream_tx, upstream_rx, &executor).await;

    info!(customer_id = customer.id, "voice session ended");
    Ok(())
}

/// The bidirectional relay loop. Returns when either side closes or errors.
async fn relay(
    mut browser_tx: BrowserSink,
    mut browser_rx: BrowserStream,
    mut upstream_tx: UpstreamSink,
    mut upstream_rx: SplitStream<Upstream>,
    executor: &ToolExecutor,
) {
    loop {
        tokio::select! {
            frame = browser_rx.next() => {
                match frame {
                    Some(Ok(WsMessage::Binary(audio))) => {
                        if upstream_tx.send(TgMessage::Binary(audio)).await.is_err() {
                            warn!("speech provider connection dropped");
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        let control: Value =
                            serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
                        if control["type"] == "stop" {
                            info!("voice session stopped by client");
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("voice websocket disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "voice websocket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            frame = upstream_rx.next() => {
                match frame {
                    Some(Ok(TgMessage::Binary(audio))) => {
                        // TTS audio straight through.
                        if browser_tx.send(WsMessage::Binary(audio)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(TgMessage::Text(text))) => {
                        handle_provider_event(
                            text.as_str(),
                            &mut browser_tx,
                            &mut upstream_tx,
                            executor,
                        )
                        .await;
                    }
                    Some(Ok(TgMessage::Close(_))) | None => {
                        info!("speech provider closed the session");
                        send_browser_json(
                            &mut browser_tx,
                            json!({"type": "error", "message": "voice session ended"}),
                        )
                        .await;
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "speech provider stream error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// Maps one provider control event onto the browser protocol, executing
/// function calls as they arrive.
async fn handle_provider_event(
    raw: &str,
    browser_tx: &mut BrowserSink,
    upstream_tx: &mut UpstreamSink,
    executor: &ToolExecutor,
) {
    let Ok(event) = serde_json::from_str::<Value>(raw) else {
        debug!("unparseable provider event");
        return;
    };
    let event_type = event["type"].as_str().unwrap_or_default();

    match event_type {
        "Welcome" => {
            debug!(request_id = ?event.get("request_id"), "provider welcome");
        }
        "SettingsApplied" => {
            debug!("provider settings applied");
        }
        "ConversationText" => {
            let content = event["content"].as_str().unwrap_or_default();
            match event["role"].as_str() {
                Some("user") => {
                    send_browser_json(
                        browser_tx,
                        json!({"type": "transcript", "text": content, "is_final": true}),
                    )
                    .await;
                }
                Some("assistant") => {
                    send_browser_json(browser_tx, json!({"type": "response", "text": content}))
                        .await;
                }
                _ => {}
            }
        }
        "AgentThinking" => {
            send_browser_json(browser_tx, json!({"type": "thinking"})).await;
        }
        "AgentAudioDone" => {
            send_browser_json(browser_tx, json!({"type": "audio_done"})).await;
        }
        "FunctionCallRequest" => {
            let functions = event["functions"].as_array().cloned().unwrap_or_default();
            for function in functions {
                let name = function["name"].as_str().unwrap_or_default().to_string();
                let call_id = function["id"].as_str().unwrap_or_default().to_string();
                let args = parse_function_arguments(&function["arguments"]);

                info!(tool = name, call_id, "voice function call");
                send_browser_json(
                    browser_tx,
                    json!({"type": "tool_call", "name": name, "args": args}),
                )
                .await;

                let result = executor.execute(&name, &args).await;
                let response = json!({
                    "type": "FunctionCallResponse",
                    "function_call_id": call_id,
                    "output": result.to_string(),
                });
                if upstream_tx
                    .send(TgMessage::Text(response.to_string().into()))
                    .await
                    .is_err()
                {
                    warn!("failed to send function response to speech provider");
                }
            }
        }
        "Error" => {
            let description = event["description"].as_str().unwrap_or("provider error");
            warn!(description, "speech provider error");
            send_browser_json(browser_tx, json!({"type": "error", "message": description})).await;
        }
        // History frames duplicate ConversationText.
        "History" | "UserStartedSpeaking" | "AgentStartedSpeaking" => {}
        other => {
            debug!(event_type = other, "unhandled provider event");
        }
    }
}

/// Provider function-call arguments arrive either as an object or as a
/// JSON-encoded string; normalize to an object.
fn parse_function_arguments(raw: &Value) -> Value {
    match raw {
        Value::Object(_) => raw.clone(),
        Value::String(s) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
        }
        _ => Value::Object(serde_json::Map::new()),
    }
}

/// Builds the Settings frame: audio parameters, the prompt with the context
/// preamble, the tool definitions, and a greeting that acknowledges prior
/// history when it exists.
fn build_settings(state: &AppState, snapshot: &str, tools: &[ToolSchema]) -> Value {
    let functions: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            })
        })
        .collect();

    json!({
        "type": "Settings",
        "audio": {
            "input": {
                "encoding": "linear16",
                "sample_rate": state.config.voice.input_sample_rate,
            },
            "output": {
                "encoding": "linear16",
                "sample_rate": state.config.voice.output_sample_rate,
                "container": "none",
            }
        },
        "agent": {
            "listen": {
                "provider": {"type": "deepgram", "version": "v2", "model": "flux-general-en"}
            },
            "think": {
                "provider": {"type": "google", "model": "gemini-2.5-flash"},
                "prompt": macrodesk_agent::prompts::voice_system_prompt(snapshot),
                "functions": functions,
            },
            "speak": {
                "provider": {"type": "deepgram", "model": "aura-2-theia-en"}
            },
            "greeting": macrodesk_agent::prompts::voice_greeting(!snapshot.is_empty()),
        }
    })
}

fn resolve_voice_api_key(state: &AppState) -> Option<String> {
    state
        .config
        .voice
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| std::env::var("DEEPGRAM_API_KEY").ok().filter(|k| !k.is_empty()))
}

/// Resolves the demo voice customer, backfilling whichever identifier is
/// missing so the same person is recognized across channels.
pub(crate) async fn resolve_voice_customer(state: &AppState) -> Result<Customer, MacrodeskError> {
    let phone = state
        .config
        .gateway
        .demo_link_phone
        .clone()
        .unwrap_or_else(|| DEMO_PHONE.to_string());
    let email = state
        .config
        .gateway
        .demo_link_email
        .clone()
        .unwrap_or_else(|| DEMO_EMAIL.to_string());

    let existing = match state.store.find_customer_by_phone(&phone).await? {
        Some(customer) => Some(customer),
        None => state.store.find_customer_by_email(&email).await?,
    };

    if let Some(mut customer) = existing {
        if customer.phone_number.is_none() {
            state.store.set_customer_phone(&customer.id, &phone).await?;
            customer.phone_number = Some(phone);
        }
        if customer.email.is_none() {
            state.store.set_customer_email(&customer.id, &email).await?;
            customer.email = Some(email);
        }
        return Ok(customer);
    }

    let customer = Customer {
        id: uuid::Uuid::new_v4().to_string(),
        phone_number: Some(phone),
        email: Some(email),
        first_name: None,
        last_name: None,
        company_name: None,
        account_tier: None,
        extracted_data: serde_json::Map::new(),
        created_at: now_iso(),
        updated_at: now_iso(),
    };
    state.store.create_customer(&customer).await?;
    info!(customer_id = customer.id, "created demo voice customer");
    Ok(customer)
}

async fn send_browser_json(browser_tx: &mut BrowserSink, value: Value) {
    if let Err(e) = browser_tx
        .send(WsMessage::Text(value.to_string().into()))
        .await
    {
        debug!(error = %e, "failed to send message to browser");
    }
}
