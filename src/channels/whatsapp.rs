//! WhatsApp channel: Business API REST client plus webhook receiver.
//!
//! Outbound:
//! - `POST {api_base}/{phone_number_id}/messages` sends a text message.
//! - `POST {api_base}/{phone_number_id}/contacts` checks which numbers are
//!   registered on WhatsApp.
//!
//! Inbound: the API pushes notifications to a webhook. `router()` serves
//! `GET /webhook` (subscription handshake) and `POST /webhook`
//! (notifications); text messages are forwarded to the stream returned by
//! `start()`, everything else is ignored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use futures::stream;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::channels::{
    EventStream, InboundEvent, IncomingMessage, MessageReceipt, Messenger, Reachability,
};
use crate::config::WhatsAppConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "whatsapp";

// ── Webhook payload ─────────────────────────────────────────────────────

/// Notification body posted to the webhook.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: WebhookValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookContact {
    pub wa_id: String,
    pub profile: Option<WebhookProfile>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookProfile {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    pub id: String,
    /// Unix seconds, sent as a string.
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<WebhookText>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookText {
    pub body: String,
}

impl WebhookPayload {
    /// Text messages contained in the payload, oldest entry first.
    pub fn into_messages(self) -> Vec<IncomingMessage> {
        let mut out = Vec::new();

        for change in self.entry.into_iter().flat_map(|e| e.changes) {
            if change.field != "messages" {
                continue;
            }

            let names: HashMap<String, String> = change
                .value
                .contacts
                .into_iter()
                .filter_map(|c| Some((c.wa_id, c.profile?.name?)))
                .collect();

            for message in change.value.messages {
                let Some(text) = message.text.filter(|_| message.kind == "text") else {
                    debug!(kind = %message.kind, id = %message.id, "Ignoring non-text WhatsApp message");
                    continue;
                };

                let received_at = message
                    .timestamp
                    .as_deref()
                    .and_then(|ts| ts.parse::<i64>().ok())
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                    .unwrap_or_else(Utc::now);

                let mut incoming =
                    IncomingMessage::new(message.from.as_str(), text.body).with_message_id(message.id);
                incoming.received_at = received_at;
                if let Some(name) = names.get(&message.from) {
                    incoming = incoming.with_sender_name(name);
                }
                out.push(incoming);
            }
        }

        out
    }
}

// ── REST responses ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentId>,
}

#[derive(Debug, Deserialize)]
struct SentId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContactsResponse {
    #[serde(default)]
    contacts: Vec<ContactStatus>,
}

#[derive(Debug, Deserialize)]
struct ContactStatus {
    input: String,
    status: String,
    wa_id: Option<String>,
}

// ── Shared webhook state ────────────────────────────────────────────────

struct WebhookInner {
    events_tx: mpsc::UnboundedSender<InboundEvent>,
    verify_token: SecretString,
}

#[derive(Clone)]
struct WebhookState {
    inner: Arc<WebhookInner>,
}

// ── WhatsAppChannel ─────────────────────────────────────────────────────

/// WhatsApp Business API messenger.
pub struct WhatsAppChannel {
    api_base: String,
    phone_number_id: String,
    access_token: SecretString,
    client: reqwest::Client,
    inner: Arc<WebhookInner>,
    /// Receiver side of the event channel, consumed once in `start()`.
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<InboundEvent>>>,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            api_base: config.api_base,
            phone_number_id: config.phone_number_id,
            access_token: config.access_token,
            client: reqwest::Client::new(),
            inner: Arc::new(WebhookInner {
                events_tx,
                verify_token: config.verify_token,
            }),
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}/{endpoint}", self.api_base, self.phone_number_id)
    }

    /// Axum router with the `/webhook` endpoints. Merge into the server app.
    pub fn router(&self) -> Router {
        let state = WebhookState {
            inner: Arc::clone(&self.inner),
        };

        Router::new()
            .route("/webhook", get(verify_handler).post(notification_handler))
            .with_state(state)
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(self.api_url(endpoint))
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
    }
}

#[async_trait]
impl Messenger for WhatsAppChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let rx = self
            .events_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| ChannelError::StartupFailed {
                name: CHANNEL_NAME.to_string(),
                reason: "start() already called".to_string(),
            })?;

        info!("WhatsApp channel listening for webhook notifications...");
        let _ = self.inner.events_tx.send(InboundEvent::Connected);

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_text(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<MessageReceipt, ChannelError> {
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": recipient,
            "type": "text",
            "text": { "preview_url": false, "body": body },
        });

        debug!(recipient = %recipient, "Attempting to send WhatsApp message");

        let resp = self
            .post_json("messages", &payload)
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: format!("messages returned {status}: {err}"),
            });
        }

        let parsed: SendResponse = resp.json().await.map_err(|e| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: format!("unreadable response: {e}"),
        })?;

        let message_id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: "response carried no message id".into(),
            })?;

        info!(recipient = %recipient, message_id = %message_id, "WhatsApp message sent");

        Ok(MessageReceipt {
            message_id,
            sent_at: Utc::now(),
        })
    }

    async fn verify_reachable(
        &self,
        identities: &[String],
    ) -> Result<Vec<Reachability>, ChannelError> {
        let joined = identities.join(",");
        let verify_err = |reason: String| ChannelError::VerifyFailed {
            name: CHANNEL_NAME.into(),
            identity: joined.clone(),
            reason,
        };

        let contacts: Vec<String> = identities.iter().map(|id| format!("+{id}")).collect();
        let payload = serde_json::json!({
            "blocking": "wait",
            "contacts": contacts,
            "force_check": true,
        });

        let resp = self
            .post_json("contacts", &payload)
            .await
            .map_err(|e| verify_err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(verify_err(format!("contacts returned {status}: {err}")));
        }

        let parsed: ContactsResponse = resp
            .json()
            .await
            .map_err(|e| verify_err(format!("unreadable response: {e}")))?;

        let results = identities
            .iter()
            .map(|id| {
                let found = parsed
                    .contacts
                    .iter()
                    .find(|c| c.input.trim_start_matches('+') == id.as_str());
                match found {
                    Some(c) if c.status == "valid" => Reachability {
                        input: id.clone(),
                        reachable: true,
                        resolved: Some(c.wa_id.clone().unwrap_or_else(|| id.clone())),
                    },
                    _ => Reachability {
                        input: id.clone(),
                        reachable: false,
                        resolved: None,
                    },
                }
            })
            .collect();

        Ok(results)
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(format!("{}/{}", self.api_base, self.phone_number_id))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: CHANNEL_NAME.into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            warn!(status = ?resp.status(), "WhatsApp health check failed");
            Err(ChannelError::HealthCheckFailed {
                name: CHANNEL_NAME.into(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        info!("WhatsApp channel shutting down");
        let _ = self.inner.events_tx.send(InboundEvent::Disconnected {
            reason: "shutdown".into(),
        });
        Ok(())
    }
}

// ── Webhook handlers ────────────────────────────────────────────────────

async fn verify_handler(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    let expected = state.inner.verify_token.expose_secret();
    if mode == Some("subscribe") && !expected.is_empty() && token == Some(expected) {
        info!("WhatsApp webhook subscription verified");
        (StatusCode::OK, challenge)
    } else {
        warn!("WhatsApp webhook verification rejected");
        (StatusCode::FORBIDDEN, String::new())
    }
}

async fn notification_handler(
    State(state): State<WebhookState>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    for message in payload.into_messages() {
        debug!(sender = %message.sender, "WhatsApp message received");
        if state.inner.events_tx.send(InboundEvent::Message(message)).is_err() {
            warn!("WhatsApp event channel closed");
            break;
        }
    }
    // Always acknowledge so the API does not redeliver.
    StatusCode::OK
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use axum::body::Body;
    use axum::http::{HeaderMap, Request};
    use axum::routing::post;
    use futures::StreamExt;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    use super::*;

    fn config(api_base: &str) -> WhatsAppConfig {
        WhatsAppConfig {
            api_base: api_base.to_string(),
            phone_number_id: "1234".into(),
            access_token: SecretString::from("token"),
            verify_token: SecretString::from("hook-secret"),
            webhook_port: 0,
        }
    }

    fn sample_payload() -> serde_json::Value {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "WABA",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "contacts": [{ "profile": { "name": "Dana" }, "wa_id": "972501112222" }],
                        "messages": [
                            {
                                "from": "972501112222",
                                "id": "wamid.1",
                                "timestamp": "1700000000",
                                "type": "text",
                                "text": { "body": "Yes, can't wait!" }
                            },
                            {
                                "from": "972501112222",
                                "id": "wamid.2",
                                "timestamp": "1700000001",
                                "type": "image"
                            }
                        ]
                    }
                }]
            }]
        })
    }

    #[test]
    fn whatsapp_api_url() {
        let ch = WhatsAppChannel::new(config("https://graph.example.com/v21.0"));
        assert_eq!(
            ch.api_url("messages"),
            "https://graph.example.com/v21.0/1234/messages"
        );
        assert_eq!(ch.name(), "whatsapp");
    }

    #[test]
    fn payload_yields_text_messages_only() {
        let payload: WebhookPayload = serde_json::from_value(sample_payload()).unwrap();
        let messages = payload.into_messages();

        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.sender, "972501112222");
        assert_eq!(msg.content, "Yes, can't wait!");
        assert_eq!(msg.sender_name.as_deref(), Some("Dana"));
        assert_eq!(msg.message_id.as_deref(), Some("wamid.1"));
        assert_eq!(msg.received_at.timestamp(), 1_700_000_000);
        assert!(!msg.is_from_me);
    }

    #[test]
    fn status_only_payload_yields_nothing() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "entry": [{ "changes": [{ "field": "messages", "value": { "statuses": [] } }] }]
        }))
        .unwrap();
        assert!(payload.into_messages().is_empty());
    }

    #[tokio::test]
    async fn webhook_verification_echoes_challenge() {
        let ch = WhatsAppChannel::new(config("http://unused"));
        let resp = ch
            .router()
            .oneshot(
                Request::get(
                    "/webhook?hub.mode=subscribe&hub.verify_token=hook-secret&hub.challenge=42",
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"42");
    }

    #[tokio::test]
    async fn webhook_verification_rejects_wrong_token() {
        let ch = WhatsAppChannel::new(config("http://unused"));
        let resp = ch
            .router()
            .oneshot(
                Request::get("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn webhook_notification_feeds_stream() {
        let ch = WhatsAppChannel::new(config("http://unused"));
        let mut stream = ch.start().await.unwrap();
        assert!(matches!(stream.next().await, Some(InboundEvent::Connected)));

        let resp = ch
            .router()
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(sample_payload().to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        match stream.next().await {
            Some(InboundEvent::Message(msg)) => {
                assert_eq!(msg.sender, "972501112222");
                assert_eq!(msg.content, "Yes, can't wait!");
            }
            other => panic!("Expected Message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let ch = WhatsAppChannel::new(config("http://unused"));
        let _stream = ch.start().await.unwrap();
        assert!(matches!(
            ch.start().await,
            Err(ChannelError::StartupFailed { .. })
        ));
    }

    // ── REST calls against a local stand-in API ─────────────────────────

    type Captured = Arc<StdMutex<Vec<(String, Option<String>, serde_json::Value)>>>;

    /// Serve a fake API on a random port. Numbers listed in `unreachable`
    /// come back as invalid contacts.
    async fn start_fake_api(unreachable: &'static [&'static str]) -> (String, Captured) {
        let captured: Captured = Arc::new(StdMutex::new(Vec::new()));

        let on_messages = {
            let captured = Arc::clone(&captured);
            move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    captured.lock().unwrap().push(("messages".into(), auth, body));
                    Json(serde_json::json!({
                        "messaging_product": "whatsapp",
                        "messages": [{ "id": "wamid.sent" }]
                    }))
                }
            }
        };

        let on_contacts = {
            let captured = Arc::clone(&captured);
            move |Json(body): Json<serde_json::Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    let contacts: Vec<serde_json::Value> = body["contacts"]
                        .as_array()
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|input| {
                            let raw = input.as_str().unwrap_or_default().to_string();
                            let digits = raw.trim_start_matches('+').to_string();
                            if unreachable.contains(&digits.as_str()) {
                                serde_json::json!({ "input": raw, "status": "invalid" })
                            } else {
                                serde_json::json!({ "input": raw, "status": "valid", "wa_id": digits })
                            }
                        })
                        .collect();
                    captured.lock().unwrap().push(("contacts".into(), None, body));
                    Json(serde_json::json!({ "contacts": contacts }))
                }
            }
        };

        let app = Router::new()
            .route("/1234/messages", post(on_messages))
            .route("/1234/contacts", post(on_contacts));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://127.0.0.1:{port}"), captured)
    }

    #[tokio::test]
    async fn send_text_posts_text_message() {
        let (base, captured) = start_fake_api(&[]).await;
        let ch = WhatsAppChannel::new(config(&base));

        let receipt = ch.send_text("972501112222", "hello").await.unwrap();
        assert_eq!(receipt.message_id, "wamid.sent");

        let captured = captured.lock().unwrap();
        let (endpoint, auth, body) = &captured[0];
        assert_eq!(endpoint, "messages");
        assert_eq!(auth.as_deref(), Some("Bearer token"));
        assert_eq!(body["to"], "972501112222");
        assert_eq!(body["type"], "text");
        assert_eq!(body["text"]["body"], "hello");
    }

    #[tokio::test]
    async fn verify_reachable_maps_contact_statuses() {
        let (base, _captured) = start_fake_api(&["972509999999"]).await;
        let ch = WhatsAppChannel::new(config(&base));

        let result = ch
            .verify_reachable(&["972501112222".to_string(), "972509999999".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result[0].reachable);
        assert_eq!(result[0].resolved.as_deref(), Some("972501112222"));
        assert!(!result[1].reachable);
        assert!(result[1].resolved.is_none());
    }

    #[tokio::test]
    async fn send_text_without_server_fails() {
        let ch = WhatsAppChannel::new(config("http://127.0.0.1:1"));
        let result = ch.send_text("972501112222", "hello").await;
        assert!(matches!(result, Err(ChannelError::SendFailed { .. })));
    }
}
