//! Dry-run messenger: Logs outbound messages instead of delivering them.
//!
//! Used when no WhatsApp credentials are configured, and as an in-process
//! messenger in tests: every send is recorded, numbers can be marked
//! unreachable, sends can be made to fail, and inbound events can be
//! injected into the stream returned by `start()`.

use std::collections::HashSet;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream;
use tokio::sync::{Mutex, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::channels::{EventStream, InboundEvent, MessageReceipt, Messenger, Reachability};
use crate::error::ChannelError;

/// An outbound message captured by the dry-run messenger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub body: String,
    pub message_id: String,
}

#[derive(Default)]
struct DryRunState {
    sent: Vec<SentMessage>,
    unreachable: HashSet<String>,
    fail_sends: bool,
}

/// Messenger that records instead of delivering.
pub struct DryRunMessenger {
    state: StdMutex<DryRunState>,
    events_tx: mpsc::UnboundedSender<InboundEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<InboundEvent>>>,
}

impl Default for DryRunMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunMessenger {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: StdMutex::new(DryRunState::default()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Report `identity` as not registered on the network.
    pub fn mark_unreachable(&self, identity: impl Into<String>) {
        self.lock_state().unreachable.insert(identity.into());
    }

    /// Make every subsequent `send_text` fail.
    pub fn fail_sends(&self, fail: bool) {
        self.lock_state().fail_sends = fail;
    }

    /// Push an event into the stream returned by `start()`.
    pub fn inject(&self, event: InboundEvent) {
        // Receiver dropped means nobody is listening any more.
        let _ = self.events_tx.send(event);
    }

    /// All messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock_state().sent.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DryRunState> {
        // State stays consistent even if a holder panicked mid-push.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Messenger for DryRunMessenger {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let rx = self
            .events_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| ChannelError::StartupFailed {
                name: "dry-run".to_string(),
                reason: "start() already called".to_string(),
            })?;

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
        let mut state = self.lock_state();
        if state.fail_sends {
            return Err(ChannelError::SendFailed {
                name: "dry-run".into(),
                reason: "sending disabled".into(),
            });
        }

        let message_id = Uuid::new_v4().to_string();
        info!(
            recipient = %recipient,
            message_id = %message_id,
            chars = body.chars().count(),
            "Dry run: message not delivered"
        );
        state.sent.push(SentMessage {
            recipient: recipient.to_string(),
            body: body.to_string(),
            message_id: message_id.clone(),
        });

        Ok(MessageReceipt {
            message_id,
            sent_at: Utc::now(),
        })
    }

    async fn verify_reachable(
        &self,
        identities: &[String],
    ) -> Result<Vec<Reachability>, ChannelError> {
        let state = self.lock_state();
        Ok(identities
            .iter()
            .map(|id| {
                let reachable = !state.unreachable.contains(id);
                Reachability {
                    input: id.clone(),
                    reachable,
                    resolved: reachable.then(|| id.clone()),
                }
            })
            .collect())
    }
}
