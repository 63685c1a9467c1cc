//! Event dispatch: Feeds messenger events into the RSVP handler.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::channels::{EventStream, InboundEvent};
use crate::pipeline::handler::{InboundOutcome, RsvpHandler};

/// Consume `events` until the stream ends, handling one event at a time.
pub async fn run(handler: Arc<RsvpHandler>, mut events: EventStream) {
    while let Some(event) = events.next().await {
        dispatch(&handler, event).await;
    }
    info!("Inbound event stream ended");
}

/// Handle a single event. Returns the handler outcome for text messages
/// from other accounts; errors are logged, not propagated.
pub async fn dispatch(handler: &RsvpHandler, event: InboundEvent) -> Option<InboundOutcome> {
    match event {
        InboundEvent::Message(msg) if msg.is_from_me => {
            debug!(sender = %msg.sender, "Skipping message sent by this account");
            None
        }
        InboundEvent::Message(msg) => {
            match handler.on_inbound_message(&msg.sender, &msg.content).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(sender = %msg.sender, error = %e, "Error handling message");
                    None
                }
            }
        }
        InboundEvent::Connected => {
            info!("Connected to WhatsApp");
            None
        }
        InboundEvent::Disconnected { reason } => {
            warn!(reason = %reason, "Disconnected from WhatsApp");
            None
        }
        InboundEvent::LoggedOut => {
            warn!("Logged out from WhatsApp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{DryRunMessenger, IncomingMessage};
    use crate::config::WeddingDetails;
    use crate::guests::{GuestStore, PhoneNormalizer, RsvpStatus};

    async fn setup() -> (tempfile::TempDir, Arc<DryRunMessenger>, Arc<RsvpHandler>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(GuestStore::open(dir.path().join("guests.json")).await.unwrap());
        let messenger = Arc::new(DryRunMessenger::new());
        let handler = Arc::new(RsvpHandler::new(
            store,
            messenger.clone(),
            WeddingDetails::default(),
            PhoneNormalizer::default(),
        ));
        handler.send_invitation("0501112222", "Dana").await.unwrap();
        (dir, messenger, handler)
    }

    #[tokio::test]
    async fn self_sent_messages_skipped() {
        let (_dir, messenger, handler) = setup().await;
        let msg = IncomingMessage::new("972501112222@s.whatsapp.net", "yes").from_me();

        assert!(dispatch(&handler, InboundEvent::Message(msg)).await.is_none());
        assert_eq!(
            handler.store().get("972501112222").await.unwrap().rsvp_status,
            RsvpStatus::Pending
        );
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_events_have_no_outcome() {
        let (_dir, messenger, handler) = setup().await;
        assert!(dispatch(&handler, InboundEvent::Connected).await.is_none());
        assert!(
            dispatch(
                &handler,
                InboundEvent::Disconnected {
                    reason: "network".into()
                }
            )
            .await
            .is_none()
        );
        assert!(dispatch(&handler, InboundEvent::LoggedOut).await.is_none());
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn handler_errors_are_swallowed() {
        let (_dir, messenger, handler) = setup().await;
        messenger.fail_sends(true);
        let msg = IncomingMessage::new("972501112222@s.whatsapp.net", "yes");

        assert!(dispatch(&handler, InboundEvent::Message(msg)).await.is_none());
        assert_eq!(
            handler.store().get("972501112222").await.unwrap().rsvp_status,
            RsvpStatus::Accepted
        );
    }

    #[tokio::test]
    async fn run_processes_stream_in_order() {
        let (_dir, _messenger, handler) = setup().await;
        let events: EventStream = Box::pin(futures::stream::iter(vec![
            InboundEvent::Connected,
            InboundEvent::Message(IncomingMessage::new("972501112222@s.whatsapp.net", "yes")),
            InboundEvent::Message(IncomingMessage::new(
                "972501112222@s.whatsapp.net",
                "actually no",
            )),
        ]));

        run(Arc::clone(&handler), events).await;

        assert_eq!(
            handler.store().get("972501112222").await.unwrap().rsvp_status,
            RsvpStatus::Declined
        );
    }
}
