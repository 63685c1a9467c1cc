//! RSVP handler: Turns replies into recorded answers and sends invitations.
//!
//! Both flows mutate the store first and message the guest second. Neither
//! rolls back: an RSVP stays recorded if its confirmation cannot be sent,
//! and a guest stays on record as invited if the invitation cannot be
//! delivered.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::channels::{MessageReceipt, Messenger};
use crate::config::WeddingDetails;
use crate::error::{ChannelError, Result, StoreError};
use crate::guests::{Guest, GuestStore, PhoneNormalizer, RsvpStatus};
use crate::pipeline::classifier::RsvpClassifier;
use crate::pipeline::templates;

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Sender is not a guest. Nothing changed.
    UnknownSender { phone: String },
    /// Text was not an RSVP answer. Nothing changed.
    Unrecognized { phone: String },
    /// Answer recorded and confirmation sent.
    Recorded { phone: String, status: RsvpStatus },
}

/// Orchestrates guest store, classifier, and messenger.
pub struct RsvpHandler {
    store: Arc<GuestStore>,
    messenger: Arc<dyn Messenger>,
    wedding: WeddingDetails,
    phones: PhoneNormalizer,
    classifier: RsvpClassifier,
}

impl RsvpHandler {
    pub fn new(
        store: Arc<GuestStore>,
        messenger: Arc<dyn Messenger>,
        wedding: WeddingDetails,
        phones: PhoneNormalizer,
    ) -> Self {
        Self {
            store,
            messenger,
            wedding,
            phones,
            classifier: RsvpClassifier::default(),
        }
    }

    /// Builder: replace the classifier.
    pub fn with_classifier(mut self, classifier: RsvpClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn store(&self) -> &Arc<GuestStore> {
        &self.store
    }

    /// Handle one inbound text message.
    ///
    /// Unknown senders and unrecognized text are no-ops. A failed
    /// confirmation is returned as an error after the answer is recorded.
    pub async fn on_inbound_message(&self, sender_id: &str, text: &str) -> Result<InboundOutcome> {
        let phone = self.phones.sender_phone(sender_id);

        if let Err(e) = self.store.get(&phone).await {
            debug!(phone = %phone, error = %e, "Message from non-guest ignored");
            return Ok(InboundOutcome::UnknownSender { phone });
        }

        let Some(status) = self.classifier.classify(text).status() else {
            debug!(phone = %phone, "Message is not an RSVP answer");
            return Ok(InboundOutcome::Unrecognized { phone });
        };

        let persisted = match self.store.update_status(&phone, status, "").await {
            Ok(_) => Ok(()),
            Err(e @ StoreError::Persistence(_)) => Err(e),
            Err(e) => return Err(e.into()),
        };

        info!(phone = %phone, status = %status, "RSVP recorded");

        if let Some(body) = templates::confirmation(status, &self.wedding) {
            self.deliver(&phone, &body).await.inspect_err(|e| {
                warn!(
                    phone = %phone,
                    error = %e,
                    "Confirmation not delivered; RSVP stays recorded"
                );
            })?;
        }

        persisted?;
        Ok(InboundOutcome::Recorded { phone, status })
    }

    /// Record `name` as invited and deliver the invitation.
    ///
    /// Guests who already answered keep their answer. Delivery errors are
    /// returned as-is and do not remove the guest.
    pub async fn send_invitation(&self, phone_number: &str, name: &str) -> Result<Guest> {
        let phone = self.phones.canonicalize(phone_number);

        let persisted = match self.store.upsert(Guest::new(phone.as_str(), name)).await {
            Ok(()) => Ok(()),
            Err(e @ StoreError::Persistence(_)) => Err(e),
            Err(e) => return Err(e.into()),
        };

        let body = templates::invitation(name, &self.wedding);
        let receipt = self.deliver(&phone, &body).await.inspect_err(|e| {
            if let Err(ref store_err) = persisted {
                warn!(
                    phone = %phone,
                    error = %store_err,
                    delivery_error = %e,
                    "Invitation not delivered; guest record also not saved"
                );
            }
        })?;

        info!(
            phone = %phone,
            name = %name,
            message_id = %receipt.message_id,
            "Invitation sent"
        );

        persisted?;
        Ok(self.store.get(&phone).await?)
    }

    /// Verify the number is reachable, then send to the resolved identity.
    async fn deliver(&self, phone: &str, body: &str) -> std::result::Result<MessageReceipt, ChannelError> {
        let checks = self.messenger.verify_reachable(&[phone.to_string()]).await?;

        let resolved = checks
            .into_iter()
            .find(|r| r.input == phone && r.reachable)
            .map(|r| r.resolved.unwrap_or_else(|| phone.to_string()))
            .ok_or_else(|| ChannelError::NotReachable {
                identity: phone.to_string(),
            })?;

        debug!(phone = %phone, resolved = %resolved, "Number verified");

        self.messenger.send_text(&resolved, body).await
    }
}
