//! RSVP processing pipeline.
//!
//! Inbound messages flow through:
//! 1. `dispatch::dispatch()`: Drops self-sent messages and lifecycle events
//! 2. `RsvpHandler::on_inbound_message()`: Sender lookup in the guest store
//! 3. `RsvpClassifier::classify()`: Keyword matching (no action if unrecognized)
//! 4. store update, then a confirmation from `templates`
//!
//! Invitations go the other way through `RsvpHandler::send_invitation()`.

pub mod classifier;
pub mod dispatch;
pub mod handler;
pub mod templates;

pub use classifier::{Precedence, RsvpClassifier, RsvpIntent};
pub use handler::{InboundOutcome, RsvpHandler};
