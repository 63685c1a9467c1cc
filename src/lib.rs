//! Wedding RSVP bot: WhatsApp invitations and reply classification.

pub mod channels;
pub mod config;
pub mod console;
pub mod error;
pub mod guests;
pub mod pipeline;
