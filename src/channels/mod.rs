//! Messaging channels: the collaborator trait and its implementations.

pub mod channel;
pub mod dry_run;
pub mod whatsapp;

pub use channel::*;
pub use dry_run::DryRunMessenger;
pub use whatsapp::WhatsAppChannel;
