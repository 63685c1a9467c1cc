//! Guest records: data model, phone canonicalization, and the file-backed store.

pub mod model;
pub mod phone;
pub mod store;

pub use model::{Guest, RsvpStatus};
pub use phone::PhoneNormalizer;
pub use store::GuestStore;
