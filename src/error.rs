//! Error types for the RSVP bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Guest store errors.
///
/// A `Persistence` error means the durable write failed; the in-memory
/// mutation that preceded it is still applied.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Guest not found: {phone}")]
    NotFound { phone: String },

    #[error("Failed to persist guest store: {0}")]
    Persistence(String),

    #[error("Failed to load guest store: {0}")]
    Load(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Messaging channel errors (delivery, verification, lifecycle).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to verify {identity} on channel {name}: {reason}")]
    VerifyFailed {
        name: String,
        identity: String,
        reason: String,
    },

    #[error(
        "Number {identity} is not registered on WhatsApp or not in contacts. \
         Make sure the number has WhatsApp and is saved in your contacts with its country code"
    )]
    NotReachable { identity: String },

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
