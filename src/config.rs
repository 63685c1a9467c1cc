//! Configuration types.
//!
//! Everything is read from environment variables with plain-string
//! defaults. `from_lookup` takes the variable source as a closure so tests
//! never touch the process environment.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default calling code applied to local ten-digit numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "972";

/// Default WhatsApp Business API base URL.
pub const DEFAULT_WHATSAPP_API_BASE: &str = "https://graph.facebook.com/v21.0";

/// File name of the guest store inside the data directory.
pub const GUESTS_FILE: &str = "guests.json";

/// Wedding details rendered into invitations and confirmations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeddingDetails {
    pub date: String,
    pub location: String,
    pub bride_name: String,
    pub groom_name: String,
}

impl Default for WeddingDetails {
    fn default() -> Self {
        Self {
            date: "Saturday, January 1, 2025".to_string(),
            location: "Venue TBD".to_string(),
            bride_name: "Bride".to_string(),
            groom_name: "Groom".to_string(),
        }
    }
}

/// WhatsApp Business API settings. Present only when an access token is set.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// API base URL, e.g. `https://graph.facebook.com/v21.0`.
    pub api_base: String,
    /// Sender phone number id assigned by the API.
    pub phone_number_id: String,
    /// Bearer token for the REST API.
    pub access_token: SecretString,
    /// Token echoed back during webhook subscription verification.
    pub verify_token: SecretString,
    /// Port the webhook receiver listens on.
    pub webhook_port: u16,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Directory holding `guests.json`.
    pub data_dir: PathBuf,
    pub wedding: WeddingDetails,
    /// Calling code used by the phone canonicalizer.
    pub default_country_code: String,
    pub whatsapp: Option<WhatsAppConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            wedding: WeddingDetails::default(),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            whatsapp: None,
        }
    }
}

impl BotConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = WeddingDetails::default();

        let default_country_code =
            get("DEFAULT_COUNTRY_CODE").unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());
        let default_country_code = default_country_code.trim().trim_start_matches('+').to_string();
        if default_country_code.is_empty()
            || !default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_COUNTRY_CODE".into(),
                message: format!("expected digits, got {default_country_code:?}"),
            });
        }

        let whatsapp = match get("WHATSAPP_ACCESS_TOKEN") {
            Some(token) => {
                let phone_number_id =
                    get("WHATSAPP_PHONE_NUMBER_ID").ok_or_else(|| ConfigError::MissingRequired {
                        key: "WHATSAPP_PHONE_NUMBER_ID".into(),
                        hint: "Required when WHATSAPP_ACCESS_TOKEN is set".into(),
                    })?;

                let webhook_port = match get("WHATSAPP_WEBHOOK_PORT") {
                    Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "WHATSAPP_WEBHOOK_PORT".into(),
                        message: format!("not a port number: {raw}"),
                    })?,
                    None => 8080,
                };

                Some(WhatsAppConfig {
                    api_base: get("WHATSAPP_API_BASE")
                        .unwrap_or_else(|| DEFAULT_WHATSAPP_API_BASE.to_string())
                        .trim_end_matches('/')
                        .to_string(),
                    phone_number_id,
                    access_token: SecretString::from(token),
                    verify_token: SecretString::from(
                        get("WHATSAPP_VERIFY_TOKEN").unwrap_or_default(),
                    ),
                    webhook_port,
                })
            }
            None => None,
        };

        Ok(Self {
            data_dir: PathBuf::from(get("WHATSAPP_DATA_DIR").unwrap_or_else(|| "data".to_string())),
            wedding: WeddingDetails {
                date: get("WEDDING_DATE").unwrap_or(defaults.date),
                location: get("WEDDING_LOCATION").unwrap_or(defaults.location),
                bride_name: get("BRIDE_NAME").unwrap_or(defaults.bride_name),
                groom_name: get("GROOM_NAME").unwrap_or(defaults.groom_name),
            },
            default_country_code,
            whatsapp,
        })
    }

    /// Path of the guest store file.
    pub fn guests_path(&self) -> PathBuf {
        self.data_dir.join(GUESTS_FILE)
    }
}
