//! Guest data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attendance confirmation status.
///
/// `NotInvited` doubles as the blank status: an upsert carrying it never
/// overwrites the status of an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    NotInvited,
    Pending,
    Accepted,
    Declined,
}

impl RsvpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInvited => "not_invited",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// Whether the guest has answered the invitation.
    pub fn is_responded(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined)
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "not_invited" => Ok(Self::NotInvited),
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(format!("unknown RSVP status: {other}")),
        }
    }
}

/// A wedding guest, keyed by canonical phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    /// Canonical digit string (country code + subscriber number).
    pub phone_number: String,
    pub name: String,
    pub rsvp_status: RsvpStatus,
    /// When the guest answered. Unset while pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_date: Option<DateTime<Utc>>,
    /// Set on first insert, never changed afterwards.
    pub invited_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Guest {
    /// A blank-status record for `upsert`: new guests become pending,
    /// existing guests keep their status (a stored `NotInvited` becomes
    /// pending). The name is refreshed; existing notes are kept since this
    /// record carries none.
    pub fn new(phone_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            name: name.into(),
            rsvp_status: RsvpStatus::NotInvited,
            rsvp_date: None,
            invited_date: Utc::now(),
            notes: None,
        }
    }

    /// Builder: set an explicit status.
    pub fn with_status(mut self, status: RsvpStatus) -> Self {
        self.rsvp_status = status;
        self
    }

    /// Builder: set notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builder: set the invitation timestamp.
    pub fn with_invited_date(mut self, invited_date: DateTime<Utc>) -> Self {
        self.invited_date = invited_date;
        self
    }
}
