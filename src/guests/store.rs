//! Guest store: in-memory guest list with whole-snapshot JSON persistence.
//!
//! Every mutation rewrites the full file while the write lock is held, so
//! readers only ever observe complete snapshots. If the durable write
//! fails the mutation stays applied in memory and the caller gets
//! `StoreError::Persistence`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::model::{Guest, RsvpStatus};
use crate::error::StoreError;

/// File-backed guest store. All access goes through its methods; callers
/// only ever receive clones.
pub struct GuestStore {
    guests: RwLock<Vec<Guest>>,
    path: PathBuf,
}

impl GuestStore {
    /// Open the store at `path`, loading existing guests.
    ///
    /// A missing file or an empty file yields an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let guests = load(&path).await?;

        info!(path = %path.display(), guests = guests.len(), "Guest store opened");

        Ok(Self {
            guests: RwLock::new(guests),
            path,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new guest or merge into the existing record.
    ///
    /// Existing record: `invited_date` is kept; a `NotInvited` incoming status
    /// keeps the current status and `rsvp_date`, except that a stored
    /// `NotInvited` becomes `Pending`; notes are replaced only when
    /// supplied. New record: `NotInvited` becomes `Pending`.
    pub async fn upsert(&self, mut guest: Guest) -> Result<(), StoreError> {
        let mut guests = self.guests.write().await;

        if let Some(existing) = guests
            .iter_mut()
            .find(|g| g.phone_number == guest.phone_number)
        {
            guest.invited_date = existing.invited_date;
            if guest.rsvp_status == RsvpStatus::NotInvited {
                guest.rsvp_status = match existing.rsvp_status {
                    RsvpStatus::NotInvited => RsvpStatus::Pending,
                    status => status,
                };
                guest.rsvp_date = guest.rsvp_date.or(existing.rsvp_date);
            }
            if guest.notes.is_none() {
                guest.notes = existing.notes.take();
            }

            debug!(
                phone = %guest.phone_number,
                status = %guest.rsvp_status,
                "Updating existing guest"
            );
            *existing = guest;
        } else {
            if guest.rsvp_status == RsvpStatus::NotInvited {
                guest.rsvp_status = RsvpStatus::Pending;
            }

            debug!(phone = %guest.phone_number, "Adding new guest");
            guests.push(guest);
        }

        self.persist(&guests).await
    }

    /// Look up a guest by canonical phone number.
    pub async fn get(&self, phone_number: &str) -> Result<Guest, StoreError> {
        self.guests
            .read()
            .await
            .iter()
            .find(|g| g.phone_number == phone_number)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                phone: phone_number.to_string(),
            })
    }

    /// Record an RSVP answer. Returns the updated guest.
    ///
    /// Empty `notes` leave the existing notes untouched.
    pub async fn update_status(
        &self,
        phone_number: &str,
        status: RsvpStatus,
        notes: &str,
    ) -> Result<Guest, StoreError> {
        let mut guests = self.guests.write().await;

        let guest = guests
            .iter_mut()
            .find(|g| g.phone_number == phone_number)
            .ok_or_else(|| StoreError::NotFound {
                phone: phone_number.to_string(),
            })?;

        guest.rsvp_status = status;
        guest.rsvp_date = Some(Utc::now());
        if !notes.trim().is_empty() {
            guest.notes = Some(notes.to_string());
        }
        let updated = guest.clone();

        info!(phone = %phone_number, status = %status, "RSVP status updated");

        self.persist(&guests).await?;
        Ok(updated)
    }

    /// All guests in insertion order.
    pub async fn list_all(&self) -> Vec<Guest> {
        self.guests.read().await.clone()
    }

    /// Guests with the given status, in insertion order.
    pub async fn list_by_status(&self, status: RsvpStatus) -> Vec<Guest> {
        self.guests
            .read()
            .await
            .iter()
            .filter(|g| g.rsvp_status == status)
            .cloned()
            .collect()
    }

    /// Number of guests on record.
    pub async fn len(&self) -> usize {
        self.guests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.guests.read().await.is_empty()
    }

    /// Write the full snapshot. Called with the write lock held.
    async fn persist(&self, guests: &[Guest]) -> Result<(), StoreError> {
        let result = write_snapshot(&self.path, guests).await;
        if let Err(ref e) = result {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Guest store write failed; change kept in memory only"
            );
        }
        result
    }
}

async fn load(path: &Path) -> Result<Vec<Guest>, StoreError> {
    let data = match fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::Load(format!("{}: {e}", path.display()))),
    };

    if data.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&data).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Serialize to a sibling temp file, then rename over the target.
async fn write_snapshot(path: &Path, guests: &[Guest]) -> Result<(), StoreError> {
    let data =
        serde_json::to_string_pretty(guests).map_err(|e| StoreError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Persistence(format!("create {}: {e}", parent.display())))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, data)
        .await
        .map_err(|e| StoreError::Persistence(format!("write {}: {e}", tmp_path.display())))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| StoreError::Persistence(format!("rename to {}: {e}", path.display())))?;

    Ok(())
}
