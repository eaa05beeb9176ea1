//! Credential entries held inside the encrypted payload.
//!
//! `Entry` is the stored form. `NewEntry`, `EntryPatch` and `ImportedEntry`
//! are the inputs accepted by the engine; all of them are normalized
//! (trimmed, empty optionals dropped) before they touch the collection.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{LockboxError, Result};

/// A single credential stored in the vault.
///
/// Every copy wipes its text fields when dropped, including the copies
/// handed out by `VaultEngine::entries` and `VaultEngine::get_entry`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Opaque unique identifier, fixed at creation.
    pub id: String,
    pub title: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,
    #[zeroize(skip)]
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("url", &self.url)
            .field("notes", &self.notes.as_ref().map(|_| "[REDACTED]"))
            .field("tags", &self.tags)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields supplied when adding an entry.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

/// A partial update. `None` leaves a field untouched.
///
/// For `url` and `notes`, `Some("")` (or whitespace) clears the field.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// An entry as read from an import file. Everything the vault can
/// regenerate is optional.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Entry> for ImportedEntry {
    fn from(mut entry: Entry) -> Self {
        // `Entry` zeroizes on drop, so fields are taken rather than moved.
        Self {
            id: Some(std::mem::take(&mut entry.id)),
            title: std::mem::take(&mut entry.title),
            username: std::mem::take(&mut entry.username),
            password: std::mem::take(&mut entry.password),
            url: entry.url.take(),
            notes: entry.notes.take(),
            tags: std::mem::take(&mut entry.tags),
            created_at: Some(entry.created_at),
        }
    }
}

impl Entry {
    /// Build a fresh entry with a new id and `created_at == updated_at == now`.
    pub fn create(fields: NewEntry, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            id: new_id(),
            title: required("title", &fields.title)?,
            username: required("username", &fields.username)?,
            password: fields.password,
            url: optional(fields.url.as_deref()),
            notes: optional(fields.notes.as_deref()),
            tags: normalize_tags(&fields.tags),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge `patch` over this entry and stamp `updated_at`.
    ///
    /// Validation happens before any field is written, so a rejected patch
    /// leaves the entry unchanged.
    pub fn apply(&mut self, patch: &EntryPatch, now: DateTime<Utc>) -> Result<()> {
        let title = patch.title.as_deref().map(|t| required("title", t)).transpose()?;
        let username = patch
            .username
            .as_deref()
            .map(|u| required("username", u))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(username) = username {
            self.username = username;
        }
        if let Some(password) = &patch.password {
            self.password = password.clone();
        }
        if let Some(url) = &patch.url {
            self.url = optional(Some(url));
        }
        if let Some(notes) = &patch.notes {
            self.notes = optional(Some(notes));
        }
        if let Some(tags) = &patch.tags {
            self.tags = normalize_tags(tags);
        }

        // Clock skew must never break `updated_at >= created_at`.
        self.updated_at = now.max(self.created_at);
        Ok(())
    }

    /// Normalize an imported entry. `created_at` survives when present,
    /// `updated_at` is always `now`.
    pub fn from_import(imported: &ImportedEntry, now: DateTime<Utc>) -> Result<Self> {
        let id = imported
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(new_id, str::to_string);
        let created_at = imported.created_at.map_or(now, |c| c.min(now));

        Ok(Self {
            id,
            title: required("title", &imported.title)?,
            username: required("username", &imported.username)?,
            password: imported.password.clone(),
            url: optional(imported.url.as_deref()),
            notes: optional(imported.notes.as_deref()),
            tags: normalize_tags(&imported.tags),
            created_at,
            updated_at: now,
        })
    }

    /// Returns `true` if the entry carries `tag` (exact, case-sensitive match).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Generate a fresh opaque entry id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LockboxError::InvalidEntry(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
