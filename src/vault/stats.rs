//! Read-only summary of the unlocked entry collection.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::entry::Entry;

/// Passwords shorter than this (in characters) count as weak.
pub const WEAK_PASSWORD_MIN_LEN: usize = 14;

/// Aggregate numbers over the entry collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStats {
    pub total: usize,
    /// Tag -> number of entries carrying it. Tags compare case-sensitively.
    pub tags: BTreeMap<String, usize>,
    pub weak: usize,
}

impl VaultStats {
    /// Compute stats for `entries`.
    ///
    /// An entry listing the same tag twice is counted once for that tag.
    pub fn compute(entries: &[Entry]) -> Self {
        let mut tags: BTreeMap<String, usize> = BTreeMap::new();
        for entry in entries {
            let distinct: BTreeSet<&str> = entry.tags.iter().map(String::as_str).collect();
            for tag in distinct {
                *tags.entry(tag.to_string()).or_default() += 1;
            }
        }

        Self {
            total: entries.len(),
            tags,
            weak: entries.iter().filter(|e| is_weak(&e.password)).count(),
        }
    }
}

/// A stored password is weak when it is shorter than 14 characters, has
/// no digit, or has no character outside letters and digits.
pub fn is_weak(password: &str) -> bool {
    let too_short = password.chars().count() < WEAK_PASSWORD_MIN_LEN;
    let no_digit = !password.chars().any(|c| c.is_ascii_digit());
    let no_symbol = password.chars().all(|c| c.is_ascii_alphanumeric());
    too_short || no_digit || no_symbol
}
