//! Password strength scoring and random password generation.
//!
//! Neither function touches the vault. `score` is a cheap heuristic used
//! as a policy gate before `initialize`; it is not a cryptographic measure.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::{LockboxError, Result};

/// Coarse strength bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StrengthLevel {
    VeryWeak,
    Weak,
    Fair,
    Strong,
    VeryStrong,
}

impl StrengthLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryWeak => "very weak",
            Self::Weak => "weak",
            Self::Fair => "fair",
            Self::Strong => "strong",
            Self::VeryStrong => "very strong",
        }
    }
}

/// Result of `score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrengthScore {
    pub level: StrengthLevel,
    /// 0..=100
    pub score: u8,
}

/// Minimum master password length accepted by `check_master_password`.
pub const MIN_MASTER_PASSWORD_LEN: usize = 14;

/// Minimum level accepted by `check_master_password`.
pub const MIN_MASTER_PASSWORD_LEVEL: StrengthLevel = StrengthLevel::Strong;

/// Score a password from its length and character variety.
pub fn score(password: &str) -> StrengthScore {
    let len = password.chars().count();

    let mut classes = 0u32;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        classes += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        classes += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        classes += 1;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        classes += 1;
    }

    // Up to 60 points for length (3 per character), up to 40 for variety.
    let mut points = (len.min(20) * 3) as u32 + classes * 10;

    // Long runs of one repeated character add length without entropy.
    if has_repeated_run(password, 3) {
        points = points.saturating_sub(15);
    }

    let score = points.min(100) as u8;
    let level = match score {
        0..=29 => StrengthLevel::VeryWeak,
        30..=49 => StrengthLevel::Weak,
        50..=69 => StrengthLevel::Fair,
        70..=89 => StrengthLevel::Strong,
        _ => StrengthLevel::VeryStrong,
    };

    StrengthScore { level, score }
}

/// Policy predicate for new master passwords.
pub fn check_master_password(password: &str, min_len: usize) -> Result<StrengthScore> {
    let min_len = min_len.max(1);
    if password.chars().count() < min_len {
        return Err(LockboxError::WeakPassword(format!(
            "must be at least {min_len} characters"
        )));
    }

    let result = score(password);
    if result.level < MIN_MASTER_PASSWORD_LEVEL {
        return Err(LockboxError::WeakPassword(format!(
            "strength is {} — mix upper and lower case, digits and symbols",
            result.level.label()
        )));
    }

    Ok(result)
}

fn has_repeated_run(password: &str, run: usize) -> bool {
    let chars: Vec<char> = password.chars().collect();
    chars.windows(run).any(|w| w.iter().all(|&c| c == w[0]))
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_=+?";

/// Smallest length `generate_password` accepts.
pub const MIN_GENERATED_LEN: usize = 8;

/// Generate a random password of `length` characters.
///
/// Every enabled character class appears at least once. Visually
/// ambiguous characters (`l`, `I`, `O`, `0`, `1`) are left out.
pub fn generate_password(length: usize, symbols: bool) -> Result<String> {
    if length < MIN_GENERATED_LEN {
        return Err(LockboxError::CommandFailed(format!(
            "password length must be at least {MIN_GENERATED_LEN}"
        )));
    }

    let mut classes: Vec<&[u8]> = vec![LOWER, UPPER, DIGITS];
    if symbols {
        classes.push(SYMBOLS);
    }
    let all: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();

    let mut rng = rand::rng();
    let mut out: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.random_range(0..class.len())])
        .collect();
    while out.len() < length {
        out.push(all[rng.random_range(0..all.len())]);
    }

    // Shuffle so the guaranteed characters are not always first.
    out.shuffle(&mut rng);

    Ok(out.into_iter().map(char::from).collect())
}
