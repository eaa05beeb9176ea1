//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{LockboxError, Result};
use crate::strength;
use crate::vault::{FileStore, VaultEngine, VaultStatus};

/// Environment variable consulted before prompting for the master password.
pub const PASSWORD_ENV: &str = "LOCKBOX_PASSWORD";

/// Environment variable consulted before prompting for an entry password.
pub const ENTRY_PASSWORD_ENV: &str = "LOCKBOX_ENTRY_PASSWORD";

/// Lockbox CLI: local encrypted password vault.
#[derive(Parser)]
#[command(name = "lockbox", about = "Local encrypted password vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: from .lockbox.toml, else .lockbox)
    #[arg(long, global = true)]
    pub vault_dir: Option<String>,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault protected by a master password
    Init {
        /// Overwrite an unreadable vault file without asking
        #[arg(long)]
        force: bool,
    },

    /// Add a credential
    Add(EntryArgs),

    /// List credentials (passwords are never shown)
    List {
        /// Only show entries carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one credential
    Get {
        /// Entry id (a unique prefix is enough)
        id: String,
        /// Print the password
        #[arg(long)]
        show: bool,
        /// Copy the password to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Change fields of a credential
    Update {
        /// Entry id (a unique prefix is enough)
        id: String,
        #[command(flatten)]
        fields: EntryArgs,
        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
        /// Prompt for a new password
        #[arg(long, conflicts_with = "generate")]
        password: bool,
    },

    /// Delete a credential
    Delete {
        /// Entry id (a unique prefix is enough)
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Replace all credentials with the contents of an export file
    Import {
        /// Path to a JSON export file
        file: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Export all credentials as plaintext JSON
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show totals, weak passwords and tag counts
    Stats,

    /// Permanently destroy the vault
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Generate a random password
    Generate {
        /// Password length
        #[arg(short, long, default_value = "20")]
        length: usize,
        /// Only letters and digits
        #[arg(long)]
        no_symbols: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

/// Entry fields shared by `add` and `update`.
#[derive(clap::Args, Debug, Default)]
pub struct EntryArgs {
    /// Entry title
    #[arg(long)]
    pub title: Option<String>,
    /// Login name
    #[arg(short, long)]
    pub username: Option<String>,
    /// Website address (empty string clears it on update)
    #[arg(long)]
    pub url: Option<String>,
    /// Free-form notes (empty string clears them on update)
    #[arg(long)]
    pub notes: Option<String>,
    /// Tag, repeatable
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
    /// Use a generated password instead of prompting
    #[arg(short, long)]
    pub generate: bool,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Build an engine over the configured vault directory and bootstrap it.
///
/// On success the engine is either `Setup` or `Locked`. An unreadable
/// vault file is reported as an error.
pub fn open_engine(cli: &Cli) -> Result<VaultEngine<FileStore>> {
    let (_, engine) = build_engine(cli)?;
    engine.bootstrap()?;
    Ok(engine)
}

/// Load settings and build the engine without bootstrapping it.
pub fn build_engine(cli: &Cli) -> Result<(Settings, VaultEngine<FileStore>)> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let dir = match &cli.vault_dir {
        Some(dir) => cwd.join(dir),
        None => settings.vault_dir_path(&cwd),
    };
    let engine = VaultEngine::new(FileStore::new(dir), settings.engine_config());
    Ok((settings, engine))
}

/// Open the vault and unlock it with the master password.
pub fn unlock_engine(cli: &Cli) -> Result<VaultEngine<FileStore>> {
    let engine = open_engine(cli)?;
    if engine.status() == VaultStatus::Setup {
        output::tip("Run `lockbox init` to create a vault.");
        return Err(LockboxError::CommandFailed(format!(
            "no vault found in {}",
            engine.store().dir().display()
        )));
    }

    let password = prompt_password()?;
    engine.unlock(password.as_bytes())?;
    Ok(engine)
}

/// Path of the vault file an engine writes to.
pub fn vault_file(engine: &VaultEngine<FileStore>) -> PathBuf {
    engine.store().path_for(&engine.config().storage_key)
}

/// Resolve an id or unique id prefix against the unlocked entries.
pub fn resolve_id(engine: &VaultEngine<FileStore>, id_or_prefix: &str) -> Result<String> {
    let entries = engine.entries()?;
    if entries.iter().any(|e| e.id == id_or_prefix) {
        return Ok(id_or_prefix.to_string());
    }

    let mut matches = entries.iter().filter(|e| e.id.starts_with(id_or_prefix));
    match (matches.next(), matches.next()) {
        (Some(entry), None) if !id_or_prefix.is_empty() => Ok(entry.id.clone()),
        (Some(_), Some(_)) => Err(LockboxError::CommandFailed(format!(
            "id prefix '{id_or_prefix}' is ambiguous — type more characters"
        ))),
        _ => Err(LockboxError::NotFound(id_or_prefix.to_string())),
    }
}

/// Get the master password, trying in order:
/// 1. `LOCKBOX_PASSWORD` env var (scripting)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Master password")
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new master password with confirmation (used during `init`).
///
/// Also respects `LOCKBOX_PASSWORD`, which must satisfy the same policy.
pub fn prompt_new_password(min_len: usize) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            strength::check_master_password(&pw, min_len)?;
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose master password")
                .with_confirmation(
                    "Confirm master password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?,
        );

        match strength::check_master_password(&password, min_len) {
            Ok(score) => {
                output::info(&format!("Password strength: {}", score.level.label()));
                return Ok(password);
            }
            Err(e) => output::warning(&format!("{e}. Try again.")),
        }
    }
}

/// Ask a yes/no question, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("confirm prompt: {e}")))
}

/// Trimmed, non-empty values from a comma-or-repeat tag list.
pub fn split_tags(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|t| t.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
