//! `lockbox add` — store a new credential.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{split_tags, unlock_engine, Cli, EntryArgs, ENTRY_PASSWORD_ENV};
use crate::errors::{LockboxError, Result};
use crate::strength;
use crate::vault::NewEntry;

/// Length of passwords created with `--generate`.
pub const GENERATED_LEN: usize = 20;

/// Execute the `add` command.
pub fn execute(cli: &Cli, args: &EntryArgs) -> Result<()> {
    let title = required(args.title.as_deref(), "--title")?;
    let username = required(args.username.as_deref(), "--username")?;

    let engine = unlock_engine(cli)?;

    let password = if args.generate {
        Zeroizing::new(strength::generate_password(GENERATED_LEN, true)?)
    } else {
        read_entry_password()?
    };

    let entry = engine.add_entry(NewEntry {
        title: title.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        url: args.url.clone(),
        notes: args.notes.clone(),
        tags: split_tags(&args.tags),
    })?;

    output::success(&format!(
        "Added '{}' ({})",
        entry.title,
        output::short_id(&entry.id)
    ));
    if args.generate {
        output::tip(&format!(
            "Run `lockbox get {} --copy` to copy the generated password.",
            output::short_id(&entry.id)
        ));
    }

    Ok(())
}

/// Read the password of a credential (not the master password).
///
/// `LOCKBOX_ENTRY_PASSWORD` is honored for scripting; otherwise the user
/// is prompted with confirmation.
pub fn read_entry_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(ENTRY_PASSWORD_ENV) {
        return Ok(Zeroizing::new(pw));
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Entry password")
        .with_confirmation("Confirm entry password", "Passwords do not match")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

fn required<'a>(value: Option<&'a str>, flag: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LockboxError::CommandFailed(format!("{flag} is required"))),
    }
}
