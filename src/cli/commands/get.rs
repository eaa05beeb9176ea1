//! `lockbox get` — show a single credential.

use crate::cli::output;
use crate::cli::{resolve_id, unlock_engine, Cli};
use crate::errors::{LockboxError, Result};

/// Execute the `get` command.
pub fn execute(cli: &Cli, id: &str, show: bool, copy: bool) -> Result<()> {
    let engine = unlock_engine(cli)?;
    let id = resolve_id(&engine, id)?;
    let entry = engine.get_entry(&id)?;

    output::print_entry(&entry, show);

    if copy {
        copy_to_clipboard(&entry.password)?;
        output::success("Password copied to clipboard.");
    }

    Ok(())
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| LockboxError::CommandFailed(format!("clipboard unavailable: {e}")))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| LockboxError::CommandFailed(format!("clipboard write failed: {e}")))
}
