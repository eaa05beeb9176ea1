//! `lockbox delete` — remove a credential from the vault.

use crate::cli::output;
use crate::cli::{confirm, resolve_id, unlock_engine, Cli};
use crate::errors::Result;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let engine = unlock_engine(cli)?;
    let id = resolve_id(&engine, id)?;
    let entry = engine.get_entry(&id)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force && !confirm(&format!("Delete '{}' ({})?", entry.title, entry.username))? {
        output::info("Cancelled.");
        return Ok(());
    }

    engine.delete_entry(&id)?;
    output::success(&format!("Deleted '{}'", entry.title));

    Ok(())
}
