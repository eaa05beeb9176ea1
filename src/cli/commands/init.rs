//! `lockbox init` — create a new vault protected by a master password.

use crate::cli::output;
use crate::cli::{build_engine, confirm, prompt_new_password, vault_file, Cli};
use crate::errors::{LockboxError, Result};
use crate::vault::VaultStatus;

/// Execute the `init` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let (settings, engine) = build_engine(cli)?;

    // 1. Find out whether a vault already exists.
    match engine.bootstrap() {
        Ok(VaultStatus::Setup) => {}
        Ok(_) => {
            output::tip("Run `lockbox reset` first if you want to start over.");
            return Err(LockboxError::CommandFailed(format!(
                "a vault already exists at {}",
                vault_file(&engine).display()
            )));
        }
        // Unreadable record: the engine is in Setup, but the bytes are
        // only overwritten when the user says so.
        Err(LockboxError::DecodeError(reason)) => {
            output::warning(&format!("Existing vault file is unreadable: {reason}"));
            if !force && !confirm("Overwrite it with a new, empty vault?")? {
                output::info("Cancelled.");
                return Ok(());
            }
        }
        Err(e) => return Err(e),
    }

    // 2. Choose the master password.
    let password = prompt_new_password(settings.min_master_password_len)?;

    // 3. Derive the key and write the empty vault.
    engine.initialize(password.as_bytes())?;

    output::success(&format!(
        "Vault created at {}",
        vault_file(&engine).display()
    ));
    output::tip("Run `lockbox add --title <TITLE> --username <NAME>` to add a credential.");
    output::tip("Run `lockbox list` to see all credentials.");

    Ok(())
}
