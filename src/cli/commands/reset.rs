//! `lockbox reset` — permanently destroy the vault.
//!
//! No password is needed: reset exists for the forgotten-password case.

use dialoguer::Input;

use crate::cli::output;
use crate::cli::{build_engine, vault_file, Cli};
use crate::errors::{LockboxError, Result};
use crate::vault::VaultStatus;

/// Word the user must type to confirm.
const CONFIRM_WORD: &str = "RESET";

/// Execute the `reset` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let (_, engine) = build_engine(cli)?;

    // An unreadable record can still be reset, so a decode error is fine.
    match engine.bootstrap() {
        Ok(VaultStatus::Setup) => {
            output::info("No vault to reset.");
            return Ok(());
        }
        Ok(_) | Err(LockboxError::DecodeError(_)) => {}
        Err(e) => return Err(e),
    }

    let path = vault_file(&engine);
    if !force {
        output::warning(&format!(
            "This deletes {} and every credential in it. It cannot be undone.",
            path.display()
        ));
        let typed: String = Input::new()
            .with_prompt(format!("Type {CONFIRM_WORD} to confirm"))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| LockboxError::CommandFailed(format!("confirm prompt: {e}")))?;

        if typed.trim() != CONFIRM_WORD {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    engine.reset()?;
    output::success("Vault destroyed.");
    output::tip("Run `lockbox init` to create a new one.");

    Ok(())
}
