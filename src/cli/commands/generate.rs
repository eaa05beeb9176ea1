//! `lockbox generate` — print a random password. Needs no vault.

use crate::cli::output;
use crate::errors::Result;
use crate::strength;

/// Execute the `generate` command.
pub fn execute(length: usize, no_symbols: bool) -> Result<()> {
    let password = strength::generate_password(length, !no_symbols)?;
    println!("{password}");

    let score = strength::score(&password);
    if score.level < strength::MIN_MASTER_PASSWORD_LEVEL {
        output::warning(&format!("Strength: {}", score.level.label()));
    }

    Ok(())
}
