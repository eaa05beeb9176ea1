//! `lockbox stats` — totals, weak passwords and tag counts.

use crate::cli::output;
use crate::cli::{unlock_engine, Cli};
use crate::errors::Result;

/// Execute the `stats` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let engine = unlock_engine(cli)?;
    let stats = engine.compute_stats()?;

    output::print_stats(&stats);
    if stats.weak > 0 {
        output::tip("Weak: under 14 characters, no digit, or no symbol.");
    }

    Ok(())
}
