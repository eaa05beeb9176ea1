//! `lockbox import` — replace the vault contents with an export file.
//!
//! Accepts the document written by `lockbox export` (`{ exportedAt, entries }`)
//! or a bare JSON array of entries. Entries without an id get a new one.

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{confirm, unlock_engine, Cli};
use crate::errors::{LockboxError, Result};
use crate::vault::format;

/// Execute the `import` command.
pub fn execute(cli: &Cli, file_path: &str, force: bool) -> Result<()> {
    let source = Path::new(file_path);
    if !source.exists() {
        return Err(LockboxError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    // Parse before asking for the password so a bad file fails fast.
    let bytes = Zeroizing::new(fs::read(source)?);
    let imported = format::parse_import(&bytes)?;

    let engine = unlock_engine(cli)?;
    let existing = engine.compute_stats()?.total;

    if existing > 0
        && !force
        && !confirm(&format!(
            "Replace {existing} existing entries with {} from {}?",
            imported.len(),
            source.display()
        ))?
    {
        output::info("Cancelled.");
        return Ok(());
    }

    let count = engine.import_entries(imported)?;
    output::success(&format!(
        "Imported {count} entries from {}",
        source.display()
    ));

    Ok(())
}
