//! `lockbox list` — show every credential without its password.

use crate::cli::output;
use crate::cli::{unlock_engine, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, tag: Option<&str>) -> Result<()> {
    let engine = unlock_engine(cli)?;

    let mut entries = engine.entries()?;
    if let Some(tag) = tag {
        entries.retain(|e| e.has_tag(tag));
    }
    entries.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));

    output::print_entries_table(&entries);
    Ok(())
}
