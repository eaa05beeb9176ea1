//! `lockbox export` — write every credential as plaintext JSON.
//!
//! The document is `{ "exportedAt": "<ISO-8601>", "entries": [...] }` and is
//! accepted as-is by `lockbox import`.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::cli::output;
use crate::cli::{unlock_engine, Cli};
use crate::errors::{LockboxError, Result};

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&str>) -> Result<()> {
    if let Some(dest) = output_path {
        // Refuse to clobber vault files.
        if Path::new(dest)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("vault"))
        {
            return Err(LockboxError::CommandFailed(
                "refusing to export over a .vault file".into(),
            ));
        }
    }

    let engine = unlock_engine(cli)?;
    let document = engine.export_entries()?;
    let count = engine.compute_stats()?.total;

    match output_path {
        Some(dest) => {
            write_private(Path::new(dest), &document).map_err(|e| {
                LockboxError::CommandFailed(format!("failed to write export file: {e}"))
            })?;
            output::success(&format!("Exported {count} entries to {dest}"));
            output::warning("The export file is NOT encrypted. Delete it when you are done.");
        }
        None => {
            // Raw document on stdout, no decoration.
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&document)?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}

/// Write `bytes` to `path`, owner-readable only on Unix.
///
/// A new file is created with mode 0600. An existing file is narrowed to
/// 0600 before any byte is written to it.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()
}
