//! `lockbox update` — change fields of an existing credential.

use zeroize::Zeroizing;

use crate::cli::commands::add::{read_entry_password, GENERATED_LEN};
use crate::cli::output;
use crate::cli::{resolve_id, split_tags, unlock_engine, Cli, EntryArgs};
use crate::errors::{LockboxError, Result};
use crate::strength;
use crate::vault::EntryPatch;

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    id: &str,
    fields: &EntryArgs,
    clear_tags: bool,
    new_password: bool,
) -> Result<()> {
    let engine = unlock_engine(cli)?;
    let id = resolve_id(&engine, id)?;

    let password = if fields.generate {
        Some(Zeroizing::new(strength::generate_password(GENERATED_LEN, true)?))
    } else if new_password {
        Some(read_entry_password()?)
    } else {
        None
    };

    let tags = if clear_tags {
        Some(Vec::new())
    } else if fields.tags.is_empty() {
        None
    } else {
        Some(split_tags(&fields.tags))
    };

    let patch = EntryPatch {
        title: fields.title.clone(),
        username: fields.username.clone(),
        password: password.as_ref().map(|p| p.to_string()),
        url: fields.url.clone(),
        notes: fields.notes.clone(),
        tags,
    };

    if is_empty(&patch) {
        return Err(LockboxError::CommandFailed(
            "nothing to update — pass at least one field flag".into(),
        ));
    }

    let entry = engine.update_entry(&id, &patch)?;
    output::success(&format!(
        "Updated '{}' ({})",
        entry.title,
        output::short_id(&entry.id)
    ));

    Ok(())
}

fn is_empty(patch: &EntryPatch) -> bool {
    patch.title.is_none()
        && patch.username.is_none()
        && patch.password.is_none()
        && patch.url.is_none()
        && patch.notes.is_none()
        && patch.tags.is_none()
}
