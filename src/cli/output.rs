//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{Entry, VaultStats};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Length of the id prefix shown in tables.
const SHORT_ID_LEN: usize = 8;

/// Print a table of entries (Id, Title, Username, URL, Tags, Updated).
/// Passwords and notes are never printed here.
pub fn print_entries_table(entries: &[Entry]) {
    if entries.is_empty() {
        info("No entries in this vault yet.");
        tip("Run `lockbox add --title <TITLE> --username <NAME>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Title", "Username", "URL", "Tags", "Updated"]);

    for e in entries {
        table.add_row(vec![
            short_id(&e.id).to_string(),
            e.title.clone(),
            e.username.clone(),
            e.url.clone().unwrap_or_default(),
            e.tags.join(", "),
            e.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print one entry as a two-column table. The password is masked unless
/// `reveal` is set.
pub fn print_entry(entry: &Entry, reveal: bool) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let password = if reveal {
        entry.password.clone()
    } else {
        "********".to_string()
    };

    table.add_row(vec!["Id".to_string(), entry.id.clone()]);
    table.add_row(vec!["Title".to_string(), entry.title.clone()]);
    table.add_row(vec!["Username".to_string(), entry.username.clone()]);
    table.add_row(vec!["Password".to_string(), password]);
    if let Some(url) = &entry.url {
        table.add_row(vec!["URL".to_string(), url.clone()]);
    }
    if let Some(notes) = &entry.notes {
        table.add_row(vec!["Notes".to_string(), notes.clone()]);
    }
    if !entry.tags.is_empty() {
        table.add_row(vec!["Tags".to_string(), entry.tags.join(", ")]);
    }
    table.add_row(vec![
        "Created".to_string(),
        entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]);
    table.add_row(vec![
        "Updated".to_string(),
        entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]);

    println!("{table}");
}

/// Print vault totals and a tag breakdown.
pub fn print_stats(stats: &VaultStats) {
    println!("{} {}", style("Entries:").bold(), stats.total);
    let weak = if stats.weak > 0 {
        style(stats.weak.to_string()).yellow().bold()
    } else {
        style(stats.weak.to_string()).green()
    };
    println!("{} {}", style("Weak passwords:").bold(), weak);

    if stats.tags.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Tag", "Entries"]);
    for (tag, count) in &stats.tags {
        table.add_row(vec![tag.clone(), count.to_string()]);
    }
    println!("{table}");
}

/// First few characters of an id, enough to address it on the command line.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
