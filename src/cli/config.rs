use comfy_table::{Cell, Table};

use crate::auth;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, ENDPOINT_ENV, PASSPHRASE_ENV};

pub fn run(assignments: &[String]) -> Result<()> {
    let mut settings = load_settings();

    if !assignments.is_empty() {
        // Changing the passphrase or endpoint requires the current gate.
        auth::ensure_unlocked(&settings)?;
        for assignment in assignments {
            settings.set(assignment)?;
        }
        save_settings(&settings)?;
        println!("Saved {} setting(s).", assignments.len());
    }

    let endpoint_note = if std::env::var(ENDPOINT_ENV).is_ok() {
        format!(" (from {ENDPOINT_ENV})")
    } else {
        String::new()
    };
    let passphrase = match settings.configured_passphrase() {
        Some(_) if std::env::var(PASSPHRASE_ENV).is_ok() => format!("set (from {PASSPHRASE_ENV})"),
        Some(_) => "set".to_string(),
        None => "(none, gate open)".to_string(),
    };

    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("data_dir"), Cell::new(&settings.data_dir)]);
    table.add_row(vec![
        Cell::new("endpoint_url"),
        Cell::new(format!(
            "{}{endpoint_note}",
            settings.endpoint().unwrap_or_else(|| "(not set)".to_string())
        )),
    ]);
    table.add_row(vec![Cell::new("passphrase"), Cell::new(passphrase)]);
    table.add_row(vec![
        Cell::new("payers"),
        Cell::new(format!("{}, {}", settings.payers[0], settings.payers[1])),
    ]);
    table.add_row(vec![Cell::new("categories"), Cell::new(settings.categories.join(", "))]);
    table.add_row(vec![Cell::new("timeout_secs"), Cell::new(settings.timeout_secs)]);
    println!("Settings\n{table}");
    Ok(())
}
