use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::auth;
use crate::db;
use crate::error::{KakeiboError, Result};
use crate::household::Household;
use crate::remote;
use crate::settings::load_settings;

pub fn run(prune: bool, offline: bool) -> Result<()> {
    let settings = load_settings();
    auth::ensure_unlocked(&settings)?;
    if offline {
        return Err(KakeiboError::Other("cannot sync with --offline".to_string()));
    }

    // Skip the usual load so the flush below is the one that gets reported.
    let conn = db::get_connection(&settings.db_path())?;
    let remote = remote::connect(&settings, false);
    let household = Household::new(conn, remote, settings.payers.clone(), settings.default_category());

    let report = household.sync()?;
    if report.confirmed == 0 && report.failed == 0 && report.waiting == 0 {
        println!("Nothing to sync.");
    } else {
        println!("Confirmed: {}", report.confirmed.to_string().green());
        if report.failed > 0 {
            println!("Failed:    {}", report.failed.to_string().red());
        }
        if report.waiting > 0 {
            println!("Waiting:   {}", report.waiting.to_string().yellow());
        }
    }
    if report.unreachable {
        let reason = report.last_error.as_deref().unwrap_or("no response");
        println!("{} ({reason}); later changes were held back.", "Remote unreachable".red());
    }

    if prune {
        let removed = db::prune_confirmed(household.conn())?;
        println!("Pruned {removed} confirmed operation(s).");
    }

    let open = db::unconfirmed_ops(household.conn())?;
    if !open.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Seq", "Kind", "Expense", "Status", "Attempts", "Last error"]);
        for op in &open {
            table.add_row(vec![
                Cell::new(op.seq),
                Cell::new(op.kind.as_str()),
                Cell::new(op.expense_id.chars().take(8).collect::<String>()),
                Cell::new(op.status.as_str()),
                Cell::new(op.attempts),
                Cell::new(op.last_error.as_deref().unwrap_or("")),
            ]);
        }
        println!("{}\n{table}", "Still waiting on the remote".yellow());
    }
    Ok(())
}
