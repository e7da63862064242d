use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_household;
use crate::db::{count_by_status, get_metadata, recent_ops, OpStatus};
use crate::error::Result;
use crate::fmt::{format_bytes, yen};

pub fn run(offline: bool) -> Result<()> {
    let (settings, household) = open_household(offline)?;
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    if let Ok(meta) = std::fs::metadata(&db_path) {
        println!("DB size:    {}", format_bytes(meta.len()));
    }
    println!(
        "Endpoint:   {}",
        settings.endpoint().unwrap_or_else(|| "(not set)".to_string())
    );
    println!("Payers:     {} / {}", settings.payers[0], settings.payers[1]);
    println!(
        "Gate:       {}",
        if settings.configured_passphrase().is_some() { "passphrase" } else { "open" }
    );

    let conn = household.conn();
    println!();
    println!("Source:        {}", household.source());
    println!("Expenses:      {}", household.expenses().len());
    let unsettled: Vec<_> = household.expenses().iter().filter(|e| !e.is_settled).collect();
    println!(
        "Unsettled:     {} ({})",
        unsettled.len(),
        yen(unsettled.iter().fold(0i64, |acc, e| acc.saturating_add(e.amount)))
    );
    println!(
        "Last fetch:    {}",
        get_metadata(conn, "last_fetch").as_deref().unwrap_or("(never)")
    );
    println!(
        "Last sync:     {}",
        get_metadata(conn, "last_sync").as_deref().unwrap_or("(never)")
    );

    let pending = count_by_status(conn, OpStatus::Pending)?;
    let failed = count_by_status(conn, OpStatus::Failed)?;
    let confirmed = count_by_status(conn, OpStatus::Confirmed)?;
    println!();
    println!("Outbox:        {confirmed} confirmed, {pending} pending, {failed} failed");

    if pending + failed > 0 {
        let mut table = Table::new();
        table.set_header(vec!["Seq", "Kind", "Expense", "Status", "Attempts", "Created"]);
        for op in recent_ops(conn, 20)?.iter().filter(|op| op.status != OpStatus::Confirmed) {
            table.add_row(vec![
                Cell::new(op.seq),
                Cell::new(op.kind.as_str()),
                Cell::new(op.expense_id.chars().take(8).collect::<String>()),
                Cell::new(op.status.as_str()),
                Cell::new(op.attempts),
                Cell::new(&op.created_at),
            ]);
        }
        println!("{table}");
    }

    let malformed = household.malformed();
    if !malformed.is_empty() {
        println!();
        println!("{}", format!("{} record(s) with unreadable dates:", malformed.len()).yellow());
        for e in malformed {
            println!("  {}  {:?}  {}", e.short_id(), e.date, e.item_name);
        }
    }

    Ok(())
}
