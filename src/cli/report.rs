use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::calc::{category_totals, monthly_category_totals, total_amount};
use crate::cli::{open_household, print_source_note};
use crate::error::Result;
use crate::fmt::yen;
use crate::ledger;
use crate::months::{available_months, MonthFilter, ALL};

fn amount_cell(val: i64) -> Cell {
    Cell::new(yen(val)).set_alignment(CellAlignment::Right)
}

pub fn categories(month: Option<String>, offline: bool) -> Result<()> {
    let filter = MonthFilter::parse(month.as_deref().unwrap_or(ALL))?;
    let (_, household) = open_household(offline)?;
    print_source_note(&household);

    let rows = filter.apply(household.expenses());
    let totals = category_totals(&rows);
    if totals.is_empty() {
        println!("No expenses for {filter}.");
        return Ok(());
    }
    let grand = total_amount(&rows);

    let mut table = Table::new();
    table.set_header(vec!["Category", "Total", "%"]);
    for t in &totals {
        let pct = if grand > 0 {
            t.total as f64 * 100.0 / grand as f64
        } else {
            0.0
        };
        table.add_row(vec![
            Cell::new(&t.category),
            amount_cell(t.total),
            Cell::new(format!("{pct:.1}%")).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![Cell::new("Total".bold()), amount_cell(grand), Cell::new("")]);
    println!("Spending by category: {filter}\n{table}");
    Ok(())
}

pub fn monthly(offline: bool) -> Result<()> {
    let (_, household) = open_household(offline)?;
    print_source_note(&household);

    let report = monthly_category_totals(household.expenses());
    if report.rows.is_empty() {
        println!("No expenses yet.");
        return Ok(());
    }

    let mut header = vec!["Month".to_string()];
    header.extend(report.categories.iter().cloned());
    header.push("Total".to_string());

    let mut table = Table::new();
    table.set_header(header);
    for row in &report.rows {
        let mut cells = vec![Cell::new(&row.month)];
        for category in &report.categories {
            cells.push(match row.get(category) {
                0 => Cell::new(""),
                v => amount_cell(v),
            });
        }
        cells.push(amount_cell(row.sum()));
        table.add_row(cells);
    }
    println!("Monthly spending by category\n{table}");
    Ok(())
}

pub fn balances(offline: bool) -> Result<()> {
    let (_, household) = open_household(offline)?;
    print_source_note(&household);

    let people = ledger::participants(household.expenses(), household.payers());
    let n = people.len();
    let bal = ledger::balances(household.expenses(), &people);

    let mut table = Table::new();
    table.set_header(vec!["Participant", "Paid (unsettled)", "Net"]);
    for b in &bal {
        let net = b.net(n);
        let net_cell = if net > 0 {
            format!("+{}", yen(net)).green().to_string()
        } else if net < 0 {
            yen(net).red().to_string()
        } else {
            yen(0)
        };
        table.add_row(vec![
            Cell::new(&b.participant),
            amount_cell(b.paid),
            Cell::new(net_cell).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Balances across unsettled expenses\n{table}");

    let plan = ledger::plan_transfers(&bal);
    if plan.is_empty() {
        println!("{}", "No transfers needed.".green());
    } else {
        println!("{}", "Transfers".bold());
        for t in &plan {
            println!("  {} → {}  {}", t.from, t.to, yen(t.amount).cyan());
        }
    }
    Ok(())
}

pub fn months(offline: bool) -> Result<()> {
    let (_, household) = open_household(offline)?;
    print_source_note(&household);

    let today = chrono::Local::now().date_naive();
    for key in available_months(household.expenses(), today) {
        let filter = MonthFilter::Month(key.clone());
        let rows = filter.apply(household.expenses());
        if rows.is_empty() {
            println!("{key}");
        } else {
            println!("{key}  {:>4} expenses  {}", rows.len(), yen(total_amount(&rows)));
        }
    }
    Ok(())
}
