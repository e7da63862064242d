use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::calc::total_amount;
use crate::cli::{confirm, open_household, print_outcome, print_source_note};
use crate::error::Result;
use crate::fmt::yen;
use crate::models::{Expense, ExpenseDraft};
use crate::months::MonthFilter;

pub fn add(draft: ExpenseDraft, offline: bool) -> Result<()> {
    let (_, mut household) = open_household(offline)?;
    let mutation = household.add(draft)?;
    let e = &mutation.expense;
    println!(
        "Added {} {} ({}, paid by {}) on {} [{}]",
        e.item_name.bold(),
        yen(e.amount),
        e.category,
        e.payer,
        e.date,
        e.short_id()
    );
    print_outcome(&mutation);
    Ok(())
}

pub fn list(month: Option<String>, unsettled: bool, offline: bool) -> Result<()> {
    let filter = MonthFilter::from_opt(month.as_deref())?;
    let (_, household) = open_household(offline)?;
    print_source_note(&household);

    let rows: Vec<Expense> = filter
        .apply(household.expenses())
        .into_iter()
        .filter(|e| !unsettled || !e.is_settled)
        .collect();

    if rows.is_empty() {
        println!("No expenses for {filter}.");
        return Ok(());
    }

    println!("Expenses: {filter}\n{}", expense_table(&rows));
    println!("Total: {}", yen(total_amount(&rows)).bold());
    Ok(())
}

pub(crate) fn expense_table(rows: &[Expense]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Item", "Category", "Amount", "Payer", "Settled"]);
    for e in rows {
        let settled = if e.is_settled {
            "yes".green().to_string()
        } else {
            "no".yellow().to_string()
        };
        table.add_row(vec![
            Cell::new(e.short_id()),
            Cell::new(&e.date),
            Cell::new(&e.item_name),
            Cell::new(&e.category),
            Cell::new(yen(e.amount)),
            Cell::new(&e.payer),
            Cell::new(settled),
        ]);
    }
    table
}

pub fn set_settled(id: &str, is_settled: bool, offline: bool) -> Result<()> {
    let (_, mut household) = open_household(offline)?;
    let mutation = household.set_settled(id, is_settled)?;
    let state = if is_settled { "settled" } else { "unsettled" };
    println!("Marked {} ({}) as {state}.", mutation.expense.item_name, yen(mutation.expense.amount));
    print_outcome(&mutation);
    Ok(())
}

pub fn delete(id: &str, yes: bool, offline: bool) -> Result<()> {
    let (_, mut household) = open_household(offline)?;
    let target = household.find(id)?;
    let label = format!("{} {} on {}", target.item_name, yen(target.amount), target.date);
    if !yes && !confirm(&format!("Delete {label}?"))? {
        println!("Kept {label}.");
        return Ok(());
    }
    let mutation = household.delete(id)?;
    println!("Deleted {label}.");
    print_outcome(&mutation);
    Ok(())
}
