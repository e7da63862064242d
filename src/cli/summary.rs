use colored::Colorize;

use crate::calc::{settlement, total_amount};
use crate::cli::expenses::expense_table;
use crate::cli::{open_household, print_source_note};
use crate::error::Result;
use crate::fmt::yen;
use crate::models::Expense;
use crate::months::MonthFilter;

pub fn run(month: Option<String>, offline: bool) -> Result<()> {
    let filter = MonthFilter::from_opt(month.as_deref())?;
    let (_, household) = open_household(offline)?;
    print_source_note(&household);

    let in_month = filter.apply(household.expenses());
    println!(
        "{} {}  ({} expenses)",
        format!("Total for {filter}:").bold(),
        yen(total_amount(&in_month)),
        in_month.len()
    );
    println!();

    // Settlement always covers every unsettled record, whatever the month.
    let s = settlement(household.expenses(), household.payers());
    println!("{}", "Settlement".bold());
    println!("  {:<12} paid {}", s.payer_a, yen(s.total_a));
    println!("  {:<12} paid {}", s.payer_b, yen(s.total_b));
    match s.parties() {
        Some((debtor, creditor)) => println!(
            "  {} {}",
            "→".cyan(),
            format!("{debtor} pays {creditor} {}", yen(s.transfer_amount)).cyan().bold()
        ),
        None => println!("  {}", s.description().green()),
    }
    println!();

    let unsettled: Vec<Expense> = household
        .expenses()
        .iter()
        .filter(|e| !e.is_settled)
        .cloned()
        .collect();
    if unsettled.is_empty() {
        println!("Everything is settled.");
    } else {
        println!("{} ({})", "Unsettled".bold(), unsettled.len());
        println!("{}", expense_table(&unsettled));
    }
    Ok(())
}
