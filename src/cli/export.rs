use std::path::{Path, PathBuf};

use crate::cli::{open_household, print_source_note};
use crate::error::Result;
use crate::models::Expense;
use crate::months::{MonthFilter, ALL};

fn default_path(data_dir: &str, filter: &MonthFilter) -> PathBuf {
    let label = filter.key().replace('/', "-");
    PathBuf::from(data_dir)
        .join("exports")
        .join(format!("kakeibo-{label}.csv"))
}

/// Write expenses as CSV with the same column names the remote uses.
pub fn write_csv(path: &Path, expenses: &[Expense]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["id", "date", "itemName", "category", "amount", "payer", "isSettled"])?;
    for e in expenses {
        let amount = e.amount.to_string();
        wtr.write_record([
            e.id.as_str(),
            e.date.as_str(),
            e.item_name.as_str(),
            e.category.as_str(),
            amount.as_str(),
            e.payer.as_str(),
            if e.is_settled { "true" } else { "false" },
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run(month: Option<String>, output: Option<String>, offline: bool) -> Result<()> {
    let filter = MonthFilter::parse(month.as_deref().unwrap_or(ALL))?;
    let (settings, household) = open_household(offline)?;
    print_source_note(&household);

    let rows = filter.apply(household.expenses());
    let path = match output {
        Some(p) => PathBuf::from(p),
        None => default_path(&settings.data_dir, &filter),
    };
    write_csv(&path, &rows)?;
    println!("Wrote {} expense(s) to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("x.csv");
        let rows = vec![Expense {
            id: "abc".to_string(),
            date: "2026/01/18".to_string(),
            item_name: "Lunch, with tea".to_string(),
            category: "food".to_string(),
            amount: 1691,
            payer: "A".to_string(),
            is_settled: false,
        }];
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,date,itemName,category,amount,payer,isSettled"));
        assert_eq!(lines.next(), Some("abc,2026/01/18,\"Lunch, with tea\",food,1691,A,false"));
    }

    #[test]
    fn test_default_path_uses_month_label() {
        let path = default_path("/tmp/k", &MonthFilter::Month("2026/01".to_string()));
        assert_eq!(path, PathBuf::from("/tmp/k/exports/kakeibo-2026-01.csv"));
        let path = default_path("/tmp/k", &MonthFilter::All);
        assert_eq!(path, PathBuf::from("/tmp/k/exports/kakeibo-all.csv"));
    }
}
