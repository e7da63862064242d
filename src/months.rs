use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::error::{KakeiboError, Result};
use crate::models::Expense;

pub const ALL: &str = "all";

/// `YYYY/MM` for the month containing `today`.
pub fn month_key(today: NaiveDate) -> String {
    format!("{:04}/{:02}", today.year(), today.month())
}

pub fn current_month_key() -> String {
    month_key(chrono::Local::now().date_naive())
}

/// Distinct month keys present in the data plus the current month, most
/// recent first. Dates without at least two `/` segments are skipped.
pub fn available_months(expenses: &[Expense], today: NaiveDate) -> Vec<String> {
    let mut months: BTreeSet<String> = BTreeSet::new();
    months.insert(month_key(today));
    for e in expenses {
        let mut parts = e.date.split('/');
        if let (Some(year), Some(month)) = (parts.next(), parts.next()) {
            months.insert(format!("{year}/{month}"));
        }
    }
    months.into_iter().rev().collect()
}

/// Month selection for lists and totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthFilter {
    All,
    Month(String),
}

impl MonthFilter {
    /// Parse `all`, `YYYY/MM` or `YYYY-MM`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(ALL) {
            return Ok(Self::All);
        }
        let normalized = raw.replace('-', "/");
        let parts: Vec<&str> = normalized.split('/').collect();
        if parts.len() == 2 {
            if let (Ok(y), Ok(m)) = (parts[0].parse::<i32>(), parts[1].parse::<u32>()) {
                if (1..=12).contains(&m) && parts[0].len() == 4 {
                    return Ok(Self::Month(format!("{y:04}/{m:02}")));
                }
            }
        }
        Err(KakeiboError::invalid(
            "month",
            format!("'{raw}' is not YYYY/MM or 'all'"),
        ))
    }

    /// `--month` value or the current month when absent.
    pub fn from_opt(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(m) => Self::parse(m),
            None => Ok(Self::Month(current_month_key())),
        }
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        match self {
            Self::All => true,
            Self::Month(key) => expense.date.starts_with(key.as_str()),
        }
    }

    pub fn apply(&self, expenses: &[Expense]) -> Vec<Expense> {
        expenses.iter().filter(|e| self.matches(e)).cloned().collect()
    }

    pub fn key(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Month(key) => key,
        }
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all time"),
            Self::Month(key) => write!(f, "{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(date: &str) -> Expense {
        Expense {
            id: date.to_string(),
            date: date.to_string(),
            item_name: "x".to_string(),
            category: "food".to_string(),
            amount: 1,
            payer: "A".to_string(),
            is_settled: false,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_key_zero_pads() {
        assert_eq!(month_key(day(2026, 3, 9)), "2026/03");
        assert_eq!(month_key(day(2026, 11, 30)), "2026/11");
    }

    #[test]
    fn test_available_months_includes_current_and_sorts_descending() {
        let data = vec![on("2026/01/18"), on("2025/12/01"), on("2026/01/30")];
        let months = available_months(&data, day(2026, 4, 1));
        assert_eq!(months, vec!["2026/04", "2026/01", "2025/12"]);
    }

    #[test]
    fn test_available_months_skips_undelimited_dates() {
        let data = vec![on("20260118")];
        let months = available_months(&data, day(2026, 1, 1));
        assert_eq!(months, vec!["2026/01"]);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(MonthFilter::parse("all").unwrap(), MonthFilter::All);
        assert_eq!(MonthFilter::parse("ALL").unwrap(), MonthFilter::All);
        assert_eq!(MonthFilter::parse("2026-1").unwrap(), MonthFilter::Month("2026/01".into()));
        assert_eq!(MonthFilter::parse("2026/12").unwrap(), MonthFilter::Month("2026/12".into()));
        assert!(MonthFilter::parse("2026/13").is_err());
        assert!(MonthFilter::parse("26/01").is_err());
    }

    #[test]
    fn test_filter_by_prefix() {
        let data = vec![on("2026/01/18"), on("2026/02/01"), on("2026/01/02")];
        let jan = MonthFilter::Month("2026/01".into()).apply(&data);
        assert_eq!(jan.len(), 2);
        assert_eq!(MonthFilter::All.apply(&data).len(), 3);
    }
}
