use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{KakeiboError, Result};

/// Display and storage format for expense dates.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Largest amount a single record may carry: one trillion yen.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// A single shared expense. Field names on the wire match the spreadsheet
/// backend: `itemName`, `isSettled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub date: String,
    pub item_name: String,
    pub category: String,
    pub amount: i64,
    pub payer: String,
    pub is_settled: bool,
}

impl Expense {
    /// The `YYYY/MM` grouping key: the first seven characters of `date`.
    /// Shorter dates yield whatever is there.
    pub fn month_prefix(&self) -> &str {
        match self.date.char_indices().nth(7) {
            Some((idx, _)) => &self.date[..idx],
            None => &self.date,
        }
    }

    /// True when `date` parses as `YYYY/MM/DD`.
    pub fn has_valid_date(&self) -> bool {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).is_ok()
    }

    /// Short form of the id for tables.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// User input for a new expense before validation and id assignment.
#[derive(Debug, Clone, Default)]
pub struct ExpenseDraft {
    pub date: Option<String>,
    pub item_name: String,
    pub category: Option<String>,
    pub amount: String,
    pub payer: String,
    pub is_settled: bool,
}

/// Parse `YYYY/MM/DD` or `YYYY-MM-DD` into a date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| KakeiboError::invalid("date", format!("'{raw}' is not YYYY/MM/DD")))
}

/// Parse a yen amount. Accepts thousands separators and a leading `¥`.
pub fn parse_amount(raw: &str) -> Result<i64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('¥')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Err(KakeiboError::invalid("amount", "amount is required"));
    }
    let value: i64 = cleaned
        .parse()
        .map_err(|_| KakeiboError::invalid("amount", format!("'{raw}' is not a whole number of yen")))?;
    if value < 0 {
        return Err(KakeiboError::invalid("amount", "amount cannot be negative"));
    }
    if value > MAX_AMOUNT {
        return Err(KakeiboError::invalid(
            "amount",
            format!("amount cannot exceed {MAX_AMOUNT} yen"),
        ));
    }
    Ok(value)
}
