use std::collections::{BTreeMap, HashMap};

use crate::ledger;
use crate::models::Expense;

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The second payer owes the first.
    BPaysA,
    /// The first payer owes the second.
    APaysB,
    Even,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub payer_a: String,
    pub payer_b: String,
    pub total_a: i64,
    pub total_b: i64,
    pub transfer_amount: i64,
    pub direction: Direction,
}

impl Settlement {
    /// Who pays whom, e.g. "B pays A 30".
    pub fn description(&self) -> String {
        match self.direction {
            Direction::BPaysA => format!("{} pays {} {}", self.payer_b, self.payer_a, self.transfer_amount),
            Direction::APaysB => format!("{} pays {} {}", self.payer_a, self.payer_b, self.transfer_amount),
            Direction::Even => "no transfer needed".to_string(),
        }
    }

    /// (debtor, creditor) when a transfer is due.
    pub fn parties(&self) -> Option<(&str, &str)> {
        match self.direction {
            Direction::BPaysA => Some((&self.payer_b, &self.payer_a)),
            Direction::APaysB => Some((&self.payer_a, &self.payer_b)),
            Direction::Even => None,
        }
    }
}

/// Two-party settlement over unsettled expenses. Payers other than the
/// configured pair do not count toward either side.
pub fn settlement(expenses: &[Expense], payers: &[String; 2]) -> Settlement {
    let balances = ledger::balances(expenses, payers);
    let total_a = balances[0].paid;
    let total_b = balances[1].paid;

    let direction = match total_a.cmp(&total_b) {
        std::cmp::Ordering::Greater => Direction::BPaysA,
        std::cmp::Ordering::Less => Direction::APaysB,
        std::cmp::Ordering::Equal => Direction::Even,
    };
    let transfer_amount = ledger::plan_transfers(&balances)
        .first()
        .map(|t| t.amount)
        .unwrap_or(0);

    Settlement {
        payer_a: payers[0].clone(),
        payer_b: payers[1].clone(),
        total_a,
        total_b,
        transfer_amount,
        direction,
    }
}

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: i64,
}

/// Totals per category, largest first. Ties keep first-seen order.
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for e in expenses {
        match index.get(e.category.as_str()) {
            Some(&i) => totals[i].total = totals[i].total.saturating_add(e.amount),
            None => {
                index.insert(e.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: e.category.clone(),
                    total: e.amount,
                });
            }
        }
    }
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

/// Sum of amounts, saturating at `i64::MAX`.
pub fn total_amount(expenses: &[Expense]) -> i64 {
    expenses.iter().fold(0i64, |acc, e| acc.saturating_add(e.amount))
}

// ---------------------------------------------------------------------------
// Monthly category totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRow {
    pub month: String,
    /// Sparse: only categories with spending in this month appear.
    pub totals: BTreeMap<String, i64>,
}

impl MonthRow {
    pub fn get(&self, category: &str) -> i64 {
        self.totals.get(category).copied().unwrap_or(0)
    }

    pub fn sum(&self) -> i64 {
        self.totals.values().fold(0i64, |acc, v| acc.saturating_add(*v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonthlyCategoryTotals {
    pub rows: Vec<MonthRow>,
    /// Every category seen, in first-seen order.
    pub categories: Vec<String>,
}

/// Group by the `YYYY/MM` date prefix, then by category. Rows come back in
/// ascending month order.
pub fn monthly_category_totals(expenses: &[Expense]) -> MonthlyCategoryTotals {
    let mut months: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    let mut categories: Vec<String> = Vec::new();

    for e in expenses {
        let cell = months
            .entry(e.month_prefix().to_string())
            .or_default()
            .entry(e.category.clone())
            .or_insert(0);
        *cell = cell.saturating_add(e.amount);
        if !categories.contains(&e.category) {
            categories.push(e.category.clone());
        }
    }

    MonthlyCategoryTotals {
        rows: months
            .into_iter()
            .map(|(month, totals)| MonthRow { month, totals })
            .collect(),
        categories,
    }
}
