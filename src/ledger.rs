//! Fair-split ledger over any number of participants.
//!
//! Each unsettled expense is owed equally by every participant. Balances are
//! kept scaled by the participant count so that the split stays in integer
//! yen until the final transfer amounts are floored. Scaled values are held
//! as `i128` so that no combination of stored amounts can overflow.

use std::collections::HashMap;

use crate::models::Expense;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub participant: String,
    /// Total paid by this participant across unsettled expenses.
    pub paid: i64,
    /// Net position multiplied by the participant count. Positive means the
    /// participant is owed money.
    scaled: i128,
}

impl Balance {
    /// Net position in yen, truncated toward zero.
    pub fn net(&self, participants: usize) -> i64 {
        if participants == 0 {
            return 0;
        }
        clamp_i64(self.scaled / participants as i128)
    }
}

fn clamp_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: i64,
}

/// The configured participants followed by any other payer that appears on
/// an unsettled record, in first-seen order.
pub fn participants(expenses: &[Expense], configured: &[String]) -> Vec<String> {
    let mut all: Vec<String> = configured.to_vec();
    for e in expenses.iter().filter(|e| !e.is_settled) {
        if !all.contains(&e.payer) {
            all.push(e.payer.clone());
        }
    }
    all
}

/// Sum of unsettled amounts per participant. Payers outside `participants`
/// are ignored. Order follows `participants`.
pub fn paid_totals(expenses: &[Expense], participants: &[String]) -> Vec<(String, i64)> {
    let mut totals: HashMap<&str, i64> = participants.iter().map(|p| (p.as_str(), 0)).collect();
    for e in expenses.iter().filter(|e| !e.is_settled) {
        if let Some(total) = totals.get_mut(e.payer.as_str()) {
            *total = total.saturating_add(e.amount);
        }
    }
    participants
        .iter()
        .map(|p| (p.clone(), totals.get(p.as_str()).copied().unwrap_or(0)))
        .collect()
}

/// Net balance of each participant, in `participants` order.
pub fn balances(expenses: &[Expense], participants: &[String]) -> Vec<Balance> {
    let paid = paid_totals(expenses, participants);
    let pool: i128 = paid.iter().map(|(_, t)| *t as i128).sum();
    let n = participants.len() as i128;
    paid.into_iter()
        .map(|(participant, paid)| Balance {
            participant,
            paid,
            scaled: paid as i128 * n - pool,
        })
        .collect()
}

/// Greedy settlement plan: repeatedly match the largest debtor with the
/// largest creditor. Produces at most `participants - 1` transfers.
pub fn plan_transfers(balances: &[Balance]) -> Vec<Transfer> {
    let n = balances.len() as i128;
    if n < 2 {
        return Vec::new();
    }

    let mut creditors: Vec<(String, i128)> = balances
        .iter()
        .filter(|b| b.scaled > 0)
        .map(|b| (b.participant.clone(), b.scaled))
        .collect();
    let mut debtors: Vec<(String, i128)> = balances
        .iter()
        .filter(|b| b.scaled < 0)
        .map(|b| (b.participant.clone(), -b.scaled))
        .collect();
    creditors.sort_by(|a, b| b.1.cmp(&a.1));
    debtors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut transfers = Vec::new();
    let (mut ci, mut di) = (0, 0);
    while ci < creditors.len() && di < debtors.len() {
        let step = creditors[ci].1.min(debtors[di].1);
        let amount = clamp_i64(step / n);
        if amount > 0 {
            transfers.push(Transfer {
                from: debtors[di].0.clone(),
                to: creditors[ci].0.clone(),
                amount,
            });
        }
        creditors[ci].1 -= step;
        debtors[di].1 -= step;
        if creditors[ci].1 == 0 {
            ci += 1;
        }
        if debtors[di].1 == 0 {
            di += 1;
        }
    }
    transfers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(payer: &str, amount: i64, settled: bool) -> Expense {
        Expense {
            id: format!("{payer}-{amount}"),
            date: "2026/01/01".to_string(),
            item_name: "x".to_string(),
            category: "food".to_string(),
            amount,
            payer: payer.to_string(),
            is_settled: settled,
        }
    }

    fn people(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_paid_totals_skip_settled_and_strangers() {
        let data = vec![exp("A", 100, false), exp("A", 50, true), exp("C", 999, false)];
        let totals = paid_totals(&data, &people(&["A", "B"]));
        assert_eq!(totals, vec![("A".to_string(), 100), ("B".to_string(), 0)]);
    }

    #[test]
    fn test_two_party_plan_floors_half_difference() {
        let data = vec![exp("A", 101, false), exp("B", 40, false)];
        let ps = people(&["A", "B"]);
        let plan = plan_transfers(&balances(&data, &ps));
        assert_eq!(
            plan,
            vec![Transfer { from: "B".into(), to: "A".into(), amount: 30 }]
        );
    }

    #[test]
    fn test_three_party_plan() {
        // Pool 300, each owes 100. A paid 300 and is owed 200.
        let data = vec![exp("A", 300, false)];
        let ps = people(&["A", "B", "C"]);
        let bal = balances(&data, &ps);
        assert_eq!(bal[0].net(3), 200);
        assert_eq!(bal[1].net(3), -100);
        let plan = plan_transfers(&bal);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|t| t.to == "A" && t.amount == 100));
    }

    #[test]
    fn test_balanced_ledger_needs_no_transfers() {
        let data = vec![exp("A", 70, false), exp("B", 70, false)];
        let plan = plan_transfers(&balances(&data, &people(&["A", "B"])));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_participants_append_unknown_payers() {
        let data = vec![exp("C", 10, false), exp("A", 5, false), exp("D", 1, true)];
        assert_eq!(participants(&data, &people(&["A", "B"])), people(&["A", "B", "C"]));
    }

    #[test]
    fn test_scaled_balances_sum_to_zero() {
        let data = vec![exp("A", 17, false), exp("B", 4, false), exp("C", 9, false)];
        let bal = balances(&data, &people(&["A", "B", "C"]));
        assert_eq!(bal.iter().map(|b| b.scaled).sum::<i128>(), 0);
    }

    #[test]
    fn test_largest_amounts_settle_without_overflow() {
        let data = vec![exp("A", i64::MAX, false), exp("A", i64::MAX, false), exp("B", 0, false)];
        let ps = people(&["A", "B", "C"]);
        let bal = balances(&data, &ps);
        assert_eq!(bal[0].paid, i64::MAX);
        assert!(bal[0].net(3) > 0);
        let plan = plan_transfers(&bal);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|t| t.to == "A" && t.amount == i64::MAX / 3));
    }
}
