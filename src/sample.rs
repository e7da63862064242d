use crate::models::Expense;

struct SampleExpense {
    id: &'static str,
    date: &'static str,
    item_name: &'static str,
    category: &'static str,
    amount: i64,
    /// Index into the configured payer pair.
    payer: usize,
    is_settled: bool,
}

const SAMPLES: &[SampleExpense] = &[
    SampleExpense { id: "sample-1", date: "2026/01/18", item_name: "Supermarket", category: "food", amount: 1691, payer: 0, is_settled: true },
    SampleExpense { id: "sample-2", date: "2026/01/22", item_name: "Supermarket", category: "food", amount: 1040, payer: 0, is_settled: false },
    SampleExpense { id: "sample-3", date: "2026/01/25", item_name: "Supermarket", category: "food", amount: 1959, payer: 0, is_settled: false },
    SampleExpense { id: "sample-4", date: "2026/01/14", item_name: "Move-out cleaning", category: "other", amount: 56100, payer: 1, is_settled: true },
    SampleExpense { id: "sample-5", date: "2026/01/30", item_name: "Rent", category: "housing/utilities", amount: 74000, payer: 1, is_settled: false },
];

/// Placeholder data shown when neither the remote store nor the local cache
/// has anything. Never written to the cache or pushed to the remote.
pub fn sample_expenses(payers: &[String; 2]) -> Vec<Expense> {
    SAMPLES
        .iter()
        .map(|s| Expense {
            id: s.id.to_string(),
            date: s.date.to_string(),
            item_name: s.item_name.to_string(),
            category: s.category.to_string(),
            amount: s.amount,
            payer: payers[s.payer].clone(),
            is_settled: s.is_settled,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc;

    #[test]
    fn test_sample_uses_configured_payers() {
        let payers = ["Ryo".to_string(), "Mari".to_string()];
        let data = sample_expenses(&payers);
        assert_eq!(data.len(), 5);
        assert!(data.iter().all(|e| payers.contains(&e.payer)));
    }

    #[test]
    fn test_sample_settlement() {
        let payers = ["A".to_string(), "B".to_string()];
        let s = calc::settlement(&sample_expenses(&payers), &payers);
        // Unsettled: A 1040 + 1959 = 2999, B 74000.
        assert_eq!(s.total_a, 2999);
        assert_eq!(s.total_b, 74000);
        assert_eq!(s.transfer_amount, 35500);
        assert_eq!(s.description(), "A pays B 35500");
    }
}
