//! Ledger running-balance tests
//!
//! Covers:
//! - Balance after a single credit or debit
//! - Chain validity over any sequence of entries
//! - Lost updates when appends for one owner are not serialized

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    audit_chain, current_balance, next_balance, verify_chain, ChainLink, DomainError, EntryType,
    LedgerSummary,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Minimal stored entry for chain checks
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    amount: Decimal,
    entry_type: EntryType,
    balance_after: Decimal,
}

impl ChainLink for Entry {
    fn amount(&self) -> Decimal {
        self.amount
    }

    fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    fn balance_after(&self) -> Decimal {
        self.balance_after
    }
}

/// Append to an oldest-first chain the way the service does under the head lock
fn append(chain: &mut Vec<Entry>, amount: Decimal, entry_type: EntryType) -> Result<Decimal, DomainError> {
    let previous = chain.last().map(|e| e.balance_after).unwrap_or(Decimal::ZERO);
    let balance_after = next_balance(previous, amount, entry_type)?;
    chain.push(Entry {
        amount,
        entry_type,
        balance_after,
    });
    Ok(balance_after)
}

fn newest_first(chain: &[Entry]) -> Vec<Entry> {
    chain.iter().rev().cloned().collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Prior balance 500, debit 200 -> 300
    #[test]
    fn test_debit_after_existing_entry() {
        let mut chain = Vec::new();
        append(&mut chain, dec("500"), EntryType::Credit).unwrap();
        assert_eq!(chain[0].balance_after, dec("500"));

        let balance = append(&mut chain, dec("200"), EntryType::Debit).unwrap();
        assert_eq!(balance, dec("300"));
        assert_eq!(current_balance(&newest_first(&chain)), dec("300"));
    }

    /// Fresh owner, credit 1000 -> 1000
    #[test]
    fn test_first_credit_for_fresh_owner() {
        let mut chain = Vec::new();
        assert_eq!(current_balance(&newest_first(&chain)), Decimal::ZERO);

        let balance = append(&mut chain, dec("1000"), EntryType::Credit).unwrap();
        assert_eq!(balance, dec("1000"));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut chain = Vec::new();
        assert_eq!(
            append(&mut chain, Decimal::ZERO, EntryType::Credit),
            Err(DomainError::NonPositiveAmount)
        );
        assert!(chain.is_empty());
    }

    #[test]
    fn test_balance_may_go_negative() {
        let mut chain = Vec::new();
        let balance = append(&mut chain, dec("250.50"), EntryType::Debit).unwrap();
        assert_eq!(balance, dec("-250.50"));
        assert!(verify_chain(&chain).is_ok());
    }

    #[test]
    fn test_summary_totals() {
        let mut chain = Vec::new();
        append(&mut chain, dec("1000"), EntryType::Credit).unwrap();
        append(&mut chain, dec("300"), EntryType::Debit).unwrap();
        append(&mut chain, dec("45.25"), EntryType::Credit).unwrap();

        let summary = LedgerSummary::from_entries(&newest_first(&chain));
        assert_eq!(summary.total_credit, dec("1045.25"));
        assert_eq!(summary.total_debit, dec("300"));
        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.balance, dec("745.25"));
    }

    #[test]
    fn test_audit_reports_first_break() {
        let chain = vec![
            Entry {
                amount: dec("100"),
                entry_type: EntryType::Credit,
                balance_after: dec("100"),
            },
            Entry {
                amount: dec("40"),
                entry_type: EntryType::Debit,
                balance_after: dec("70"),
            },
        ];

        let report = audit_chain(&chain);
        assert!(!report.valid);
        assert_eq!(report.entries_checked, 2);
        let first_break = report.first_break.unwrap();
        assert_eq!(first_break.index, 1);
        assert_eq!(first_break.expected, dec("60"));
        assert_eq!(first_break.found, dec("70"));
    }
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[cfg(test)]
mod concurrency_tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Mutex as HeadLock;

    /// Read the latest balance, suspend, then write. No isolation between
    /// the read and the write.
    async fn unguarded_append(store: Arc<Mutex<Vec<Entry>>>, amount: Decimal, entry_type: EntryType) {
        let previous = current_balance(&newest_first(&store.lock().unwrap()));

        // Store round-trip between read and write
        tokio::task::yield_now().await;

        let balance_after = next_balance(previous, amount, entry_type).unwrap();
        store.lock().unwrap().push(Entry {
            amount,
            entry_type,
            balance_after,
        });
    }

    /// Same read-then-write, with the owner's head held for the whole step
    async fn locked_append(
        head: Arc<HeadLock<()>>,
        store: Arc<Mutex<Vec<Entry>>>,
        amount: Decimal,
        entry_type: EntryType,
    ) {
        let _guard = head.lock().await;
        let previous = current_balance(&newest_first(&store.lock().unwrap()));

        tokio::task::yield_now().await;

        let balance_after = next_balance(previous, amount, entry_type).unwrap();
        store.lock().unwrap().push(Entry {
            amount,
            entry_type,
            balance_after,
        });
    }

    /// Two interleaved unguarded appends both read the same prior balance.
    /// The resulting chain must be detected as broken.
    #[tokio::test]
    async fn test_unguarded_appends_break_chain() {
        let store = Arc::new(Mutex::new(Vec::new()));

        tokio::join!(
            unguarded_append(store.clone(), dec("100"), EntryType::Credit),
            unguarded_append(store.clone(), dec("50"), EntryType::Credit),
        );

        let chain = store.lock().unwrap().clone();
        assert_eq!(chain.len(), 2);

        let result = verify_chain(&chain);
        assert!(matches!(result, Err(DomainError::BrokenChain { index: 1, .. })));
        assert!(!audit_chain(&chain).valid);
    }

    #[tokio::test]
    async fn test_locked_appends_keep_chain_valid() {
        let head = Arc::new(HeadLock::new(()));
        let store = Arc::new(Mutex::new(Vec::new()));

        tokio::join!(
            locked_append(head.clone(), store.clone(), dec("100"), EntryType::Credit),
            locked_append(head.clone(), store.clone(), dec("50"), EntryType::Credit),
            locked_append(head.clone(), store.clone(), dec("30"), EntryType::Debit),
        );

        let chain = store.lock().unwrap().clone();
        assert_eq!(chain.len(), 3);
        assert_eq!(verify_chain(&chain), Ok(dec("120")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_locked_appends_across_tasks() {
        let head = Arc::new(HeadLock::new(()));
        let store = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (1..=20)
            .map(|i| {
                let entry_type = if i % 3 == 0 {
                    EntryType::Debit
                } else {
                    EntryType::Credit
                };
                tokio::spawn(locked_append(
                    head.clone(),
                    store.clone(),
                    Decimal::from(i * 10),
                    entry_type,
                ))
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let chain = store.lock().unwrap().clone();
        assert_eq!(chain.len(), 20);

        let expected: Decimal = chain.iter().map(|e| e.entry_type.signed(e.amount)).sum();
        assert_eq!(verify_chain(&chain), Ok(expected));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for positive amounts with paise precision
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn entry_type_strategy() -> impl Strategy<Value = EntryType> {
        prop_oneof![Just(EntryType::Credit), Just(EntryType::Debit)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serial appends always produce a valid chain whose final balance is
        /// the signed sum of the amounts
        #[test]
        fn prop_serial_appends_form_valid_chain(
            entries in prop::collection::vec((amount_strategy(), entry_type_strategy()), 1..50)
        ) {
            let mut chain = Vec::new();
            for (amount, entry_type) in &entries {
                append(&mut chain, *amount, *entry_type).unwrap();
            }

            let expected: Decimal = entries.iter().map(|(a, t)| t.signed(*a)).sum();
            prop_assert_eq!(verify_chain(&chain), Ok(expected));
            prop_assert_eq!(current_balance(&newest_first(&chain)), expected);
        }

        /// Summary balance agrees with credit minus debit totals
        #[test]
        fn prop_summary_consistent(
            entries in prop::collection::vec((amount_strategy(), entry_type_strategy()), 0..30)
        ) {
            let mut chain = Vec::new();
            for (amount, entry_type) in &entries {
                append(&mut chain, *amount, *entry_type).unwrap();
            }

            let summary = LedgerSummary::from_entries(&newest_first(&chain));
            prop_assert_eq!(summary.balance, summary.total_credit - summary.total_debit);
            prop_assert_eq!(summary.entry_count as usize, entries.len());
        }

        /// Tampering with any stored balance is caught at that index
        #[test]
        fn prop_tampering_detected(
            entries in prop::collection::vec((amount_strategy(), entry_type_strategy()), 1..20),
            pick in any::<prop::sample::Index>(),
            delta in amount_strategy()
        ) {
            let mut chain = Vec::new();
            for (amount, entry_type) in &entries {
                append(&mut chain, *amount, *entry_type).unwrap();
            }

            let index = pick.index(chain.len());
            chain[index].balance_after += delta;

            let report = audit_chain(&chain);
            prop_assert!(!report.valid);
            prop_assert_eq!(report.first_break.map(|b| b.index), Some(index));
        }
    }
}
