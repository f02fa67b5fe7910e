//! Property-based tests for reversal entries.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use ledgerpost_shared::types::AccountId;

use crate::ledger::{EntryType, JournalLine, JournalTotals};
use crate::workflow::reversal::ReversalService;

/// Strategy for generating random account ids.
fn arb_account() -> impl Strategy<Value = AccountId> {
    any::<u128>().prop_map(|n| AccountId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating positive amounts at stored precision.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Balanced journals: several debits closed by one credit.
fn arb_balanced_lines() -> impl Strategy<Value = Vec<JournalLine>> {
    (
        prop::collection::vec((arb_account(), arb_amount()), 1..5),
        arb_account(),
        prop::option::of("[a-zA-Z ]{0,20}"),
    )
        .prop_map(|(debits, credit_account, narration)| {
            let mut lines: Vec<JournalLine> = debits
                .iter()
                .zip(1..)
                .map(|((account, amount), n)| {
                    JournalLine::new(n, *account, EntryType::Debit, *amount, narration.clone())
                })
                .collect();
            let total: Decimal = debits.iter().map(|(_, a)| *a).sum();
            let next = i32::try_from(lines.len() + 1).unwrap_or(i32::MAX);
            lines.push(JournalLine::new(next, credit_account, EntryType::Credit, total, None));
            lines
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every reversed line mirrors its original: same account and amount, opposite side.
    #[test]
    fn prop_reversal_mirrors_each_line(lines in arb_balanced_lines()) {
        let reversed = ReversalService::reverse_lines(&lines);
        prop_assert_eq!(reversed.len(), lines.len());
        for (orig, rev) in lines.iter().zip(&reversed) {
            prop_assert_eq!(rev.line_number, orig.line_number);
            prop_assert_eq!(rev.account_id, orig.account_id);
            prop_assert_eq!(rev.amount(), orig.amount());
            prop_assert_eq!(rev.entry_type(), orig.entry_type().opposite());
        }
    }

    /// Original plus reversal nets every account to zero.
    #[test]
    fn prop_reversal_nets_to_zero(lines in arb_balanced_lines()) {
        let reversed = ReversalService::reverse_lines(&lines);
        let mut net = std::collections::HashMap::<AccountId, Decimal>::new();
        for line in lines.iter().chain(&reversed) {
            *net.entry(line.account_id).or_default() += line.debit - line.credit;
        }
        prop_assert!(net.values().all(|v| v.is_zero()));
    }

    /// Reversing twice gives back the original amounts and sides.
    #[test]
    fn prop_double_reversal_restores_sides(lines in arb_balanced_lines()) {
        let twice = ReversalService::reverse_lines(&ReversalService::reverse_lines(&lines));
        for (orig, back) in lines.iter().zip(&twice) {
            prop_assert_eq!(orig.debit, back.debit);
            prop_assert_eq!(orig.credit, back.credit);
        }
    }

    /// A balanced original yields a balanced reversal with the same totals.
    #[test]
    fn prop_reversal_totals_match(lines in arb_balanced_lines()) {
        let output = ReversalService::create_reversing_entries("V-1", &lines, "test").unwrap();
        let original = JournalTotals::of(&lines);
        prop_assert_eq!(output.totals.total_debit, original.total_credit);
        prop_assert_eq!(output.totals.total_credit, original.total_debit);
    }
}
