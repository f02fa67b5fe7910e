//! Property-based tests for the journal builder.

use proptest::prelude::*;
use rust_decimal::Decimal;

use ledgerpost_shared::types::AccountId;

use super::journal::{JournalBuilder, RuleEvaluation};
use crate::ledger::{EntryType, PostingError};

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

fn evaluation(line: i32, entry_type: EntryType, amount: Decimal) -> RuleEvaluation {
    RuleEvaluation {
        line_number: line,
        account_id: AccountId::from_uuid(uuid::Uuid::from_u128(u128::from(line.unsigned_abs()))),
        entry_type,
        source: "TOTAL_AMOUNT".into(),
        amount,
        is_round_off: false,
        narration: None,
    }
}

/// Debit amounts split into a mirrored set of credits, so the result always balances.
fn arb_balanced_evaluations() -> impl Strategy<Value = Vec<RuleEvaluation>> {
    prop::collection::vec(arb_amount(), 1..8).prop_map(|amounts| {
        let total: Decimal = amounts.iter().copied().sum();
        let mut evals: Vec<RuleEvaluation> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| evaluation(i32::try_from(i + 1).unwrap_or(i32::MAX), EntryType::Debit, *amount))
            .collect();
        let next = i32::try_from(evals.len() + 1).unwrap_or(i32::MAX);
        evals.push(evaluation(next, EntryType::Credit, total));
        evals
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balanced inputs build a balanced journal with no zero lines.
    #[test]
    fn prop_balanced_inputs_build(evals in arb_balanced_evaluations()) {
        let total: Decimal = evals
            .iter()
            .filter(|e| e.entry_type == EntryType::Credit)
            .map(|e| e.amount)
            .sum();
        match JournalBuilder::new(Decimal::ONE).build(&evals) {
            Ok(draft) => {
                prop_assert!(draft.totals.is_balanced());
                prop_assert_eq!(draft.totals.total_debit, total);
                prop_assert!(draft.lines.iter().all(|l| !l.amount().is_zero()));
                let non_zero = evals.iter().filter(|e| !e.amount.is_zero()).count();
                prop_assert_eq!(draft.lines.len(), non_zero);
            }
            Err(PostingError::EmptyJournal) => prop_assert!(total.is_zero()),
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Lines come out ordered by line number whatever the input order.
    #[test]
    fn prop_lines_are_ordered(mut evals in arb_balanced_evaluations()) {
        evals.reverse();
        if let Ok(draft) = JournalBuilder::new(Decimal::ONE).build(&evals) {
            let numbers: Vec<i32> = draft.lines.iter().map(|l| l.line_number).collect();
            let mut sorted = numbers.clone();
            sorted.sort_unstable();
            prop_assert_eq!(numbers, sorted);
        }
    }

    /// Any residual within tolerance is absorbed by a round-off rule.
    #[test]
    fn prop_round_off_closes_residual(
        evals in arb_balanced_evaluations(),
        skew in -10_000i64..10_000i64,
    ) {
        let mut evals = evals;
        let last = evals.len() - 1;
        let skewed = evals[last].amount + Decimal::new(skew, 4);
        prop_assume!(skewed >= Decimal::ZERO);
        evals[last].amount = skewed;

        let mut round_off = evaluation(1_000, EntryType::Debit, Decimal::ZERO);
        round_off.is_round_off = true;
        evals.push(round_off);

        match JournalBuilder::new(Decimal::ONE).build(&evals) {
            Ok(draft) => prop_assert!(draft.totals.is_balanced()),
            Err(PostingError::EmptyJournal) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Any non-zero residual without a round-off rule is rejected.
    #[test]
    fn prop_unbalanced_rejected(
        evals in arb_balanced_evaluations(),
        skew in 1i64..10_000i64,
    ) {
        let mut evals = evals;
        evals[0].amount += Decimal::new(skew, 4);
        let rejected = matches!(
            JournalBuilder::new(Decimal::ONE).build(&evals),
            Err(PostingError::UnbalancedPosting { .. })
        );
        prop_assert!(rejected);
    }
}
