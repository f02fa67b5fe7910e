//! Journal builder.
//!
//! Evaluates compiled rules against the monetary facts and assembles the
//! resulting amounts into a balanced journal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::{AccountId, MAX_STORED_AMOUNT, is_within_stored_range, round_amount};

use super::facts::MonetaryFacts;
use super::template::PostingRule;
use crate::ledger::validation::validate_journal;
use crate::ledger::{EntryType, JournalLine, JournalTotals, PostingError};

/// Outcome of evaluating one rule, kept for the posting trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Rule line number.
    pub line_number: i32,
    /// Resolved account.
    pub account_id: AccountId,
    /// Declared side.
    pub entry_type: EntryType,
    /// Selector, as displayed.
    pub source: String,
    /// Evaluated amount. Zero for a round-off rule until the builder fills it in.
    pub amount: Decimal,
    /// Whether the rule absorbs the residual.
    pub is_round_off: bool,
    /// Narration.
    pub narration: Option<String>,
}

/// Evaluates every rule against `facts`, in rule order.
pub fn evaluate_rules(
    rules: &[PostingRule],
    facts: &MonetaryFacts,
) -> Result<Vec<RuleEvaluation>, PostingError> {
    rules
        .iter()
        .map(|rule| {
            Ok(RuleEvaluation {
                line_number: rule.line_number,
                account_id: rule.account_id,
                entry_type: rule.entry_type,
                source: rule.source.to_string(),
                amount: round_amount(rule.source.evaluate(facts)?),
                is_round_off: rule.source.is_round_off(),
                narration: rule.narration.clone(),
            })
        })
        .collect()
}

/// A balanced journal, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalDraft {
    /// Non-zero lines, ordered by line number.
    pub lines: Vec<JournalLine>,
    /// Debit and credit totals (always equal).
    pub totals: JournalTotals,
    /// Amount absorbed by the round-off rule, signed as debit minus credit of the other rules.
    pub round_off: Decimal,
}

/// Assembles rule evaluations into a balanced journal.
#[derive(Debug, Clone, Copy)]
pub struct JournalBuilder {
    round_off_tolerance: Decimal,
}

impl JournalBuilder {
    /// Creates a builder whose round-off rule may absorb at most `round_off_tolerance`.
    #[must_use]
    pub fn new(round_off_tolerance: Decimal) -> Self {
        Self {
            round_off_tolerance,
        }
    }

    /// Builds the journal.
    ///
    /// Exact-zero evaluations produce no line. Without a round-off rule,
    /// debits must equal credits exactly; with one, the residual must not
    /// exceed the tolerance and is posted on the side that closes the gap.
    pub fn build(&self, evaluations: &[RuleEvaluation]) -> Result<JournalDraft, PostingError> {
        let mut debit = Decimal::ZERO;
        let mut credit = Decimal::ZERO;
        for eval in evaluations.iter().filter(|e| !e.is_round_off) {
            if eval.amount < Decimal::ZERO {
                return Err(PostingError::InvalidTemplate(format!(
                    "rule {} evaluated to a negative amount ({})",
                    eval.line_number, eval.amount
                )));
            }
            if !is_within_stored_range(eval.amount) {
                return Err(PostingError::InvalidMonetaryFacts(format!(
                    "rule {} evaluated to {}, beyond {MAX_STORED_AMOUNT}",
                    eval.line_number, eval.amount
                )));
            }
            let side = match eval.entry_type {
                EntryType::Debit => &mut debit,
                EntryType::Credit => &mut credit,
            };
            *side = side
                .checked_add(eval.amount)
                .filter(|sum| is_within_stored_range(*sum))
                .ok_or_else(|| {
                    PostingError::InvalidMonetaryFacts(format!(
                        "{} total exceeds {MAX_STORED_AMOUNT}",
                        eval.entry_type.as_str()
                    ))
                })?;
        }

        let residual = debit - credit;
        let round_off_rule = evaluations.iter().find(|e| e.is_round_off);

        if !residual.is_zero() {
            match round_off_rule {
                Some(_) if residual.abs() <= self.round_off_tolerance => {}
                _ => return Err(PostingError::UnbalancedPosting { debit, credit }),
            }
        }

        let mut lines: Vec<JournalLine> = evaluations
            .iter()
            .filter_map(|eval| {
                let (entry_type, amount) = if eval.is_round_off {
                    let side = if residual > Decimal::ZERO {
                        EntryType::Credit
                    } else {
                        EntryType::Debit
                    };
                    (side, residual.abs())
                } else {
                    (eval.entry_type, eval.amount)
                };
                (!amount.is_zero()).then(|| {
                    JournalLine::new(
                        eval.line_number,
                        eval.account_id,
                        entry_type,
                        amount,
                        eval.narration.clone(),
                    )
                })
            })
            .collect();
        lines.sort_by_key(|l| l.line_number);

        let totals = validate_journal(&lines)?;

        Ok(JournalDraft {
            lines,
            totals,
            round_off: residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::amount::AmountSource;
    use rust_decimal_macros::dec;

    fn posting_rule(line: i32, side: EntryType, source: AmountSource) -> PostingRule {
        PostingRule {
            line_number: line,
            account_id: AccountId::new(),
            entry_type: side,
            source,
            narration: Some(format!("line {line}")),
        }
    }

    fn builder() -> JournalBuilder {
        JournalBuilder::new(dec!(1))
    }

    #[test]
    fn test_sales_order_posts_two_lines() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Credit, AmountSource::TotalAmount),
        ];
        let evals = evaluate_rules(&rules, &MonetaryFacts::new(dec!(1000.00))).unwrap();
        let draft = builder().build(&evals).unwrap();

        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.totals.total_debit, dec!(1000.00));
        assert_eq!(draft.totals.total_credit, dec!(1000.00));
        assert_eq!(draft.lines[0].debit, dec!(1000.00));
        assert_eq!(draft.lines[1].credit, dec!(1000.00));
        assert_eq!(draft.lines[0].narration.as_deref(), Some("line 1"));
    }

    #[test]
    fn test_tax_invoice_with_zero_component_skipped() {
        let facts = MonetaryFacts::new(dec!(1180))
            .with_tax("CGST_AMOUNT", dec!(90))
            .with_tax("SGST_AMOUNT", dec!(90));
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Credit, AmountSource::TaxableAmount),
            posting_rule(3, EntryType::Credit, AmountSource::NamedComponent("CGST_AMOUNT".into())),
            posting_rule(4, EntryType::Credit, AmountSource::NamedComponent("SGST_AMOUNT".into())),
            posting_rule(5, EntryType::Credit, AmountSource::NamedComponent("IGST_AMOUNT".into())),
        ];
        let draft = builder().build(&evaluate_rules(&rules, &facts).unwrap()).unwrap();

        assert_eq!(draft.lines.len(), 4);
        assert!(draft.lines.iter().all(|l| l.line_number != 5));
        assert_eq!(draft.totals.total_credit, dec!(1180));
    }

    #[test]
    fn test_unbalanced_rejected() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Credit, AmountSource::TaxableAmount),
        ];
        let facts = MonetaryFacts::new(dec!(118)).with_tax("GST_AMOUNT", dec!(18));
        let err = builder().build(&evaluate_rules(&rules, &facts).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            PostingError::UnbalancedPosting { debit, credit }
                if debit == dec!(118) && credit == dec!(100)
        ));
    }

    #[test]
    fn test_round_off_absorbs_small_residual() {
        // 3 x 33.3333% of 100 credits 99.9999; round-off credits the rest.
        let third = || {
            AmountSource::PercentageOf(Box::new(AmountSource::TotalAmount), dec!(33.3333))
        };
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Credit, third()),
            posting_rule(3, EntryType::Credit, third()),
            posting_rule(4, EntryType::Credit, third()),
            posting_rule(5, EntryType::Debit, AmountSource::RoundOff),
        ];
        let draft = builder()
            .build(&evaluate_rules(&rules, &MonetaryFacts::new(dec!(100))).unwrap())
            .unwrap();

        let round_off = draft.lines.iter().find(|l| l.line_number == 5).unwrap();
        assert_eq!(round_off.credit, dec!(0.0001));
        assert_eq!(round_off.debit, dec!(0));
        assert_eq!(draft.round_off, dec!(0.0001));
        assert!(draft.totals.is_balanced());
    }

    #[test]
    fn test_round_off_side_follows_residual() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::NamedComponent("NET_AMOUNT".into())),
            posting_rule(2, EntryType::Credit, AmountSource::TotalAmount),
            posting_rule(3, EntryType::Credit, AmountSource::RoundOff),
        ];
        let facts = MonetaryFacts::new(dec!(100)).with_tax("NET_AMOUNT", dec!(99.6));
        let draft = builder().build(&evaluate_rules(&rules, &facts).unwrap()).unwrap();
        let round_off = draft.lines.iter().find(|l| l.line_number == 3).unwrap();
        assert_eq!(round_off.debit, dec!(0.4));
    }

    #[test]
    fn test_round_off_beyond_tolerance_rejected() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Credit, AmountSource::TaxableAmount),
            posting_rule(3, EntryType::Credit, AmountSource::RoundOff),
        ];
        let facts = MonetaryFacts::new(dec!(118)).with_tax("GST_AMOUNT", dec!(18));
        assert!(matches!(
            builder().build(&evaluate_rules(&rules, &facts).unwrap()),
            Err(PostingError::UnbalancedPosting { .. })
        ));
    }

    #[test]
    fn test_balanced_round_off_rule_posts_nothing() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Credit, AmountSource::TotalAmount),
            posting_rule(3, EntryType::Credit, AmountSource::RoundOff),
        ];
        let draft = builder()
            .build(&evaluate_rules(&rules, &MonetaryFacts::new(dec!(50))).unwrap())
            .unwrap();
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.round_off, dec!(0));
    }

    #[test]
    fn test_line_beyond_stored_range_rejected() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(
                2,
                EntryType::Credit,
                AmountSource::PercentageOf(Box::new(AmountSource::TotalAmount), dec!(1000)),
            ),
        ];
        let evals = evaluate_rules(&rules, &MonetaryFacts::new(MAX_STORED_AMOUNT)).unwrap();
        assert!(matches!(
            builder().build(&evals),
            Err(PostingError::InvalidMonetaryFacts(msg)) if msg.contains("rule 2")
        ));
    }

    #[test]
    fn test_side_total_beyond_stored_range_rejected() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(3, EntryType::Credit, AmountSource::TotalAmount),
        ];
        let evals = evaluate_rules(&rules, &MonetaryFacts::new(MAX_STORED_AMOUNT)).unwrap();
        assert!(matches!(
            builder().build(&evals),
            Err(PostingError::InvalidMonetaryFacts(msg)) if msg.contains("DEBIT")
        ));
    }

    #[test]
    fn test_evaluation_overflow_is_an_error() {
        let rules = vec![posting_rule(
            1,
            EntryType::Debit,
            AmountSource::PercentageOf(Box::new(AmountSource::TotalAmount), dec!(200)),
        )];
        let facts = MonetaryFacts::new(Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0));
        assert!(matches!(
            evaluate_rules(&rules, &facts),
            Err(PostingError::InvalidMonetaryFacts(_))
        ));
    }

    #[test]
    fn test_all_zero_is_empty_journal() {
        let rules = vec![
            posting_rule(1, EntryType::Debit, AmountSource::TotalAmount),
            posting_rule(2, EntryType::Credit, AmountSource::TotalAmount),
        ];
        assert!(matches!(
            builder().build(&evaluate_rules(&rules, &MonetaryFacts::new(dec!(0))).unwrap()),
            Err(PostingError::EmptyJournal)
        ));
    }
}
