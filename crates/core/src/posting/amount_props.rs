//! Property-based tests for amount evaluation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use ledgerpost_shared::types::is_at_stored_precision;

use super::amount::AmountSource;
use super::facts::MonetaryFacts;

/// Amounts with up to 4 decimal places.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Percentages with up to 4 decimal places, 0% to 200%.
fn arb_percentage() -> impl Strategy<Value = Decimal> {
    (0i64..2_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Valid facts: a total and up to three tax components that fit inside it.
fn arb_facts() -> impl Strategy<Value = MonetaryFacts> {
    (arb_amount(), prop::collection::vec(0u32..30, 0..3)).prop_map(|(total, shares)| {
        let mut facts = MonetaryFacts::new(total);
        for (i, share) in shares.into_iter().enumerate() {
            let amount = (total * Decimal::from(share) / Decimal::ONE_HUNDRED).round_dp(4);
            facts = facts.with_tax(&format!("TAX{i}_AMOUNT"), amount);
        }
        facts
    })
}

fn arb_base() -> impl Strategy<Value = AmountSource> {
    prop_oneof![
        Just(AmountSource::TotalAmount),
        Just(AmountSource::TaxableAmount),
        Just(AmountSource::NamedComponent("TAX0_AMOUNT".into())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Generated facts are always accepted.
    #[test]
    fn prop_generated_facts_validate(facts in arb_facts()) {
        prop_assert!(facts.validate().is_ok());
    }

    /// Taxable amount plus the tax components gives back the total.
    #[test]
    fn prop_taxable_plus_taxes_is_total(facts in arb_facts()) {
        let taxable = AmountSource::TaxableAmount.evaluate(&facts).unwrap();
        prop_assert_eq!(taxable + facts.total_tax().unwrap(), facts.total_amount);
    }

    /// Every evaluated amount sits at stored precision and is never negative.
    #[test]
    fn prop_evaluation_is_at_stored_precision(
        facts in arb_facts(),
        base in arb_base(),
        pct in arb_percentage(),
    ) {
        let source = AmountSource::PercentageOf(Box::new(base), pct);
        let amount = source.evaluate(&facts).unwrap();
        prop_assert!(is_at_stored_precision(amount));
        prop_assert!(amount >= Decimal::ZERO);
    }

    /// Evaluation depends only on its inputs.
    #[test]
    fn prop_evaluation_is_deterministic(
        facts in arb_facts(),
        base in arb_base(),
        pct in arb_percentage(),
    ) {
        let source = AmountSource::PercentageOf(Box::new(base), pct);
        prop_assert_eq!(
            source.evaluate(&facts).unwrap(),
            source.evaluate(&facts.clone()).unwrap()
        );
    }

    /// One hundred percent of a source is the source itself.
    #[test]
    fn prop_full_percentage_is_identity(facts in arb_facts(), base in arb_base()) {
        let full = AmountSource::PercentageOf(Box::new(base.clone()), Decimal::ONE_HUNDRED);
        prop_assert_eq!(full.evaluate(&facts).unwrap(), base.evaluate(&facts).unwrap());
    }

    /// Parsing accepts any well-formed component name.
    #[test]
    fn prop_component_names_parse(name in "[A-Z][A-Z0-9]{0,8}") {
        let selector = format!("{name}_AMOUNT");
        let parsed = AmountSource::parse(&selector, None);
        prop_assert!(parsed.is_ok());
    }
}
