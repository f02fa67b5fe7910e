//! Amount sources: what a template rule posts.
//!
//! Rules store their amount source as a string plus an optional percentage.
//! Parsing happens once, when a template is compiled; evaluation against a
//! set of monetary facts fails only on arithmetic overflow.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::round_amount;

use super::facts::{MonetaryFacts, normalize_component};
use crate::ledger::PostingError;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Where a rule's amount comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmountSource {
    /// The gross total of the transaction.
    TotalAmount,
    /// The total minus every tax component.
    TaxableAmount,
    /// A single named tax component, e.g. `CGST_AMOUNT`.
    NamedComponent(String),
    /// A percentage of another source, rounded to stored precision.
    PercentageOf(Box<AmountSource>, Decimal),
    /// Absorbs the residual between the other rules' debits and credits.
    RoundOff,
}

impl AmountSource {
    /// Parses a persisted selector.
    ///
    /// Accepted selectors (case-insensitive):
    /// - `TOTAL_AMOUNT`, `TAXABLE_AMOUNT`
    /// - any other `<NAME>_AMOUNT`, read as a named tax component
    /// - `PERCENTAGE` / `PERCENTAGE_OF_TOTAL`, `PERCENTAGE_OF_TAXABLE`,
    ///   `PERCENTAGE_OF(<selector>)`, all requiring `percentage`
    /// - `ROUND_OFF` / `ROUNDOFF`
    pub fn parse(selector: &str, percentage: Option<Decimal>) -> Result<Self, PostingError> {
        let normalized = selector.trim().to_uppercase();

        if let Some(inner) = normalized
            .strip_prefix("PERCENTAGE_OF(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let base = Self::parse(inner, None)?;
            if matches!(base, Self::RoundOff | Self::PercentageOf(..)) {
                return Err(PostingError::UnsupportedAmountSource(selector.to_string()));
            }
            return Self::percentage_of(base, selector, percentage);
        }

        match normalized.as_str() {
            "TOTAL_AMOUNT" => Ok(Self::TotalAmount),
            "TAXABLE_AMOUNT" => Ok(Self::TaxableAmount),
            "ROUND_OFF" | "ROUNDOFF" => Ok(Self::RoundOff),
            "PERCENTAGE" | "PERCENTAGE_OF_TOTAL" => {
                Self::percentage_of(Self::TotalAmount, selector, percentage)
            }
            "PERCENTAGE_OF_TAXABLE" => {
                Self::percentage_of(Self::TaxableAmount, selector, percentage)
            }
            name if is_component_name(name) => Ok(Self::NamedComponent(normalize_component(name))),
            _ => Err(PostingError::UnsupportedAmountSource(selector.to_string())),
        }
    }

    fn percentage_of(
        base: Self,
        selector: &str,
        percentage: Option<Decimal>,
    ) -> Result<Self, PostingError> {
        match percentage {
            Some(pct) if pct >= Decimal::ZERO => Ok(Self::PercentageOf(Box::new(base), pct)),
            Some(pct) => Err(PostingError::InvalidTemplate(format!(
                "{selector} has a negative percentage ({pct})"
            ))),
            None => Err(PostingError::UnsupportedAmountSource(format!(
                "{selector} without a percentage"
            ))),
        }
    }

    /// Evaluates the source against `facts`.
    ///
    /// `RoundOff` evaluates to zero here; the journal builder fills it in.
    pub fn evaluate(&self, facts: &MonetaryFacts) -> Result<Decimal, PostingError> {
        let amount = match self {
            Self::TotalAmount => Some(facts.total_amount),
            Self::TaxableAmount => facts.taxable_amount(),
            Self::NamedComponent(name) => Some(facts.component(name)),
            Self::PercentageOf(base, pct) => base
                .evaluate(facts)?
                .checked_mul(*pct)
                .and_then(|scaled| scaled.checked_div(ONE_HUNDRED))
                .map(round_amount),
            Self::RoundOff => Some(Decimal::ZERO),
        };
        amount.ok_or_else(|| PostingError::InvalidMonetaryFacts(format!("{self} overflowed")))
    }

    /// True for the residual-absorbing source.
    #[must_use]
    pub fn is_round_off(&self) -> bool {
        matches!(self, Self::RoundOff)
    }
}

fn is_component_name(name: &str) -> bool {
    name.len() > "_AMOUNT".len()
        && name.ends_with("_AMOUNT")
        && name.starts_with(|c: char| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl fmt::Display for AmountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalAmount => f.write_str("TOTAL_AMOUNT"),
            Self::TaxableAmount => f.write_str("TAXABLE_AMOUNT"),
            Self::NamedComponent(name) => f.write_str(name),
            Self::PercentageOf(base, pct) => write!(f, "PERCENTAGE_OF({base}) @ {pct}%"),
            Self::RoundOff => f.write_str("ROUND_OFF"),
        }
    }
}
