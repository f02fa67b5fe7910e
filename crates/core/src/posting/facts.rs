//! Monetary facts and business references supplied by the caller.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledgerpost_shared::types::{MAX_STORED_AMOUNT, is_at_stored_precision, is_within_stored_range};

use crate::ledger::PostingError;

/// The amounts a business event carries into the posting engine.
///
/// Component names are normalized to upper case (`cgst_amount` and
/// `CGST_AMOUNT` are the same component).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonetaryFacts {
    /// Gross amount of the transaction, taxes included.
    pub total_amount: Decimal,
    /// Named tax components, e.g. `CGST_AMOUNT`.
    #[serde(default)]
    pub tax_breakdown: BTreeMap<String, Decimal>,
}

impl MonetaryFacts {
    /// Facts with a total and no tax.
    #[must_use]
    pub fn new(total_amount: Decimal) -> Self {
        Self {
            total_amount,
            tax_breakdown: BTreeMap::new(),
        }
    }

    /// Adds or replaces a tax component.
    #[must_use]
    pub fn with_tax(mut self, name: &str, amount: Decimal) -> Self {
        self.tax_breakdown.insert(normalize_component(name), amount);
        self
    }

    /// Sum of all tax components, `None` on overflow.
    #[must_use]
    pub fn total_tax(&self) -> Option<Decimal> {
        self.tax_breakdown
            .values()
            .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(*amount))
    }

    /// Total minus all tax components, `None` on overflow.
    #[must_use]
    pub fn taxable_amount(&self) -> Option<Decimal> {
        self.total_amount.checked_sub(self.total_tax()?)
    }

    /// Looks up a component by name. Missing components are zero.
    #[must_use]
    pub fn component(&self, name: &str) -> Decimal {
        self.tax_breakdown
            .get(&normalize_component(name))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Checks the facts before any rule is evaluated.
    pub fn validate(&self) -> Result<(), PostingError> {
        if self.total_amount.is_sign_negative() && !self.total_amount.is_zero() {
            return Err(PostingError::InvalidMonetaryFacts(format!(
                "total_amount must not be negative, got {}",
                self.total_amount
            )));
        }
        if !is_at_stored_precision(self.total_amount) {
            return Err(PostingError::InvalidMonetaryFacts(format!(
                "total_amount {} has more than 4 decimal places",
                self.total_amount
            )));
        }
        if !is_within_stored_range(self.total_amount) {
            return Err(PostingError::InvalidMonetaryFacts(format!(
                "total_amount {} exceeds {MAX_STORED_AMOUNT}",
                self.total_amount
            )));
        }
        for (name, amount) in &self.tax_breakdown {
            if *amount < Decimal::ZERO {
                return Err(PostingError::InvalidMonetaryFacts(format!(
                    "tax component {name} must not be negative, got {amount}"
                )));
            }
            if !is_at_stored_precision(*amount) {
                return Err(PostingError::InvalidMonetaryFacts(format!(
                    "tax component {name} ({amount}) has more than 4 decimal places"
                )));
            }
            if !is_within_stored_range(*amount) {
                return Err(PostingError::InvalidMonetaryFacts(format!(
                    "tax component {name} ({amount}) exceeds {MAX_STORED_AMOUNT}"
                )));
            }
        }
        let total_tax = self.total_tax().ok_or_else(|| {
            PostingError::InvalidMonetaryFacts("tax components overflow when summed".into())
        })?;
        if total_tax > self.total_amount {
            return Err(PostingError::InvalidMonetaryFacts(format!(
                "tax components ({total_tax}) exceed total_amount ({})",
                self.total_amount
            )));
        }
        Ok(())
    }
}

/// Normalizes a component name for lookup.
#[must_use]
pub fn normalize_component(name: &str) -> String {
    name.trim().to_uppercase()
}

/// The business document a voucher was posted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessReference {
    /// Kind of document, e.g. `SALES_INVOICE`.
    pub reference_type: String,
    /// Identifier of the document in its own module.
    pub reference_id: Uuid,
    /// Human-facing number of the document.
    pub reference_number: Option<String>,
}
