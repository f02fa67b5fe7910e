//! Inputs and outputs of the posting engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::{
    CurrencyId, MAX_STORED_AMOUNT, TemplateId, TenantId, UserId, VoucherId, VoucherTypeId,
    convert_to_base, is_within_stored_range,
};

use super::facts::{BusinessReference, MonetaryFacts};
use super::journal::{JournalDraft, RuleEvaluation};
use crate::ledger::PostingError;

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// A finalized business transaction to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRequest {
    /// Tenant the transaction belongs to.
    pub tenant_id: TenantId,
    /// Transaction type selecting the template, e.g. `SALES_ORDER`.
    pub transaction_type: String,
    /// Business module used to narrow account role mappings.
    pub module: Option<String>,
    /// Source document.
    pub reference: BusinessReference,
    /// Accounting date.
    pub transaction_date: NaiveDate,
    /// Amounts to post.
    pub facts: MonetaryFacts,
    /// Acting user.
    pub created_by: UserId,
    /// Free-text narration for the voucher.
    pub narration: Option<String>,
    /// Makes repeated calls return the first voucher instead of posting again.
    pub idempotency_key: Option<String>,
    /// Store as a draft; the ledger is only touched on approval.
    pub hold_for_approval: bool,
    /// Transaction currency, when not the tenant's base currency.
    pub currency_id: Option<CurrencyId>,
    /// Rate from transaction currency to base currency.
    pub exchange_rate: Option<Decimal>,
}

impl PostingRequest {
    /// A request with no module, narration, idempotency key or currency.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        transaction_type: impl Into<String>,
        reference: BusinessReference,
        transaction_date: NaiveDate,
        facts: MonetaryFacts,
        created_by: UserId,
    ) -> Self {
        Self {
            tenant_id,
            transaction_type: transaction_type.into(),
            module: None,
            reference,
            transaction_date,
            facts,
            created_by,
            narration: None,
            idempotency_key: None,
            hold_for_approval: false,
            currency_id: None,
            exchange_rate: None,
        }
    }

    /// Checks the request before any configuration is consulted.
    pub fn validate(&self) -> Result<(), PostingError> {
        self.facts.validate()?;

        match (self.currency_id, self.exchange_rate) {
            (Some(_), None) => {
                return Err(PostingError::InvalidMonetaryFacts(
                    "currency_id requires an exchange_rate".into(),
                ));
            }
            (_, Some(rate)) if rate <= Decimal::ZERO => {
                return Err(PostingError::InvalidMonetaryFacts(format!(
                    "exchange_rate must be positive, got {rate}"
                )));
            }
            (_, Some(rate))
                if !convert_to_base(self.facts.total_amount, rate)
                    .is_some_and(is_within_stored_range) =>
            {
                return Err(PostingError::InvalidMonetaryFacts(format!(
                    "total_amount {} at exchange_rate {rate} exceeds {MAX_STORED_AMOUNT}",
                    self.facts.total_amount
                )));
            }
            _ => {}
        }

        if let Some(key) = &self.idempotency_key
            && (key.trim().is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN)
        {
            return Err(PostingError::InvalidMonetaryFacts(format!(
                "idempotency_key must be 1 to {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }

        Ok(())
    }

    /// Total converted to base currency, when a rate was supplied.
    #[must_use]
    pub fn base_currency_amount(&self) -> Option<Decimal> {
        self.exchange_rate
            .and_then(|rate| convert_to_base(self.facts.total_amount, rate))
    }
}

/// Result of a successful `post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingOutcome {
    /// The voucher created, or the one found for the idempotency key.
    pub voucher_id: VoucherId,
    /// True when nothing was written because the key had already been used.
    pub replayed: bool,
}

/// Request to reverse a posted voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseRequest {
    /// Tenant owning the voucher.
    pub tenant_id: TenantId,
    /// Voucher to reverse.
    pub voucher_id: VoucherId,
    /// Why it is being reversed.
    pub reason: String,
    /// Acting user.
    pub performed_by: UserId,
    /// Accounting date of the reversal; defaults to the original's date.
    pub reversal_date: Option<NaiveDate>,
}

/// What a posting would produce, computed without writing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingPreview {
    /// Template that would be used.
    pub template_id: TemplateId,
    /// Its code.
    pub template_code: String,
    /// Voucher type that would number the voucher.
    pub voucher_type_id: VoucherTypeId,
    /// Per-rule evaluation trace.
    pub evaluations: Vec<RuleEvaluation>,
    /// The balanced journal.
    pub journal: JournalDraft,
    /// Total converted to base currency, when a rate was supplied.
    pub base_currency_amount: Option<Decimal>,
}
