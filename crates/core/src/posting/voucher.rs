//! Persisted voucher and journal records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::{
    CurrencyId, JournalId, TemplateId, TenantId, UserId, VoucherId, VoucherTypeId,
};

use super::facts::BusinessReference;
use crate::ledger::{JournalLine, JournalTotals};
use crate::workflow::VoucherStatus;

/// A voucher: the numbered header of one posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Voucher id.
    pub id: VoucherId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Printed number, unique per tenant and voucher type.
    pub voucher_number: String,
    /// Voucher type that issued the number.
    pub voucher_type_id: VoucherTypeId,
    /// Accounting date.
    pub voucher_date: NaiveDate,
    /// Transaction type the voucher was posted for.
    pub transaction_type: String,
    /// Template that produced the journal.
    pub template_id: Option<TemplateId>,
    /// Business module the accounts were resolved for.
    pub module: Option<String>,
    /// Source document.
    pub reference: BusinessReference,
    /// Gross amount in transaction currency.
    pub total_amount: Decimal,
    /// Transaction currency, when not the tenant's base currency.
    pub currency_id: Option<CurrencyId>,
    /// Rate from transaction currency to base currency.
    pub exchange_rate: Option<Decimal>,
    /// `total_amount` converted at `exchange_rate`.
    pub base_currency_amount: Option<Decimal>,
    /// Free-text narration.
    pub narration: Option<String>,
    /// Whether the journal has been applied to the ledger.
    pub is_posted: bool,
    /// Soft-delete flag for discarded drafts.
    pub is_deleted: bool,
    /// Whether this voucher negates another.
    pub is_reversal: bool,
    /// On a reversal: the voucher it negates.
    pub reversed_voucher_id: Option<VoucherId>,
    /// On an original: the voucher that negates it.
    pub reversal_voucher_id: Option<VoucherId>,
    /// On an original: why it was reversed.
    pub reversal_reason: Option<String>,
    /// On an original: when it was reversed.
    pub reversed_at: Option<DateTime<Utc>>,
    /// On an original: who reversed it.
    pub reversed_by: Option<UserId>,
    /// Caller-supplied key making the posting idempotent.
    pub idempotency_key: Option<String>,
    /// Who created the voucher.
    pub created_by: UserId,
    /// When the voucher was created.
    pub created_at: DateTime<Utc>,
    /// Who posted it (the creator, or the approver of a draft).
    pub posted_by: Option<UserId>,
    /// When it was posted.
    pub posted_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// Derives the lifecycle state from the stored flags.
    #[must_use]
    pub fn status(&self) -> VoucherStatus {
        if self.is_deleted {
            VoucherStatus::Discarded
        } else if self.reversal_voucher_id.is_some() {
            VoucherStatus::Reversed
        } else if self.is_posted {
            VoucherStatus::Posted
        } else {
            VoucherStatus::Draft
        }
    }
}

/// A journal with its lines, as stored for a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Journal id.
    pub id: JournalId,
    /// Voucher the journal belongs to.
    pub voucher_id: VoucherId,
    /// Totals recorded at creation.
    pub totals: JournalTotals,
    /// Lines ordered by line number.
    pub lines: Vec<JournalLine>,
}

impl Journal {
    /// Whether the recorded totals balance.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.totals.is_balanced()
    }
}
