//! Rule-based posting.
//!
//! A business transaction arrives as a [`PostingRequest`]. Its tenant's
//! template for the transaction type is compiled against the account role
//! mappings, every rule's amount is evaluated against the monetary facts,
//! and the resulting lines are assembled into a balanced journal. The
//! [`PostingEngine`] then writes the voucher, journal and ledger rows in one
//! [`PostingTx`].

pub mod amount;
pub mod cache;
pub mod engine;
pub mod facts;
pub mod journal;
pub mod numbering;
pub mod request;
pub mod store;
pub mod template;
pub mod voucher;

#[cfg(test)]
mod amount_props;
#[cfg(test)]
mod journal_props;
#[cfg(test)]
mod memory;

pub use amount::AmountSource;
pub use cache::{CacheGeneration, ConfigInvalidation, TenantConfigCache};
pub use engine::PostingEngine;
pub use facts::{BusinessReference, MonetaryFacts};
pub use journal::{JournalBuilder, JournalDraft, RuleEvaluation, evaluate_rules};
pub use numbering::{VoucherSequence, format_voucher_number, parse_voucher_number};
pub use request::{
    MAX_IDEMPOTENCY_KEY_LEN, PostingOutcome, PostingPreview, PostingRequest, ReverseRequest,
};
pub use store::{PostingStore, PostingTx};
pub use template::{
    AccountResolver, AccountRoleMapping, PostingRule, RuleTarget, TemplateRule,
    TenantPostingConfig, TransactionTemplate, normalize_module, normalize_role,
    normalize_transaction_type,
};
pub use voucher::{Journal, Voucher};
