//! Double-entry bookkeeping primitives.
//!
//! - Entry and account types
//! - Journal validation
//! - Running balances and the ledger updater
//! - Error types for posting operations

pub mod balance;
pub mod error;
pub mod types;
pub mod validation;

pub use balance::{
    AccountSnapshot, AccountUpdate, LedgerEntryDraft, LedgerPosting, LedgerUpdater, NormalBalance,
    RunningBalance,
};
pub use error::{ErrorCategory, PostingError};
pub use types::{AccountType, EntryType, JournalLine, JournalTotals};
pub use validation::validate_journal;
