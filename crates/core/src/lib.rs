//! Core posting logic for Ledgerpost.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the [`posting::PostingStore`] port.
//!
//! # Modules
//!
//! - `ledger` - Double-entry primitives, running balances, posting errors
//! - `fiscal` - Fiscal years and the open-period guard
//! - `posting` - Templates, amount sources, journal builder, the posting engine
//! - `workflow` - Voucher lifecycle and reversals

pub mod fiscal;
pub mod ledger;
pub mod posting;
pub mod workflow;

pub use ledger::PostingError;
pub use posting::{PostingEngine, PostingRequest, PostingStore, PostingTx, ReverseRequest};
