//! Voucher lifecycle management.
//!
//! # Modules
//!
//! - `types` - Voucher status and reversal stamp
//! - `service` - State transition checks
//! - `reversal` - Reversing entry creation

pub mod reversal;
pub mod service;
pub mod types;

#[cfg(test)]
mod reversal_props;

pub use reversal::{ReversalOutput, ReversalService};
pub use service::VoucherLifecycle;
pub use types::{ReversalStamp, VoucherStatus};
