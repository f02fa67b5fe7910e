//! Voucher state transitions.
//!
//! Checks whether a voucher may be approved, discarded or reversed, and
//! reports the matching business error when it may not.

use crate::ledger::PostingError;
use crate::posting::voucher::Voucher;
use crate::workflow::types::VoucherStatus;

/// Stateless transition checks for the voucher lifecycle.
pub struct VoucherLifecycle;

impl VoucherLifecycle {
    /// A draft may be approved; anything already on the ledger may not.
    pub fn approve(voucher: &Voucher) -> Result<VoucherStatus, PostingError> {
        match voucher.status() {
            VoucherStatus::Draft => Ok(VoucherStatus::Posted),
            VoucherStatus::Posted | VoucherStatus::Reversed => {
                Err(PostingError::VoucherAlreadyPosted(voucher.id))
            }
            VoucherStatus::Discarded => Err(PostingError::VoucherNotFound(voucher.id)),
        }
    }

    /// A draft may be discarded; posted vouchers are corrected by reversal.
    pub fn discard(voucher: &Voucher) -> Result<VoucherStatus, PostingError> {
        match voucher.status() {
            VoucherStatus::Draft => Ok(VoucherStatus::Discarded),
            VoucherStatus::Posted | VoucherStatus::Reversed => {
                Err(PostingError::VoucherAlreadyPosted(voucher.id))
            }
            VoucherStatus::Discarded => Err(PostingError::VoucherNotFound(voucher.id)),
        }
    }

    /// Only a posted, not yet reversed, non-reversal voucher may be reversed.
    pub fn reverse(voucher: &Voucher) -> Result<VoucherStatus, PostingError> {
        match voucher.status() {
            VoucherStatus::Posted if voucher.is_reversal => {
                Err(PostingError::AlreadyReversed(voucher.id))
            }
            VoucherStatus::Posted => Ok(VoucherStatus::Reversed),
            VoucherStatus::Reversed => Err(PostingError::AlreadyReversed(voucher.id)),
            VoucherStatus::Draft => Err(PostingError::VoucherNotPosted(voucher.id)),
            VoucherStatus::Discarded => Err(PostingError::VoucherNotFound(voucher.id)),
        }
    }
}
