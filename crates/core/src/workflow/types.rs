//! Voucher lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use ledgerpost_shared::types::{UserId, VoucherId};

/// Lifecycle state of a voucher.
///
/// The valid transitions are:
/// - Draft → Posted (approve)
/// - Draft → Discarded (discard)
/// - Posted → Reversed (reverse)
///
/// A reversal voucher is itself `Posted` and never moves further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoucherStatus {
    /// Held for approval; journal stored, ledger untouched.
    Draft,
    /// Applied to the ledger.
    Posted,
    /// Posted and later negated by a reversal voucher.
    Reversed,
    /// A draft that was thrown away.
    Discarded,
}

impl VoucherStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
            Self::Discarded => "DISCARDED",
        }
    }

    /// Returns true once the voucher has hit the ledger.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit stamp written on the original voucher when it is reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalStamp {
    /// The reversal voucher.
    pub reversal_voucher_id: VoucherId,
    /// Why the voucher was reversed.
    pub reason: String,
    /// Who reversed it.
    pub reversed_by: UserId,
    /// When it was reversed.
    pub reversed_at: DateTime<Utc>,
}
