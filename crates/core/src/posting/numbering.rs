//! Voucher number formatting.
//!
//! Sequences themselves live in storage (one row per tenant and voucher
//! type, advanced under a row lock inside the posting transaction); this
//! module only turns a sequence value into the printed number.

use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::{TenantId, VoucherTypeId};

/// A voucher type's numbering state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherSequence {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Voucher type.
    pub voucher_type_id: VoucherTypeId,
    /// Prefix printed before the number, e.g. `SV-`.
    pub prefix: String,
    /// Zero-padding width; `None` falls back to the configured default.
    pub number_width: Option<u32>,
    /// Last number issued, 0 when none.
    pub last_number: i64,
}

impl VoucherSequence {
    /// Advances the sequence and returns the formatted number.
    pub fn advance(&mut self, default_width: u32) -> String {
        self.last_number += 1;
        format_voucher_number(
            &self.prefix,
            self.last_number,
            self.number_width.unwrap_or(default_width),
        )
    }
}

/// Formats `prefix` + `number` zero-padded to `width` digits.
///
/// Numbers wider than `width` are printed in full.
#[must_use]
pub fn format_voucher_number(prefix: &str, number: i64, width: u32) -> String {
    let width = usize::try_from(width).unwrap_or(usize::MAX);
    format!("{prefix}{number:0width$}")
}

/// Extracts the sequence value from a number issued with `prefix`.
#[must_use]
pub fn parse_voucher_number(prefix: &str, voucher_number: &str) -> Option<i64> {
    voucher_number.strip_prefix(prefix)?.parse().ok()
}
