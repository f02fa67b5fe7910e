//! Fiscal years and the posting period guard.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::{FiscalYearId, TenantId};

use crate::ledger::PostingError;

/// Fiscal year definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    /// Unique identifier.
    pub id: FiscalYearId,
    /// Tenant this fiscal year belongs to.
    pub tenant_id: TenantId,
    /// Year name (e.g., "FY2026"), unique per tenant.
    pub name: String,
    /// First day of the year.
    pub start_date: NaiveDate,
    /// Last day of the year, inclusive.
    pub end_date: NaiveDate,
    /// Whether this is the tenant's current year.
    pub is_active: bool,
    /// Closed years accept no postings.
    pub is_closed: bool,
}

impl FiscalYear {
    /// Returns true if the given date falls within this year.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if vouchers can be posted into this year.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.is_closed
    }
}

/// Checks that `date` falls inside an existing, non-closed fiscal year.
///
/// `years` may hold any of the tenant's fiscal years; those not covering
/// `date` are ignored.
pub fn assert_open_period(years: &[FiscalYear], date: NaiveDate) -> Result<&FiscalYear, PostingError> {
    let mut covering = years.iter().filter(|y| y.contains_date(date)).peekable();
    if covering.peek().is_none() {
        return Err(PostingError::NoFiscalYear(date));
    }
    covering
        .find(|y| y.is_open())
        .ok_or(PostingError::FiscalPeriodClosed(date))
}

/// Returns true when `start_date` is strictly before `end_date`.
#[must_use]
pub fn is_valid_date_range(start_date: NaiveDate, end_date: NaiveDate) -> bool {
    start_date < end_date
}

/// Checks if two inclusive date ranges overlap.
///
/// Two ranges [a_start, a_end] and [b_start, b_end] overlap if
/// a_start <= b_end AND a_end >= b_start.
#[must_use]
pub fn date_ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}
