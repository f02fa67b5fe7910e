//! Fiscal year management and the posting period guard.

pub mod year;

pub use year::{FiscalYear, assert_open_period, date_ranges_overlap, is_valid_date_range};
