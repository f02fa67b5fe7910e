//! Common types used across the application.

pub mod amount;
pub mod id;
pub mod pagination;

pub use amount::{
    AMOUNT_SCALE, MAX_STORED_AMOUNT, convert_to_base, is_at_stored_precision,
    is_within_stored_range, round_amount,
};
pub use id::*;
pub use pagination::{PageMeta, PageRequest, PageResponse};
