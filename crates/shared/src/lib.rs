//! Shared types, errors, and configuration for Ledgerpost.
//!
//! This crate provides common types used across all other crates:
//! - Amount precision helpers (4 fractional digits, banker's rounding)
//! - Typed IDs for type-safe entity references
//! - Pagination types for ledger listings
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, PostingSettings};
pub use error::{AppError, AppResult, ErrorCategory};
