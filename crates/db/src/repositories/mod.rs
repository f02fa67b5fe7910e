//! Repository abstractions for data access.
//!
//! Configuration repositories (accounts, voucher types, templates, role
//! mappings, fiscal years) write the rows the posting engine reads; the
//! voucher and audit repositories query what it wrote.

pub mod account;
pub mod account_mapping;
pub mod audit;
pub mod config;
pub mod fiscal;
pub mod template;
pub mod voucher;
pub mod voucher_type;

pub use account::{AccountFilter, AccountRepository, CreateAccountInput};
pub use account_mapping::AccountMappingRepository;
pub use audit::{AuditReport, AuditRepository, Discrepancy};
pub use config::ConfigError;
pub use fiscal::{CreateFiscalYearInput, FiscalError, FiscalRepository};
pub use template::{CreateTemplateInput, TemplateRepository, TemplateRuleInput};
pub use voucher::{VoucherFilter, VoucherRepository, VoucherWithJournal};
pub use voucher_type::{CreateVoucherTypeInput, VoucherTypeRepository};
