//! `SeaORM` entity definitions.

pub mod accounts;
pub mod account_type_mappings;
pub mod fiscal_years;
pub mod journal_details;
pub mod journals;
pub mod ledgers;
pub mod sea_orm_active_enums;
pub mod transaction_template_rules;
pub mod transaction_templates;
pub mod voucher_types;
pub mod vouchers;
