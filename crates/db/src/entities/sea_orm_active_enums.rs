//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `account_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    /// Asset.
    #[sea_orm(string_value = "ASSET")]
    Asset,
    /// Liability.
    #[sea_orm(string_value = "LIABILITY")]
    Liability,
    /// Equity.
    #[sea_orm(string_value = "EQUITY")]
    Equity,
    /// Income.
    #[sea_orm(string_value = "INCOME")]
    Income,
    /// Expense.
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
}

/// `entry_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_type")]
pub enum EntryType {
    /// Debit.
    #[sea_orm(string_value = "DEBIT")]
    Debit,
    /// Credit.
    #[sea_orm(string_value = "CREDIT")]
    Credit,
}

impl From<AccountType> for ledgerpost_core::ledger::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Income => Self::Income,
            AccountType::Expense => Self::Expense,
        }
    }
}

impl From<ledgerpost_core::ledger::AccountType> for AccountType {
    fn from(value: ledgerpost_core::ledger::AccountType) -> Self {
        use ledgerpost_core::ledger::AccountType as Core;
        match value {
            Core::Asset => Self::Asset,
            Core::Liability => Self::Liability,
            Core::Equity => Self::Equity,
            Core::Income => Self::Income,
            Core::Expense => Self::Expense,
        }
    }
}

impl From<EntryType> for ledgerpost_core::ledger::EntryType {
    fn from(value: EntryType) -> Self {
        match value {
            EntryType::Debit => Self::Debit,
            EntryType::Credit => Self::Credit,
        }
    }
}

impl From<ledgerpost_core::ledger::EntryType> for EntryType {
    fn from(value: ledgerpost_core::ledger::EntryType) -> Self {
        match value {
            ledgerpost_core::ledger::EntryType::Debit => Self::Debit,
            ledgerpost_core::ledger::EntryType::Credit => Self::Credit,
        }
    }
}
