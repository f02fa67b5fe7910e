//! Ledger domain types shared by the journal builder, the ledger updater
//! and the reversal engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use ledgerpost_shared::types::AccountId;

/// Side of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    /// Debit side.
    Debit,
    /// Credit side.
    Credit,
}

impl EntryType {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }

    /// Parses an entry type, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEBIT" | "DR" => Some(Self::Debit),
            "CREDIT" | "CR" => Some(Self::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of an account in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Revenue.
    Income,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// Returns the persisted representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Parses an account type, case-insensitively. `REVENUE` is accepted for income.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ASSET" => Some(Self::Asset),
            "LIABILITY" => Some(Self::Liability),
            "EQUITY" => Some(Self::Equity),
            "INCOME" | "REVENUE" => Some(Self::Income),
            "EXPENSE" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a balanced journal.
///
/// Exactly one of `debit` / `credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Position within the journal, starting at 1.
    pub line_number: i32,
    /// Account receiving the line.
    pub account_id: AccountId,
    /// Debit amount (0 if credit).
    pub debit: Decimal,
    /// Credit amount (0 if debit).
    pub credit: Decimal,
    /// Optional narration.
    pub narration: Option<String>,
}

impl JournalLine {
    /// Creates a line on the given side.
    #[must_use]
    pub fn new(
        line_number: i32,
        account_id: AccountId,
        entry_type: EntryType,
        amount: Decimal,
        narration: Option<String>,
    ) -> Self {
        let (debit, credit) = match entry_type {
            EntryType::Debit => (amount, Decimal::ZERO),
            EntryType::Credit => (Decimal::ZERO, amount),
        };
        Self {
            line_number,
            account_id,
            debit,
            credit,
            narration,
        }
    }

    /// Returns the side this line posts to.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        if self.debit > Decimal::ZERO {
            EntryType::Debit
        } else {
            EntryType::Credit
        }
    }

    /// Returns the non-zero amount of the line.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit.max(self.credit)
    }
}

/// Debit and credit totals of a journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalTotals {
    /// Sum of debits.
    pub total_debit: Decimal,
    /// Sum of credits.
    pub total_credit: Decimal,
}

impl JournalTotals {
    /// Sums the given lines.
    #[must_use]
    pub fn of(lines: &[JournalLine]) -> Self {
        Self {
            total_debit: lines.iter().map(|l| l.debit).sum(),
            total_credit: lines.iter().map(|l| l.credit).sum(),
        }
    }

    /// Returns true when debits equal credits exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }

    /// Returns debits minus credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_debit - self.total_credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entry_type_opposite() {
        assert_eq!(EntryType::Debit.opposite(), EntryType::Credit);
        assert_eq!(EntryType::Credit.opposite(), EntryType::Debit);
    }

    #[test]
    fn test_entry_type_parse() {
        assert_eq!(EntryType::parse("debit"), Some(EntryType::Debit));
        assert_eq!(EntryType::parse(" CR "), Some(EntryType::Credit));
        assert_eq!(EntryType::parse("sideways"), None);
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!(AccountType::parse("asset"), Some(AccountType::Asset));
        assert_eq!(AccountType::parse("Revenue"), Some(AccountType::Income));
        assert_eq!(AccountType::parse("INCOME"), Some(AccountType::Income));
        assert_eq!(AccountType::parse("goodwill"), None);
        assert_eq!(AccountType::Liability.to_string(), "LIABILITY");
    }

    #[test]
    fn test_journal_line_sides() {
        let account = AccountId::new();
        let debit = JournalLine::new(1, account, EntryType::Debit, dec!(10), None);
        assert_eq!(debit.debit, dec!(10));
        assert_eq!(debit.credit, dec!(0));
        assert_eq!(debit.entry_type(), EntryType::Debit);
        assert_eq!(debit.amount(), dec!(10));

        let credit = JournalLine::new(2, account, EntryType::Credit, dec!(4.5), None);
        assert_eq!(credit.entry_type(), EntryType::Credit);
        assert_eq!(credit.amount(), dec!(4.5));
    }

    #[test]
    fn test_journal_totals() {
        let a = AccountId::new();
        let lines = vec![
            JournalLine::new(1, a, EntryType::Debit, dec!(100), None),
            JournalLine::new(2, a, EntryType::Credit, dec!(60), None),
            JournalLine::new(3, a, EntryType::Credit, dec!(40), None),
        ];
        let totals = JournalTotals::of(&lines);
        assert!(totals.is_balanced());
        assert_eq!(totals.total_debit, dec!(100));
        assert_eq!(totals.difference(), dec!(0));

        let totals = JournalTotals::of(&lines[..2]);
        assert!(!totals.is_balanced());
        assert_eq!(totals.difference(), dec!(40));
    }
}
