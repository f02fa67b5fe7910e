//! Account balance maintenance.
//!
//! Turns a balanced journal into ledger rows, carrying each account's
//! running balance and version forward line by line.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::AccountId;

use super::error::PostingError;
use super::types::{AccountType, JournalLine};

/// Which side increases an account's balance.
///
/// - Asset/Expense: balance += debit - credit
/// - Liability/Equity/Income: balance += credit - debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Debits increase the balance.
    Debit,
    /// Credits increase the balance.
    Credit,
}

impl NormalBalance {
    /// Returns the normal side of an account type.
    #[must_use]
    pub fn of(account_type: AccountType) -> Self {
        match account_type {
            AccountType::Asset | AccountType::Expense => Self::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => Self::Credit,
        }
    }

    /// Signed effect of a debit/credit pair on the balance.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Locked state of an account, as read inside the posting transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// The account.
    pub account_id: AccountId,
    /// Account classification.
    pub account_type: AccountType,
    /// Balance before the posting.
    pub balance: Decimal,
    /// Version before the posting.
    pub version: i64,
    /// Inactive accounts reject postings.
    pub is_active: bool,
}

/// Running balance information for a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Account version after this row.
    pub account_version: i64,
    /// Balance before this row.
    pub previous_balance: Decimal,
    /// Balance after this row.
    pub current_balance: Decimal,
}

impl RunningBalance {
    /// Running balance for the first row ever written to an account.
    #[must_use]
    pub fn first_entry(balance_change: Decimal) -> Self {
        Self {
            account_version: 1,
            previous_balance: Decimal::ZERO,
            current_balance: balance_change,
        }
    }

    /// Running balance following `previous`.
    #[must_use]
    pub fn next_entry(previous: &Self, balance_change: Decimal) -> Self {
        Self {
            account_version: previous.account_version + 1,
            previous_balance: previous.current_balance,
            current_balance: previous.current_balance + balance_change,
        }
    }

    /// Running balance of an account that has not been touched yet in this posting.
    #[must_use]
    pub fn opening(snapshot: &AccountSnapshot) -> Self {
        Self {
            account_version: snapshot.version,
            previous_balance: snapshot.balance,
            current_balance: snapshot.balance,
        }
    }
}

/// One ledger row to append, derived from a journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryDraft {
    /// Journal line this row mirrors.
    pub line_number: i32,
    /// Account receiving the row.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Balance before and after, plus the account version.
    pub running: RunningBalance,
    /// Narration copied from the journal line.
    pub narration: Option<String>,
}

/// Final state of an account once a posting has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// The account.
    pub account_id: AccountId,
    /// New balance.
    pub balance: Decimal,
    /// New version.
    pub version: i64,
}

/// Result of applying a journal to locked accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPosting {
    /// Rows to append, in journal line order.
    pub entries: Vec<LedgerEntryDraft>,
    /// New balance and version per touched account, ordered by account id.
    pub account_updates: Vec<AccountUpdate>,
}

/// Applies journal lines to account balances.
pub struct LedgerUpdater;

impl LedgerUpdater {
    /// Computes ledger rows for `lines` against the locked `accounts`.
    ///
    /// Lines are applied in line-number order. An account hit by several
    /// lines gets one row per line, each chained from the previous one, and
    /// its version advances once per row.
    pub fn apply(
        lines: &[JournalLine],
        accounts: &HashMap<AccountId, AccountSnapshot>,
    ) -> Result<LedgerPosting, PostingError> {
        let mut ordered: Vec<&JournalLine> = lines.iter().collect();
        ordered.sort_by_key(|l| l.line_number);

        let mut running: HashMap<AccountId, RunningBalance> = HashMap::new();
        let mut entries = Vec::with_capacity(ordered.len());

        for line in ordered {
            let snapshot = accounts
                .get(&line.account_id)
                .ok_or(PostingError::AccountNotFound(line.account_id))?;
            if !snapshot.is_active {
                return Err(PostingError::AccountInactive(line.account_id));
            }

            let change =
                NormalBalance::of(snapshot.account_type).balance_change(line.debit, line.credit);
            let previous = running
                .get(&line.account_id)
                .copied()
                .unwrap_or_else(|| RunningBalance::opening(snapshot));
            let next = RunningBalance::next_entry(&previous, change);
            running.insert(line.account_id, next);

            entries.push(LedgerEntryDraft {
                line_number: line.line_number,
                account_id: line.account_id,
                debit: line.debit,
                credit: line.credit,
                running: next,
                narration: line.narration.clone(),
            });
        }

        let mut account_updates: Vec<AccountUpdate> = running
            .into_iter()
            .map(|(account_id, rb)| AccountUpdate {
                account_id,
                balance: rb.current_balance,
                version: rb.account_version,
            })
            .collect();
        account_updates.sort_by_key(|u| u.account_id);

        Ok(LedgerPosting {
            entries,
            account_updates,
        })
    }

    /// Recomputes a balance from scratch by replaying `(debit, credit)` pairs.
    #[must_use]
    pub fn replay_balance<I>(account_type: AccountType, movements: I) -> Decimal
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        let side = NormalBalance::of(account_type);
        movements
            .into_iter()
            .map(|(debit, credit)| side.balance_change(debit, credit))
            .sum()
    }
}
