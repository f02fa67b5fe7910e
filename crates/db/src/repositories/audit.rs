//! Ledger reconciliation.
//!
//! Replays every account's ledger and checks it against the stored balance
//! and version, then checks every journal balances and matches its header.

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    AccessMode, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IsolationLevel, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use ledgerpost_core::ledger::{AccountType, LedgerUpdater, NormalBalance};
use ledgerpost_shared::types::TenantId;

use crate::entities::{accounts, journal_details, journals, ledgers};

/// One inconsistency found by [`AuditRepository::reconcile_tenant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// Stored balance differs from the replayed ledger.
    BalanceDrift {
        /// Account.
        account_id: Uuid,
        /// Balance on the account row.
        stored: Decimal,
        /// Balance replayed from ledger rows.
        replayed: Decimal,
    },
    /// Stored version differs from the last ledger row's version.
    VersionDrift {
        /// Account.
        account_id: Uuid,
        /// Version on the account row.
        stored: i64,
        /// Version of the last ledger row, 0 when there is none.
        ledger: i64,
    },
    /// A ledger row does not continue the previous one.
    RunningBalanceBreak {
        /// Account.
        account_id: Uuid,
        /// Version of the offending row.
        account_version: i64,
    },
    /// Journal lines do not balance.
    UnbalancedJournal {
        /// Journal.
        journal_id: Uuid,
        /// Sum of debit lines.
        debit: Decimal,
        /// Sum of credit lines.
        credit: Decimal,
    },
    /// Journal header totals differ from its lines.
    JournalTotalsMismatch {
        /// Journal.
        journal_id: Uuid,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BalanceDrift {
                account_id,
                stored,
                replayed,
            } => write!(
                f,
                "account {account_id}: stored balance {stored}, ledger replays to {replayed}"
            ),
            Self::VersionDrift {
                account_id,
                stored,
                ledger,
            } => write!(
                f,
                "account {account_id}: stored version {stored}, last ledger version {ledger}"
            ),
            Self::RunningBalanceBreak {
                account_id,
                account_version,
            } => write!(
                f,
                "account {account_id}: ledger row {account_version} breaks the running balance"
            ),
            Self::UnbalancedJournal {
                journal_id,
                debit,
                credit,
            } => write!(f, "journal {journal_id}: debits {debit} != credits {credit}"),
            Self::JournalTotalsMismatch { journal_id } => {
                write!(f, "journal {journal_id}: header totals differ from its lines")
            }
        }
    }
}

/// Result of reconciling one tenant.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    /// Accounts replayed.
    pub accounts_checked: usize,
    /// Journals checked.
    pub journals_checked: usize,
    /// Everything that did not reconcile.
    pub discrepancies: Vec<Discrepancy>,
}

impl AuditReport {
    /// True when nothing drifted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Checks one account's ledger rows, which must be ordered by version.
#[must_use]
pub fn check_account(account: &accounts::Model, rows: &[&ledgers::Model]) -> Vec<Discrepancy> {
    let account_type: AccountType = account.account_type.into();
    let side = NormalBalance::of(account_type);
    let mut found = Vec::new();

    let mut previous_balance = Decimal::ZERO;
    let mut previous_version = 0;
    for row in rows {
        let expected = previous_balance + side.balance_change(row.debit_amount, row.credit_amount);
        if row.account_version != previous_version + 1
            || row.previous_balance != previous_balance
            || row.balance != expected
        {
            found.push(Discrepancy::RunningBalanceBreak {
                account_id: account.id,
                account_version: row.account_version,
            });
        }
        previous_balance = row.balance;
        previous_version = row.account_version;
    }

    let replayed = LedgerUpdater::replay_balance(
        account_type,
        rows.iter().map(|r| (r.debit_amount, r.credit_amount)),
    );
    if replayed != account.balance {
        found.push(Discrepancy::BalanceDrift {
            account_id: account.id,
            stored: account.balance,
            replayed,
        });
    }
    if previous_version != account.version {
        found.push(Discrepancy::VersionDrift {
            account_id: account.id,
            stored: account.version,
            ledger: previous_version,
        });
    }
    found
}

/// Checks one journal against the sums of its lines.
#[must_use]
pub fn check_journal(journal: &journals::Model, debit: Decimal, credit: Decimal) -> Vec<Discrepancy> {
    let mut found = Vec::new();
    if debit != credit {
        found.push(Discrepancy::UnbalancedJournal {
            journal_id: journal.id,
            debit,
            credit,
        });
    }
    if journal.total_debit != debit || journal.total_credit != credit {
        found.push(Discrepancy::JournalTotalsMismatch {
            journal_id: journal.id,
        });
    }
    found
}

/// Ledger reconciliation repository.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Every tenant owning at least one account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn tenant_ids(&self) -> Result<Vec<TenantId>, DbErr> {
        let ids = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::TenantId)
            .distinct()
            .order_by_asc(accounts::Column::TenantId)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().map(TenantId::from_uuid).collect())
    }

    /// Reconciles every account and journal of the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn reconcile_tenant(&self, tenant_id: TenantId) -> Result<AuditReport, DbErr> {
        let tenant = tenant_id.into_inner();
        let mut report = AuditReport::default();

        // All reads share one snapshot; a posting is seen whole or not at all.
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await?;

        let accounts = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant))
            .order_by_asc(accounts::Column::Code)
            .all(&txn)
            .await?;
        let rows = ledgers::Entity::find()
            .filter(ledgers::Column::TenantId.eq(tenant))
            .order_by_asc(ledgers::Column::AccountId)
            .order_by_asc(ledgers::Column::AccountVersion)
            .all(&txn)
            .await?;

        let mut by_account: HashMap<Uuid, Vec<&ledgers::Model>> = HashMap::new();
        for row in &rows {
            by_account.entry(row.account_id).or_default().push(row);
        }

        for account in &accounts {
            let rows = by_account.get(&account.id).map_or(&[][..], Vec::as_slice);
            report.discrepancies.extend(check_account(account, rows));
        }
        report.accounts_checked = accounts.len();

        let journals = journals::Entity::find()
            .filter(journals::Column::TenantId.eq(tenant))
            .all(&txn)
            .await?;
        let sums: HashMap<Uuid, (Decimal, Decimal)> = journal_details::Entity::find()
            .select_only()
            .column(journal_details::Column::JournalId)
            .column_as(Expr::col(journal_details::Column::DebitAmount).sum(), "debit")
            .column_as(Expr::col(journal_details::Column::CreditAmount).sum(), "credit")
            .filter(journal_details::Column::TenantId.eq(tenant))
            .group_by(journal_details::Column::JournalId)
            .into_tuple::<(Uuid, Decimal, Decimal)>()
            .all(&txn)
            .await?
            .into_iter()
            .map(|(journal_id, debit, credit)| (journal_id, (debit, credit)))
            .collect();

        for journal in &journals {
            let (debit, credit) = sums
                .get(&journal.id)
                .copied()
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            report
                .discrepancies
                .extend(check_journal(journal, debit, credit));
        }
        report.journals_checked = journals.len();
        txn.commit().await?;

        if report.is_clean() {
            tracing::info!(
                tenant_id = %tenant_id,
                accounts = report.accounts_checked,
                journals = report.journals_checked,
                "Ledger reconciled"
            );
        } else {
            tracing::error!(
                tenant_id = %tenant_id,
                discrepancies = report.discrepancies.len(),
                "Ledger reconciliation found discrepancies"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::AccountType as DbAccountType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn account(balance: Decimal, version: i64) -> accounts::Model {
        let now = chrono::Utc::now().into();
        accounts::Model {
            id: Uuid::now_v7(),
            tenant_id: Uuid::now_v7(),
            code: "1100".into(),
            name: "Receivables".into(),
            account_type: DbAccountType::Asset,
            balance,
            version,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn row(
        account: &accounts::Model,
        version: i64,
        debit: Decimal,
        credit: Decimal,
        previous: Decimal,
        balance: Decimal,
    ) -> ledgers::Model {
        ledgers::Model {
            id: Uuid::now_v7(),
            tenant_id: account.tenant_id,
            account_id: account.id,
            voucher_id: Uuid::now_v7(),
            line_number: 1,
            transaction_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            debit_amount: debit,
            credit_amount: credit,
            account_version: version,
            previous_balance: previous,
            balance,
            narration: None,
            created_at: chrono::Utc::now().into(),
        }
    }

    fn journal(debit: Decimal, credit: Decimal) -> journals::Model {
        journals::Model {
            id: Uuid::now_v7(),
            tenant_id: Uuid::now_v7(),
            voucher_id: Uuid::now_v7(),
            total_debit: debit,
            total_credit: credit,
            is_balanced: debit == credit,
            created_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_consistent_chain_is_clean() {
        let acct = account(dec!(70), 2);
        let rows = [
            row(&acct, 1, dec!(100), dec!(0), dec!(0), dec!(100)),
            row(&acct, 2, dec!(0), dec!(30), dec!(100), dec!(70)),
        ];
        let refs: Vec<&ledgers::Model> = rows.iter().collect();
        assert!(check_account(&acct, &refs).is_empty());
    }

    #[test]
    fn test_untouched_account_is_clean() {
        assert!(check_account(&account(Decimal::ZERO, 0), &[]).is_empty());
    }

    #[test]
    fn test_detects_balance_and_version_drift() {
        let acct = account(dec!(90), 3);
        let rows = [row(&acct, 1, dec!(100), dec!(0), dec!(0), dec!(100))];
        let refs: Vec<&ledgers::Model> = rows.iter().collect();
        let found = check_account(&acct, &refs);
        assert!(found.contains(&Discrepancy::BalanceDrift {
            account_id: acct.id,
            stored: dec!(90),
            replayed: dec!(100),
        }));
        assert!(found.contains(&Discrepancy::VersionDrift {
            account_id: acct.id,
            stored: 3,
            ledger: 1,
        }));
    }

    #[test]
    fn test_detects_broken_chain() {
        let acct = account(dec!(150), 2);
        let rows = [
            row(&acct, 1, dec!(100), dec!(0), dec!(0), dec!(100)),
            row(&acct, 2, dec!(50), dec!(0), dec!(90), dec!(150)),
        ];
        let refs: Vec<&ledgers::Model> = rows.iter().collect();
        assert_eq!(
            check_account(&acct, &refs),
            vec![Discrepancy::RunningBalanceBreak {
                account_id: acct.id,
                account_version: 2,
            }]
        );
    }

    #[test]
    fn test_journal_checks() {
        let ok = journal(dec!(118), dec!(118));
        assert!(check_journal(&ok, dec!(118), dec!(118)).is_empty());

        let found = check_journal(&ok, dec!(118), dec!(100));
        assert_eq!(found.len(), 2);
        assert!(matches!(found[0], Discrepancy::UnbalancedJournal { .. }));
        assert!(found[1].to_string().contains("header totals"));
    }
}
