//! `SeaORM` implementation of the posting engine's storage port.
//!
//! Every [`SeaOrmTx`] is a database transaction with `lock_timeout` set
//! locally, so a posting stuck behind a row lock fails with a retryable
//! error instead of waiting indefinitely.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use ledgerpost_core::fiscal::FiscalYear;
use ledgerpost_core::ledger::{AccountSnapshot, LedgerPosting, PostingError};
use ledgerpost_core::posting::{
    Journal, PostingStore, PostingTx, TenantPostingConfig, Voucher, VoucherSequence,
};
use ledgerpost_core::workflow::ReversalStamp;
use ledgerpost_shared::PostingSettings;
use ledgerpost_shared::types::{AccountId, TenantId, UserId, VoucherId, VoucherTypeId};

use crate::convert::{
    fiscal_year_from_model, journal_from_models, mapping_from_model, snapshot_from_model,
    template_from_models, voucher_active_model, voucher_from_model,
};
use crate::entities::{
    account_type_mappings, accounts, fiscal_years, journal_details, journals, ledgers,
    transaction_template_rules, transaction_templates, voucher_types, vouchers,
};
use crate::error::{IDEMPOTENCY_CONSTRAINT, classify, is_unique_violation};

/// Posting store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct SeaOrmPostingStore {
    db: DatabaseConnection,
    lock_timeout_ms: u64,
}

impl SeaOrmPostingStore {
    /// Creates a store whose transactions wait at most `lock_timeout_ms` for a row lock.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            lock_timeout_ms,
        }
    }

    /// Creates a store using the configured lock timeout.
    #[must_use]
    pub const fn from_settings(db: DatabaseConnection, settings: &PostingSettings) -> Self {
        Self::new(db, settings.lock_timeout_ms)
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl PostingStore for SeaOrmPostingStore {
    type Tx = SeaOrmTx;

    async fn load_config(&self, tenant_id: TenantId) -> Result<TenantPostingConfig, PostingError> {
        let tenant = tenant_id.into_inner();

        let templates = transaction_templates::Entity::find()
            .filter(transaction_templates::Column::TenantId.eq(tenant))
            .order_by_asc(transaction_templates::Column::CreatedAt)
            .order_by_asc(transaction_templates::Column::Id)
            .find_with_related(transaction_template_rules::Entity)
            .all(&self.db)
            .await
            .map_err(classify)?;

        let mappings = account_type_mappings::Entity::find()
            .filter(account_type_mappings::Column::TenantId.eq(tenant))
            .all(&self.db)
            .await
            .map_err(classify)?;

        debug!(
            tenant_id = %tenant_id,
            templates = templates.len(),
            mappings = mappings.len(),
            "Loaded posting configuration rows"
        );

        Ok(TenantPostingConfig::new(
            templates
                .into_iter()
                .map(|(template, rules)| template_from_models(template, rules))
                .collect(),
            mappings.into_iter().map(mapping_from_model).collect(),
        ))
    }

    async fn begin(&self, tenant_id: TenantId) -> Result<SeaOrmTx, PostingError> {
        let txn = self.db.begin().await.map_err(classify)?;

        // SET LOCAL scopes the timeout to this transaction only
        let sql = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms);
        txn.execute_unprepared(&sql).await.map_err(classify)?;

        Ok(SeaOrmTx { txn, tenant_id })
    }
}

/// One posting transaction.
pub struct SeaOrmTx {
    txn: DatabaseTransaction,
    tenant_id: TenantId,
}

impl SeaOrmTx {
    fn tenant(&self) -> Uuid {
        self.tenant_id.into_inner()
    }

    fn expect_one(rows_affected: u64, voucher_id: VoucherId) -> Result<(), PostingError> {
        if rows_affected == 1 {
            Ok(())
        } else {
            Err(PostingError::VoucherNotFound(voucher_id))
        }
    }
}

#[async_trait]
impl PostingTx for SeaOrmTx {
    // FOR SHARE: a concurrent close waits for this posting to commit.
    async fn fiscal_years_covering(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<FiscalYear>, PostingError> {
        let years = fiscal_years::Entity::find()
            .filter(fiscal_years::Column::TenantId.eq(self.tenant()))
            .filter(fiscal_years::Column::StartDate.lte(date))
            .filter(fiscal_years::Column::EndDate.gte(date))
            .lock_shared()
            .all(&self.txn)
            .await
            .map_err(classify)?;
        Ok(years.into_iter().map(fiscal_year_from_model).collect())
    }

    async fn find_voucher_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<VoucherId>, PostingError> {
        let id: Option<Uuid> = vouchers::Entity::find()
            .select_only()
            .column(vouchers::Column::Id)
            .filter(vouchers::Column::TenantId.eq(self.tenant()))
            .filter(vouchers::Column::IdempotencyKey.eq(key))
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(classify)?;
        Ok(id.map(VoucherId::from_uuid))
    }

    async fn next_voucher_number(
        &mut self,
        voucher_type_id: VoucherTypeId,
        default_width: u32,
    ) -> Result<String, PostingError> {
        let row = voucher_types::Entity::find_by_id(voucher_type_id.into_inner())
            .filter(voucher_types::Column::TenantId.eq(self.tenant()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(classify)?
            .ok_or(PostingError::VoucherTypeNotFound(voucher_type_id))?;

        let mut sequence = VoucherSequence {
            tenant_id: self.tenant_id,
            voucher_type_id,
            prefix: row.prefix.clone(),
            number_width: row.number_width.and_then(|w| u32::try_from(w).ok()),
            last_number: row.last_number,
        };
        let number = sequence.advance(default_width);

        let mut active: voucher_types::ActiveModel = row.into();
        active.last_number = Set(sequence.last_number);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.txn).await.map_err(classify)?;

        Ok(number)
    }

    async fn insert_voucher(&mut self, voucher: &Voucher) -> Result<(), PostingError> {
        match voucher_active_model(voucher).insert(&self.txn).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err, IDEMPOTENCY_CONSTRAINT) => {
                Err(PostingError::DuplicateIdempotencyKey(
                    voucher.idempotency_key.clone().unwrap_or_default(),
                ))
            }
            Err(err) => Err(classify(err)),
        }
    }

    async fn insert_journal(&mut self, journal: &Journal) -> Result<(), PostingError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let journal_id = journal.id.into_inner();

        journals::ActiveModel {
            id: Set(journal_id),
            tenant_id: Set(self.tenant()),
            voucher_id: Set(journal.voucher_id.into_inner()),
            total_debit: Set(journal.totals.total_debit),
            total_credit: Set(journal.totals.total_credit),
            is_balanced: Set(journal.is_balanced()),
            created_at: Set(now),
        }
        .insert(&self.txn)
        .await
        .map_err(classify)?;

        if journal.lines.is_empty() {
            return Ok(());
        }
        let details = journal.lines.iter().map(|line| journal_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(self.tenant()),
            journal_id: Set(journal_id),
            line_number: Set(line.line_number),
            account_id: Set(line.account_id.into_inner()),
            debit_amount: Set(line.debit),
            credit_amount: Set(line.credit),
            narration: Set(line.narration.clone()),
            created_at: Set(now),
        });
        journal_details::Entity::insert_many(details)
            .exec(&self.txn)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn lock_accounts(
        &mut self,
        account_ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountSnapshot>, PostingError> {
        let ids: Vec<Uuid> = account_ids.iter().map(|id| id.into_inner()).collect();
        let rows = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(self.tenant()))
            .filter(accounts::Column::Id.is_in(ids))
            .order_by_asc(accounts::Column::Id)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(classify)?;

        Ok(rows
            .iter()
            .map(|row| (AccountId::from_uuid(row.id), snapshot_from_model(row)))
            .collect())
    }

    async fn append_ledger(
        &mut self,
        voucher: &Voucher,
        posting: &LedgerPosting,
    ) -> Result<(), PostingError> {
        if posting.entries.is_empty() {
            return Ok(());
        }
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let rows = posting.entries.iter().map(|entry| ledgers::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(self.tenant()),
            account_id: Set(entry.account_id.into_inner()),
            voucher_id: Set(voucher.id.into_inner()),
            line_number: Set(entry.line_number),
            transaction_date: Set(voucher.voucher_date),
            debit_amount: Set(entry.debit),
            credit_amount: Set(entry.credit),
            account_version: Set(entry.running.account_version),
            previous_balance: Set(entry.running.previous_balance),
            balance: Set(entry.running.current_balance),
            narration: Set(entry.narration.clone()),
            created_at: Set(now),
        });
        ledgers::Entity::insert_many(rows)
            .exec(&self.txn)
            .await
            .map_err(classify)?;

        for update in &posting.account_updates {
            let result = accounts::Entity::update_many()
                .col_expr(accounts::Column::Balance, Expr::value(update.balance))
                .col_expr(accounts::Column::Version, Expr::value(update.version))
                .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
                .filter(accounts::Column::Id.eq(update.account_id.into_inner()))
                .filter(accounts::Column::TenantId.eq(self.tenant()))
                .filter(accounts::Column::Version.lt(update.version))
                .exec(&self.txn)
                .await
                .map_err(classify)?;
            if result.rows_affected != 1 {
                return Err(PostingError::ConcurrentModification(format!(
                    "account {} changed while locked",
                    update.account_id
                )));
            }
        }
        Ok(())
    }

    async fn load_voucher_for_update(
        &mut self,
        voucher_id: VoucherId,
    ) -> Result<Option<Voucher>, PostingError> {
        let row = vouchers::Entity::find_by_id(voucher_id.into_inner())
            .filter(vouchers::Column::TenantId.eq(self.tenant()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(classify)?;
        Ok(row.map(voucher_from_model))
    }

    async fn load_journal(
        &mut self,
        voucher_id: VoucherId,
    ) -> Result<Option<Journal>, PostingError> {
        let Some(journal) = journals::Entity::find()
            .filter(journals::Column::VoucherId.eq(voucher_id.into_inner()))
            .filter(journals::Column::TenantId.eq(self.tenant()))
            .one(&self.txn)
            .await
            .map_err(classify)?
        else {
            return Ok(None);
        };

        let details = journal_details::Entity::find()
            .filter(journal_details::Column::JournalId.eq(journal.id))
            .order_by_asc(journal_details::Column::LineNumber)
            .all(&self.txn)
            .await
            .map_err(classify)?;

        Ok(Some(journal_from_models(voucher_id, journal, details)))
    }

    async fn mark_posted(
        &mut self,
        voucher_id: VoucherId,
        posted_by: UserId,
        posted_at: DateTime<Utc>,
    ) -> Result<(), PostingError> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = posted_at.into();
        let result = vouchers::Entity::update_many()
            .col_expr(vouchers::Column::IsPosted, Expr::value(true))
            .col_expr(vouchers::Column::PostedBy, Expr::value(posted_by.into_inner()))
            .col_expr(vouchers::Column::PostedAt, Expr::value(at))
            .col_expr(vouchers::Column::UpdatedAt, Expr::value(at))
            .filter(vouchers::Column::Id.eq(voucher_id.into_inner()))
            .filter(vouchers::Column::TenantId.eq(self.tenant()))
            .filter(vouchers::Column::IsPosted.eq(false))
            .exec(&self.txn)
            .await
            .map_err(classify)?;
        Self::expect_one(result.rows_affected, voucher_id)
    }

    async fn mark_reversed(
        &mut self,
        voucher_id: VoucherId,
        stamp: &ReversalStamp,
    ) -> Result<(), PostingError> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = stamp.reversed_at.into();
        let result = vouchers::Entity::update_many()
            .col_expr(
                vouchers::Column::ReversalVoucherId,
                Expr::value(stamp.reversal_voucher_id.into_inner()),
            )
            .col_expr(vouchers::Column::ReversalReason, Expr::value(stamp.reason.clone()))
            .col_expr(
                vouchers::Column::ReversedBy,
                Expr::value(stamp.reversed_by.into_inner()),
            )
            .col_expr(vouchers::Column::ReversedAt, Expr::value(at))
            .col_expr(vouchers::Column::UpdatedAt, Expr::value(at))
            .filter(vouchers::Column::Id.eq(voucher_id.into_inner()))
            .filter(vouchers::Column::TenantId.eq(self.tenant()))
            .filter(vouchers::Column::ReversalVoucherId.is_null())
            .exec(&self.txn)
            .await
            .map_err(classify)?;
        Self::expect_one(result.rows_affected, voucher_id)
    }

    async fn mark_discarded(
        &mut self,
        voucher_id: VoucherId,
        discarded_by: UserId,
        discarded_at: DateTime<Utc>,
    ) -> Result<(), PostingError> {
        let at: sea_orm::prelude::DateTimeWithTimeZone = discarded_at.into();
        let result = vouchers::Entity::update_many()
            .col_expr(vouchers::Column::IsDeleted, Expr::value(true))
            .col_expr(vouchers::Column::DeletedBy, Expr::value(discarded_by.into_inner()))
            .col_expr(vouchers::Column::DeletedAt, Expr::value(at))
            .col_expr(vouchers::Column::UpdatedAt, Expr::value(at))
            .filter(vouchers::Column::Id.eq(voucher_id.into_inner()))
            .filter(vouchers::Column::TenantId.eq(self.tenant()))
            .filter(vouchers::Column::IsPosted.eq(false))
            .exec(&self.txn)
            .await
            .map_err(classify)?;
        Self::expect_one(result.rows_affected, voucher_id)
    }

    async fn commit(self) -> Result<(), PostingError> {
        self.txn.commit().await.map_err(classify)
    }

    async fn rollback(self) -> Result<(), PostingError> {
        self.txn.rollback().await.map_err(classify)
    }
}
