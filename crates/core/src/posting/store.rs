//! Storage port of the posting engine.
//!
//! The engine never talks to a database directly. It asks a
//! [`PostingStore`] for a tenant's configuration and for a unit of work
//! ([`PostingTx`]) in which every read and write of one call happens.
//! Dropping a transaction without committing rolls it back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use ledgerpost_shared::types::{AccountId, TenantId, UserId, VoucherId, VoucherTypeId};

use super::template::TenantPostingConfig;
use super::voucher::{Journal, Voucher};
use crate::fiscal::FiscalYear;
use crate::ledger::{AccountSnapshot, LedgerPosting, PostingError};
use crate::workflow::ReversalStamp;

/// Source of tenant configuration and posting transactions.
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Unit of work handed out by [`PostingStore::begin`].
    type Tx: PostingTx;

    /// Loads the tenant's templates (in stable order, oldest first) and role mappings.
    async fn load_config(&self, tenant_id: TenantId) -> Result<TenantPostingConfig, PostingError>;

    /// Starts a transaction scoped to one tenant.
    async fn begin(&self, tenant_id: TenantId) -> Result<Self::Tx, PostingError>;
}

/// One atomic unit of work, scoped to the tenant it was started for.
///
/// Implementations take row locks where noted and hold them until
/// commit or rollback. Lock order across all operations is: voucher row,
/// covering fiscal years (shared), voucher type row, then accounts in
/// ascending id order.
#[async_trait]
pub trait PostingTx: Send {
    /// Fiscal years whose range contains `date`, held against a concurrent
    /// close until the transaction ends.
    async fn fiscal_years_covering(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<FiscalYear>, PostingError>;

    /// Voucher previously posted with this idempotency key, if any.
    async fn find_voucher_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<VoucherId>, PostingError>;

    /// Locks the voucher type's sequence row, advances it and returns the formatted number.
    async fn next_voucher_number(
        &mut self,
        voucher_type_id: VoucherTypeId,
        default_width: u32,
    ) -> Result<String, PostingError>;

    /// Inserts a voucher header.
    async fn insert_voucher(&mut self, voucher: &Voucher) -> Result<(), PostingError>;

    /// Inserts a journal and its lines.
    async fn insert_journal(&mut self, journal: &Journal) -> Result<(), PostingError>;

    /// Locks the given accounts, in the order given, and returns their state.
    ///
    /// Accounts that do not exist for the tenant are absent from the map.
    async fn lock_accounts(
        &mut self,
        account_ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountSnapshot>, PostingError>;

    /// Appends ledger rows for `voucher` and writes the new account balances.
    async fn append_ledger(
        &mut self,
        voucher: &Voucher,
        posting: &LedgerPosting,
    ) -> Result<(), PostingError>;

    /// Loads a voucher, locking its row.
    async fn load_voucher_for_update(
        &mut self,
        voucher_id: VoucherId,
    ) -> Result<Option<Voucher>, PostingError>;

    /// Loads a voucher's journal with its lines.
    async fn load_journal(&mut self, voucher_id: VoucherId)
    -> Result<Option<Journal>, PostingError>;

    /// Marks a draft as posted.
    async fn mark_posted(
        &mut self,
        voucher_id: VoucherId,
        posted_by: UserId,
        posted_at: DateTime<Utc>,
    ) -> Result<(), PostingError>;

    /// Links an original voucher to its reversal and stamps the reason.
    async fn mark_reversed(
        &mut self,
        voucher_id: VoucherId,
        stamp: &ReversalStamp,
    ) -> Result<(), PostingError>;

    /// Soft-deletes a draft.
    async fn mark_discarded(
        &mut self,
        voucher_id: VoucherId,
        discarded_by: UserId,
        discarded_at: DateTime<Utc>,
    ) -> Result<(), PostingError>;

    /// Commits every write made in this transaction.
    async fn commit(self) -> Result<(), PostingError>;

    /// Discards every write made in this transaction.
    async fn rollback(self) -> Result<(), PostingError>;
}
