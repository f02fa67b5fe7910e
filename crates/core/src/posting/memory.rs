//! In-memory [`PostingStore`] used by the engine tests.
//!
//! One transaction at a time holds the state lock; writes go to a working
//! copy that replaces the shared state on commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use ledgerpost_shared::types::{AccountId, TenantId, UserId, VoucherId, VoucherTypeId};

use super::numbering::VoucherSequence;
use super::store::{PostingStore, PostingTx};
use super::template::TenantPostingConfig;
use super::voucher::{Journal, Voucher};
use crate::fiscal::FiscalYear;
use crate::ledger::{AccountSnapshot, LedgerEntryDraft, LedgerPosting, PostingError};
use crate::workflow::ReversalStamp;

/// A stored ledger row.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub tenant_id: TenantId,
    pub voucher_id: VoucherId,
    pub voucher_date: NaiveDate,
    pub entry: LedgerEntryDraft,
}

/// Everything the store holds.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub configs: HashMap<TenantId, TenantPostingConfig>,
    pub fiscal_years: Vec<FiscalYear>,
    pub sequences: HashMap<VoucherTypeId, VoucherSequence>,
    pub accounts: HashMap<AccountId, (TenantId, AccountSnapshot)>,
    pub vouchers: HashMap<VoucherId, Voucher>,
    pub journals: HashMap<VoucherId, Journal>,
    pub ledger: Vec<LedgerRow>,
}

impl MemoryState {
    /// Ledger rows of one account in insertion order.
    pub fn ledger_of(&self, account_id: AccountId) -> Vec<&LedgerRow> {
        self.ledger
            .iter()
            .filter(|r| r.entry.account_id == account_id)
            .collect()
    }

    /// Current snapshot of an account.
    pub fn account(&self, account_id: AccountId) -> &AccountSnapshot {
        &self.accounts[&account_id].1
    }

    /// Total rows written across vouchers, journals and the ledger.
    pub fn row_count(&self) -> usize {
        self.vouchers.len()
            + self.journals.values().map(|j| 1 + j.lines.len()).sum::<usize>()
            + self.ledger.len()
    }
}

/// Shared handle to the in-memory state plus failure injection knobs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    config_loads: Arc<AtomicUsize>,
    contention_failures: Arc<AtomicU32>,
    fail_ledger_append: Arc<AtomicBool>,
    hide_idempotency_key: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new(state: MemoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            ..Self::default()
        }
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Mutates the committed state directly.
    pub async fn update<F: FnOnce(&mut MemoryState)>(&self, f: F) {
        f(&mut *self.state.lock().await);
    }

    /// How many times `load_config` ran.
    pub fn config_loads(&self) -> usize {
        self.config_loads.load(Ordering::SeqCst)
    }

    /// Makes the next `n` calls to `begin` fail with a lock timeout.
    pub fn fail_next_begins(&self, n: u32) {
        self.contention_failures.store(n, Ordering::SeqCst);
    }

    /// Makes every `append_ledger` fail until cleared.
    pub fn set_fail_ledger_append(&self, fail: bool) {
        self.fail_ledger_append.store(fail, Ordering::SeqCst);
    }

    /// Makes the next idempotency lookup miss, as when a concurrent call
    /// commits the same key between lookup and insert.
    pub fn hide_next_idempotency_lookup(&self) {
        self.hide_idempotency_key.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    type Tx = MemoryTx;

    async fn load_config(&self, tenant_id: TenantId) -> Result<TenantPostingConfig, PostingError> {
        self.config_loads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        Ok(state.configs.get(&tenant_id).cloned().unwrap_or_default())
    }

    async fn begin(&self, tenant_id: TenantId) -> Result<MemoryTx, PostingError> {
        let pending = self.contention_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.contention_failures.store(pending - 1, Ordering::SeqCst);
            return Err(PostingError::ConcurrentModification(
                "lock timeout".into(),
            ));
        }

        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            tenant_id,
            guard,
            work,
            fail_ledger_append: self.fail_ledger_append.load(Ordering::SeqCst),
            hide_idempotency_key: Arc::clone(&self.hide_idempotency_key),
        })
    }
}

/// A transaction over [`MemoryStore`].
pub struct MemoryTx {
    tenant_id: TenantId,
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    fail_ledger_append: bool,
    hide_idempotency_key: Arc<AtomicBool>,
}

impl MemoryTx {
    fn voucher_mut(&mut self, voucher_id: VoucherId) -> Result<&mut Voucher, PostingError> {
        let tenant_id = self.tenant_id;
        self.work
            .vouchers
            .get_mut(&voucher_id)
            .filter(|v| v.tenant_id == tenant_id)
            .ok_or(PostingError::VoucherNotFound(voucher_id))
    }
}

#[async_trait]
impl PostingTx for MemoryTx {
    async fn fiscal_years_covering(
        &mut self,
        date: NaiveDate,
    ) -> Result<Vec<FiscalYear>, PostingError> {
        Ok(self
            .work
            .fiscal_years
            .iter()
            .filter(|fy| fy.tenant_id == self.tenant_id && fy.contains_date(date))
            .cloned()
            .collect())
    }

    async fn find_voucher_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<VoucherId>, PostingError> {
        if self.hide_idempotency_key.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .work
            .vouchers
            .values()
            .find(|v| v.tenant_id == self.tenant_id && v.idempotency_key.as_deref() == Some(key))
            .map(|v| v.id))
    }

    async fn next_voucher_number(
        &mut self,
        voucher_type_id: VoucherTypeId,
        default_width: u32,
    ) -> Result<String, PostingError> {
        let tenant_id = self.tenant_id;
        self.work
            .sequences
            .get_mut(&voucher_type_id)
            .filter(|s| s.tenant_id == tenant_id)
            .map(|s| s.advance(default_width))
            .ok_or(PostingError::VoucherTypeNotFound(voucher_type_id))
    }

    async fn insert_voucher(&mut self, voucher: &Voucher) -> Result<(), PostingError> {
        let clash = self.work.vouchers.values().any(|v| {
            v.tenant_id == voucher.tenant_id
                && v.voucher_type_id == voucher.voucher_type_id
                && v.voucher_number == voucher.voucher_number
        });
        if clash {
            return Err(PostingError::Database(format!(
                "duplicate voucher number {}",
                voucher.voucher_number
            )));
        }
        if let Some(key) = &voucher.idempotency_key
            && self.work.vouchers.values().any(|v| {
                v.tenant_id == voucher.tenant_id && v.idempotency_key.as_ref() == Some(key)
            })
        {
            return Err(PostingError::DuplicateIdempotencyKey(key.clone()));
        }
        self.work.vouchers.insert(voucher.id, voucher.clone());
        Ok(())
    }

    async fn insert_journal(&mut self, journal: &Journal) -> Result<(), PostingError> {
        self.work.journals.insert(journal.voucher_id, journal.clone());
        Ok(())
    }

    async fn lock_accounts(
        &mut self,
        account_ids: &[AccountId],
    ) -> Result<HashMap<AccountId, AccountSnapshot>, PostingError> {
        Ok(account_ids
            .iter()
            .filter_map(|id| self.work.accounts.get(id))
            .filter(|(tenant, _)| *tenant == self.tenant_id)
            .map(|(_, snapshot)| (snapshot.account_id, snapshot.clone()))
            .collect())
    }

    async fn append_ledger(
        &mut self,
        voucher: &Voucher,
        posting: &LedgerPosting,
    ) -> Result<(), PostingError> {
        if self.fail_ledger_append {
            return Err(PostingError::Database("injected ledger failure".into()));
        }
        for entry in &posting.entries {
            self.work.ledger.push(LedgerRow {
                tenant_id: voucher.tenant_id,
                voucher_id: voucher.id,
                voucher_date: voucher.voucher_date,
                entry: entry.clone(),
            });
        }
        for update in &posting.account_updates {
            let (_, snapshot) = self
                .work
                .accounts
                .get_mut(&update.account_id)
                .ok_or(PostingError::AccountNotFound(update.account_id))?;
            if update.version <= snapshot.version {
                return Err(PostingError::ConcurrentModification(format!(
                    "account {} moved to version {}",
                    update.account_id, snapshot.version
                )));
            }
            snapshot.balance = update.balance;
            snapshot.version = update.version;
        }
        Ok(())
    }

    async fn load_voucher_for_update(
        &mut self,
        voucher_id: VoucherId,
    ) -> Result<Option<Voucher>, PostingError> {
        Ok(self
            .work
            .vouchers
            .get(&voucher_id)
            .filter(|v| v.tenant_id == self.tenant_id)
            .cloned())
    }

    async fn load_journal(
        &mut self,
        voucher_id: VoucherId,
    ) -> Result<Option<Journal>, PostingError> {
        Ok(self.work.journals.get(&voucher_id).cloned())
    }

    async fn mark_posted(
        &mut self,
        voucher_id: VoucherId,
        posted_by: UserId,
        posted_at: DateTime<Utc>,
    ) -> Result<(), PostingError> {
        let voucher = self.voucher_mut(voucher_id)?;
        voucher.is_posted = true;
        voucher.posted_by = Some(posted_by);
        voucher.posted_at = Some(posted_at);
        Ok(())
    }

    async fn mark_reversed(
        &mut self,
        voucher_id: VoucherId,
        stamp: &ReversalStamp,
    ) -> Result<(), PostingError> {
        let voucher = self.voucher_mut(voucher_id)?;
        voucher.reversal_voucher_id = Some(stamp.reversal_voucher_id);
        voucher.reversal_reason = Some(stamp.reason.clone());
        voucher.reversed_by = Some(stamp.reversed_by);
        voucher.reversed_at = Some(stamp.reversed_at);
        Ok(())
    }

    async fn mark_discarded(
        &mut self,
        voucher_id: VoucherId,
        _discarded_by: UserId,
        _discarded_at: DateTime<Utc>,
    ) -> Result<(), PostingError> {
        self.voucher_mut(voucher_id)?.is_deleted = true;
        Ok(())
    }

    async fn commit(mut self) -> Result<(), PostingError> {
        *self.guard = self.work;
        Ok(())
    }

    async fn rollback(self) -> Result<(), PostingError> {
        Ok(())
    }
}
