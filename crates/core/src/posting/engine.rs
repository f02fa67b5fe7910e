//! Posting orchestrator.
//!
//! Sequences template resolution, amount evaluation, the journal builder,
//! the fiscal guard, voucher numbering and the ledger updater inside a
//! single [`PostingTx`]. Either every row of a posting is written or none is.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use ledgerpost_shared::PostingSettings;
use ledgerpost_shared::types::{
    AccountId, JournalId, TemplateId, TenantId, UserId, VoucherId, VoucherTypeId,
};

use super::cache::TenantConfigCache;
use super::journal::{JournalBuilder, JournalDraft, RuleEvaluation, evaluate_rules};
use super::request::{PostingOutcome, PostingPreview, PostingRequest, ReverseRequest};
use super::store::{PostingStore, PostingTx};
use super::template::{
    AccountResolver, TenantPostingConfig, TransactionTemplate, normalize_module,
    normalize_transaction_type,
};
use super::voucher::{Journal, Voucher};
use crate::fiscal::assert_open_period;
use crate::ledger::{JournalLine, LedgerUpdater, PostingError};
use crate::workflow::{ReversalService, ReversalStamp, VoucherLifecycle};

/// Everything computed before the transaction starts.
struct PostingPlan {
    template_id: TemplateId,
    template_code: String,
    voucher_type_id: VoucherTypeId,
    evaluations: Vec<RuleEvaluation>,
    journal: JournalDraft,
}

/// The public entry point: posts, approves, discards and reverses vouchers.
pub struct PostingEngine<S> {
    store: S,
    cache: TenantConfigCache,
    builder: JournalBuilder,
    settings: PostingSettings,
}

impl<S: PostingStore> PostingEngine<S> {
    /// Creates an engine with its own configuration cache.
    #[must_use]
    pub fn new(store: S, settings: PostingSettings) -> Self {
        let cache = TenantConfigCache::from_settings(&settings);
        Self::with_cache(store, cache, settings)
    }

    /// Creates an engine sharing `cache` with configuration writers.
    #[must_use]
    pub fn with_cache(store: S, cache: TenantConfigCache, settings: PostingSettings) -> Self {
        Self {
            store,
            cache,
            builder: JournalBuilder::new(settings.round_off_tolerance),
            settings,
        }
    }

    /// The configuration cache; hand it to writers as their invalidation hook.
    pub fn cache(&self) -> &TenantConfigCache {
        &self.cache
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the tenant's configuration, loading it on a cache miss.
    pub async fn tenant_config(
        &self,
        tenant_id: TenantId,
    ) -> Result<Arc<TenantPostingConfig>, PostingError> {
        if let Some(config) = self.cache.get(tenant_id) {
            return Ok(config);
        }
        let generation = self.cache.generation();
        let config = self.store.load_config(tenant_id).await?;
        debug!(
            tenant_id = %tenant_id,
            templates = config.template_count(),
            mappings = config.mapping_count(),
            "Loaded posting configuration"
        );
        Ok(self.cache.insert_if_current(tenant_id, config, generation))
    }

    /// Returns the active template for a transaction type.
    pub async fn resolve_template(
        &self,
        tenant_id: TenantId,
        transaction_type: &str,
    ) -> Result<TransactionTemplate, PostingError> {
        let config = self.tenant_config(tenant_id).await?;
        config.resolve_template(transaction_type).cloned()
    }

    /// Resolves an account role for a tenant and optional module.
    pub async fn resolve_account(
        &self,
        tenant_id: TenantId,
        role: &str,
        module: Option<&str>,
    ) -> Result<AccountId, PostingError> {
        let config = self.tenant_config(tenant_id).await?;
        config.resolve_account(role, module)
    }

    /// Computes the journal a request would post, without writing anything.
    pub async fn preview(&self, request: &PostingRequest) -> Result<PostingPreview, PostingError> {
        let plan = self.plan(request).await?;

        let mut tx = self.store.begin(request.tenant_id).await?;
        let years = tx.fiscal_years_covering(request.transaction_date).await?;
        let guard = assert_open_period(&years, request.transaction_date).map(|_| ());
        tx.rollback().await?;
        guard?;

        Ok(PostingPreview {
            template_id: plan.template_id,
            template_code: plan.template_code,
            voucher_type_id: plan.voucher_type_id,
            evaluations: plan.evaluations,
            journal: plan.journal,
            base_currency_amount: request.base_currency_amount(),
        })
    }

    /// Posts a business transaction.
    ///
    /// Creates one voucher, one journal, one detail per non-zero rule and,
    /// unless the request is held for approval, one ledger row and balance
    /// update per detail.
    pub async fn post(&self, request: &PostingRequest) -> Result<PostingOutcome, PostingError> {
        let plan = self.plan(request).await?;

        match self
            .with_retry("post", || self.post_once(request, &plan))
            .await
        {
            Err(PostingError::DuplicateIdempotencyKey(key)) => {
                self.replay(request.tenant_id, &key).await
            }
            other => other,
        }
    }

    /// Posts a draft created with `hold_for_approval`.
    pub async fn approve_draft(
        &self,
        tenant_id: TenantId,
        voucher_id: VoucherId,
        approved_by: UserId,
    ) -> Result<(), PostingError> {
        self.with_retry("approve_draft", || {
            self.approve_once(tenant_id, voucher_id, approved_by)
        })
        .await
    }

    /// Soft-deletes a draft created with `hold_for_approval`.
    pub async fn discard_draft(
        &self,
        tenant_id: TenantId,
        voucher_id: VoucherId,
        discarded_by: UserId,
    ) -> Result<(), PostingError> {
        let mut tx = self.store.begin(tenant_id).await?;
        let voucher = tx
            .load_voucher_for_update(voucher_id)
            .await?
            .ok_or(PostingError::VoucherNotFound(voucher_id))?;
        VoucherLifecycle::discard(&voucher)?;
        tx.mark_discarded(voucher_id, discarded_by, Utc::now())
            .await?;
        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            voucher_id = %voucher_id,
            voucher_number = %voucher.voucher_number,
            "Draft voucher discarded"
        );
        Ok(())
    }

    /// Reverses a posted voucher with a new voucher carrying the swapped journal.
    pub async fn reverse(&self, request: &ReverseRequest) -> Result<VoucherId, PostingError> {
        if request.reason.trim().is_empty() {
            return Err(PostingError::ReversalReasonRequired);
        }
        self.with_retry("reverse", || self.reverse_once(request))
            .await
    }

    async fn plan(&self, request: &PostingRequest) -> Result<PostingPlan, PostingError> {
        request.validate()?;

        let config = self.tenant_config(request.tenant_id).await?;
        let template = config.resolve_template(&request.transaction_type)?;
        let rules = template.compile(config.as_ref(), request.module.as_deref())?;
        let evaluations = evaluate_rules(&rules, &request.facts)?;

        let journal = match self.builder.build(&evaluations) {
            Ok(journal) => journal,
            Err(err) => {
                if let PostingError::UnbalancedPosting { debit, credit } = &err {
                    error!(
                        tenant_id = %request.tenant_id,
                        transaction_type = %request.transaction_type,
                        template = %template.code,
                        reference_id = %request.reference.reference_id,
                        debit = %debit,
                        credit = %credit,
                        trace = ?evaluations,
                        "Unbalanced posting rejected"
                    );
                }
                return Err(err);
            }
        };

        Ok(PostingPlan {
            template_id: template.id,
            template_code: template.code.clone(),
            voucher_type_id: template.voucher_type_id,
            evaluations,
            journal,
        })
    }

    async fn post_once(
        &self,
        request: &PostingRequest,
        plan: &PostingPlan,
    ) -> Result<PostingOutcome, PostingError> {
        let mut tx = self.store.begin(request.tenant_id).await?;

        if let Some(key) = &request.idempotency_key
            && let Some(existing) = tx.find_voucher_by_idempotency_key(key).await?
        {
            tx.rollback().await?;
            warn!(
                tenant_id = %request.tenant_id,
                voucher_id = %existing,
                idempotency_key = %key,
                "Idempotency key already used, returning existing voucher"
            );
            return Ok(PostingOutcome {
                voucher_id: existing,
                replayed: true,
            });
        }

        let years = tx.fiscal_years_covering(request.transaction_date).await?;
        assert_open_period(&years, request.transaction_date)?;

        let voucher_number = tx
            .next_voucher_number(plan.voucher_type_id, self.settings.default_number_width)
            .await?;

        let now = Utc::now();
        let posted = !request.hold_for_approval;
        let voucher = Voucher {
            id: VoucherId::new(),
            tenant_id: request.tenant_id,
            voucher_number,
            voucher_type_id: plan.voucher_type_id,
            voucher_date: request.transaction_date,
            transaction_type: normalize_transaction_type(&request.transaction_type),
            template_id: Some(plan.template_id),
            module: normalize_module(request.module.as_deref()),
            reference: request.reference.clone(),
            total_amount: request.facts.total_amount,
            currency_id: request.currency_id,
            exchange_rate: request.exchange_rate,
            base_currency_amount: request.base_currency_amount(),
            narration: request.narration.clone(),
            is_posted: posted,
            is_deleted: false,
            is_reversal: false,
            reversed_voucher_id: None,
            reversal_voucher_id: None,
            reversal_reason: None,
            reversed_at: None,
            reversed_by: None,
            idempotency_key: request.idempotency_key.clone(),
            created_by: request.created_by,
            created_at: now,
            posted_by: posted.then_some(request.created_by),
            posted_at: posted.then_some(now),
        };
        tx.insert_voucher(&voucher).await?;

        let journal = Journal {
            id: JournalId::new(),
            voucher_id: voucher.id,
            totals: plan.journal.totals,
            lines: plan.journal.lines.clone(),
        };
        tx.insert_journal(&journal).await?;

        if posted {
            Self::apply_to_ledger(&mut tx, &voucher, &journal.lines).await?;
        }

        tx.commit().await?;

        info!(
            tenant_id = %voucher.tenant_id,
            voucher_id = %voucher.id,
            voucher_number = %voucher.voucher_number,
            transaction_type = %voucher.transaction_type,
            template = %plan.template_code,
            lines = journal.lines.len(),
            total = %journal.totals.total_debit,
            draft = !posted,
            "Voucher posted"
        );

        Ok(PostingOutcome {
            voucher_id: voucher.id,
            replayed: false,
        })
    }

    async fn approve_once(
        &self,
        tenant_id: TenantId,
        voucher_id: VoucherId,
        approved_by: UserId,
    ) -> Result<(), PostingError> {
        let mut tx = self.store.begin(tenant_id).await?;
        let voucher = tx
            .load_voucher_for_update(voucher_id)
            .await?
            .ok_or(PostingError::VoucherNotFound(voucher_id))?;
        VoucherLifecycle::approve(&voucher)?;

        let years = tx.fiscal_years_covering(voucher.voucher_date).await?;
        assert_open_period(&years, voucher.voucher_date)?;

        let journal = tx.load_journal(voucher_id).await?.ok_or_else(|| {
            PostingError::Internal(format!("voucher {voucher_id} has no journal"))
        })?;
        Self::apply_to_ledger(&mut tx, &voucher, &journal.lines).await?;
        tx.mark_posted(voucher_id, approved_by, Utc::now()).await?;
        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            voucher_id = %voucher_id,
            voucher_number = %voucher.voucher_number,
            approved_by = %approved_by,
            "Draft voucher approved and posted"
        );
        Ok(())
    }

    async fn reverse_once(&self, request: &ReverseRequest) -> Result<VoucherId, PostingError> {
        let mut tx = self.store.begin(request.tenant_id).await?;
        let original = tx
            .load_voucher_for_update(request.voucher_id)
            .await?
            .ok_or(PostingError::VoucherNotFound(request.voucher_id))?;
        VoucherLifecycle::reverse(&original)?;

        let journal = tx.load_journal(original.id).await?.ok_or_else(|| {
            PostingError::Internal(format!("voucher {} has no journal", original.id))
        })?;
        let output = ReversalService::create_reversing_entries(
            &original.voucher_number,
            &journal.lines,
            &request.reason,
        )?;

        let reversal_date = request.reversal_date.unwrap_or(original.voucher_date);
        let years = tx.fiscal_years_covering(reversal_date).await?;
        assert_open_period(&years, reversal_date)?;

        let voucher_number = tx
            .next_voucher_number(original.voucher_type_id, self.settings.default_number_width)
            .await?;

        let now = Utc::now();
        let reversal = Voucher {
            id: VoucherId::new(),
            tenant_id: original.tenant_id,
            voucher_number,
            voucher_type_id: original.voucher_type_id,
            voucher_date: reversal_date,
            transaction_type: original.transaction_type.clone(),
            template_id: original.template_id,
            module: original.module.clone(),
            reference: original.reference.clone(),
            total_amount: original.total_amount,
            currency_id: original.currency_id,
            exchange_rate: original.exchange_rate,
            base_currency_amount: original.base_currency_amount,
            narration: Some(output.narration),
            is_posted: true,
            is_deleted: false,
            is_reversal: true,
            reversed_voucher_id: Some(original.id),
            reversal_voucher_id: None,
            reversal_reason: None,
            reversed_at: None,
            reversed_by: None,
            idempotency_key: None,
            created_by: request.performed_by,
            created_at: now,
            posted_by: Some(request.performed_by),
            posted_at: Some(now),
        };
        tx.insert_voucher(&reversal).await?;

        let reversal_journal = Journal {
            id: JournalId::new(),
            voucher_id: reversal.id,
            totals: output.totals,
            lines: output.lines,
        };
        tx.insert_journal(&reversal_journal).await?;
        Self::apply_to_ledger(&mut tx, &reversal, &reversal_journal.lines).await?;

        let stamp = ReversalStamp {
            reversal_voucher_id: reversal.id,
            reason: request.reason.clone(),
            reversed_by: request.performed_by,
            reversed_at: now,
        };
        tx.mark_reversed(original.id, &stamp).await?;
        tx.commit().await?;

        info!(
            tenant_id = %request.tenant_id,
            original_voucher = %original.voucher_number,
            reversal_voucher = %reversal.voucher_number,
            reason = %request.reason,
            "Voucher reversed"
        );
        Ok(reversal.id)
    }

    async fn apply_to_ledger(
        tx: &mut S::Tx,
        voucher: &Voucher,
        lines: &[JournalLine],
    ) -> Result<(), PostingError> {
        let mut account_ids: Vec<AccountId> = lines.iter().map(|l| l.account_id).collect();
        account_ids.sort_unstable();
        account_ids.dedup();

        let accounts = tx.lock_accounts(&account_ids).await?;
        let posting = LedgerUpdater::apply(lines, &accounts)?;
        tx.append_ledger(voucher, &posting).await
    }

    async fn replay(&self, tenant_id: TenantId, key: &str) -> Result<PostingOutcome, PostingError> {
        let mut tx = self.store.begin(tenant_id).await?;
        let existing = tx.find_voucher_by_idempotency_key(key).await?;
        tx.rollback().await?;

        let voucher_id = existing.ok_or_else(|| {
            PostingError::Internal(format!(
                "idempotency key '{key}' conflicted but no voucher carries it"
            ))
        })?;
        warn!(
            tenant_id = %tenant_id,
            voucher_id = %voucher_id,
            idempotency_key = %key,
            "Lost idempotency race, returning winner's voucher"
        );
        Ok(PostingOutcome {
            voucher_id,
            replayed: true,
        })
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt_once: F,
    ) -> Result<T, PostingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PostingError>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match attempt_once().await {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Contention detected, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
