//! Read-side queries over vouchers, journals and the ledger.
//!
//! Writes go through [`crate::SeaOrmPostingStore`]; nothing here mutates.

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use ledgerpost_core::posting::{Journal, Voucher};
use ledgerpost_shared::types::{AccountId, PageRequest, PageResponse, TenantId, VoucherId};

use crate::convert::{journal_from_models, voucher_from_model};
use crate::entities::{journal_details, journals, ledgers, vouchers};

/// A voucher with its journal.
#[derive(Debug, Clone)]
pub struct VoucherWithJournal {
    /// The voucher header.
    pub voucher: Voucher,
    /// Its journal; every stored voucher has one.
    pub journal: Option<Journal>,
}

/// Filter options for listing vouchers.
#[derive(Debug, Clone, Default)]
pub struct VoucherFilter {
    /// Only vouchers of this transaction type.
    pub transaction_type: Option<String>,
    /// Only posted (`true`) or draft (`false`) vouchers.
    pub is_posted: Option<bool>,
    /// Voucher date lower bound, inclusive.
    pub from_date: Option<NaiveDate>,
    /// Voucher date upper bound, inclusive.
    pub to_date: Option<NaiveDate>,
    /// Include discarded drafts.
    pub include_deleted: bool,
}

/// Voucher query repository.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    db: DatabaseConnection,
}

impl VoucherRepository {
    /// Creates a new voucher repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads a voucher and its journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_voucher(
        &self,
        tenant_id: TenantId,
        voucher_id: VoucherId,
    ) -> Result<Option<VoucherWithJournal>, DbErr> {
        let Some(voucher) = vouchers::Entity::find_by_id(voucher_id.into_inner())
            .filter(vouchers::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let journal = match journals::Entity::find()
            .filter(journals::Column::VoucherId.eq(voucher.id))
            .one(&self.db)
            .await?
        {
            Some(journal) => {
                let details = journal_details::Entity::find()
                    .filter(journal_details::Column::JournalId.eq(journal.id))
                    .order_by_asc(journal_details::Column::LineNumber)
                    .all(&self.db)
                    .await?;
                Some(journal_from_models(voucher_id, journal, details))
            }
            None => None,
        };

        Ok(Some(VoucherWithJournal {
            voucher: voucher_from_model(voucher),
            journal,
        }))
    }

    /// Vouchers raised for a business document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_reference(
        &self,
        tenant_id: TenantId,
        reference_type: &str,
        reference_id: Uuid,
    ) -> Result<Vec<Voucher>, DbErr> {
        let rows = vouchers::Entity::find()
            .filter(vouchers::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(vouchers::Column::ReferenceType.eq(reference_type))
            .filter(vouchers::Column::ReferenceId.eq(reference_id))
            .order_by_asc(vouchers::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(voucher_from_model).collect())
    }

    /// Lists vouchers, newest date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_vouchers(
        &self,
        tenant_id: TenantId,
        filter: VoucherFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<Voucher>, DbErr> {
        let mut query =
            vouchers::Entity::find().filter(vouchers::Column::TenantId.eq(tenant_id.into_inner()));

        if let Some(transaction_type) = &filter.transaction_type {
            query = query.filter(
                vouchers::Column::TransactionType.eq(transaction_type.trim().to_uppercase()),
            );
        }
        if let Some(is_posted) = filter.is_posted {
            query = query.filter(vouchers::Column::IsPosted.eq(is_posted));
        }
        if let Some(from) = filter.from_date {
            query = query.filter(vouchers::Column::VoucherDate.gte(from));
        }
        if let Some(to) = filter.to_date {
            query = query.filter(vouchers::Column::VoucherDate.lte(to));
        }
        if !filter.include_deleted {
            query = query.filter(vouchers::Column::IsDeleted.eq(false));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(vouchers::Column::VoucherDate)
            .order_by_desc(vouchers::Column::VoucherNumber)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(
            rows.into_iter().map(voucher_from_model).collect(),
            page,
            total,
        ))
    }

    /// An account's ledger rows in posting order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn account_ledger(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        page: &PageRequest,
    ) -> Result<PageResponse<ledgers::Model>, DbErr> {
        let query = ledgers::Entity::find()
            .filter(ledgers::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(ledgers::Column::AccountId.eq(account_id.into_inner()));

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_asc(ledgers::Column::AccountVersion)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }
}
