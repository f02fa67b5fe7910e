//! Fiscal year repository.
//!
//! A tenant's fiscal years never overlap. At most one is active, and closed
//! years reject postings (see [`ledgerpost_core::fiscal::assert_open_period`]).

use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use ledgerpost_core::fiscal::{FiscalYear, date_ranges_overlap, is_valid_date_range};
use ledgerpost_shared::{AppError, ErrorCategory};
use ledgerpost_shared::types::{FiscalYearId, TenantId, UserId};

use crate::convert::fiscal_year_from_model;
use crate::entities::fiscal_years;

/// Error types for fiscal operations.
#[derive(Debug, thiserror::Error)]
pub enum FiscalError {
    /// Start date must be before end date.
    #[error("Start date must be before end date")]
    InvalidDateRange,

    /// Fiscal year overlaps with existing year.
    #[error("Fiscal year overlaps with existing year: {0}")]
    OverlappingYear(String),

    /// Name already used by the tenant.
    #[error("Fiscal year '{0}' already exists")]
    DuplicateName(String),

    /// Fiscal year not found.
    #[error("Fiscal year not found: {0}")]
    YearNotFound(Uuid),

    /// Fiscal year is already closed.
    #[error("Fiscal year is already closed: {0}")]
    AlreadyClosed(String),

    /// Fiscal year is not closed.
    #[error("Fiscal year is not closed: {0}")]
    NotClosed(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange => "INVALID_DATE_RANGE",
            Self::OverlappingYear(_) => "OVERLAPPING_FISCAL_YEAR",
            Self::DuplicateName(_) => "DUPLICATE_FISCAL_YEAR",
            Self::YearNotFound(_) => "FISCAL_YEAR_NOT_FOUND",
            Self::AlreadyClosed(_) => "FISCAL_YEAR_ALREADY_CLOSED",
            Self::NotClosed(_) => "FISCAL_YEAR_NOT_CLOSED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDateRange => ErrorCategory::Validation,
            Self::OverlappingYear(_) | Self::DuplicateName(_) => ErrorCategory::Conflict,
            Self::YearNotFound(_) => ErrorCategory::NotFound,
            Self::AlreadyClosed(_) | Self::NotClosed(_) => ErrorCategory::BusinessRule,
            Self::Database(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.category().http_status_code()
    }
}

impl From<FiscalError> for AppError {
    fn from(err: FiscalError) -> Self {
        Self::new(err.category(), err.error_code(), err.to_string())
    }
}

/// Input for creating a fiscal year.
#[derive(Debug, Clone)]
pub struct CreateFiscalYearInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Fiscal year name (e.g., "FY2026").
    pub name: String,
    /// First day of the year.
    pub start_date: NaiveDate,
    /// Last day of the year, inclusive.
    pub end_date: NaiveDate,
}

/// Validates a new year's range against the tenant's existing years.
///
/// # Errors
///
/// Returns `InvalidDateRange` or `OverlappingYear`.
pub fn validate_new_year(
    existing: &[FiscalYear],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(), FiscalError> {
    if !is_valid_date_range(start_date, end_date) {
        return Err(FiscalError::InvalidDateRange);
    }
    if let Some(clash) = existing
        .iter()
        .find(|y| date_ranges_overlap(start_date, end_date, y.start_date, y.end_date))
    {
        return Err(FiscalError::OverlappingYear(clash.name.clone()));
    }
    Ok(())
}

/// Fiscal year repository.
#[derive(Debug, Clone)]
pub struct FiscalRepository {
    db: DatabaseConnection,
}

impl FiscalRepository {
    /// Creates a new fiscal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an open, inactive fiscal year.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - start_date >= end_date
    /// - the range overlaps another year of the tenant
    /// - the name is already used
    pub async fn create_fiscal_year(
        &self,
        input: CreateFiscalYearInput,
    ) -> Result<FiscalYear, FiscalError> {
        let existing = self.list_fiscal_years(input.tenant_id).await?;
        validate_new_year(&existing, input.start_date, input.end_date)?;

        let name = input.name.trim().to_string();
        if existing.iter().any(|y| y.name == name) {
            return Err(FiscalError::DuplicateName(name));
        }

        let now = chrono::Utc::now().into();
        let year = fiscal_years::ActiveModel {
            id: Set(FiscalYearId::new().into_inner()),
            tenant_id: Set(input.tenant_id.into_inner()),
            name: Set(name),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_active: Set(false),
            is_closed: Set(false),
            closed_by: Set(None),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let year = year.insert(&self.db).await?;
        tracing::info!(
            tenant_id = %input.tenant_id,
            fiscal_year = %year.name,
            start = %year.start_date,
            end = %year.end_date,
            "Fiscal year created"
        );
        Ok(fiscal_year_from_model(year))
    }

    /// Lists the tenant's fiscal years ordered by start date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_fiscal_years(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<FiscalYear>, FiscalError> {
        let years = fiscal_years::Entity::find()
            .filter(fiscal_years::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(fiscal_years::Column::StartDate)
            .all(&self.db)
            .await?;
        Ok(years.into_iter().map(fiscal_year_from_model).collect())
    }

    /// Finds the fiscal year covering `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_covering(
        &self,
        tenant_id: TenantId,
        date: NaiveDate,
    ) -> Result<Option<FiscalYear>, FiscalError> {
        let year = fiscal_years::Entity::find()
            .filter(fiscal_years::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(fiscal_years::Column::StartDate.lte(date))
            .filter(fiscal_years::Column::EndDate.gte(date))
            .one(&self.db)
            .await?;
        Ok(year.map(fiscal_year_from_model))
    }

    /// Makes `year_id` the tenant's only active year.
    ///
    /// # Errors
    ///
    /// Returns an error if the year does not exist for the tenant.
    pub async fn activate(
        &self,
        tenant_id: TenantId,
        year_id: FiscalYearId,
    ) -> Result<FiscalYear, FiscalError> {
        let txn = self.db.begin().await?;
        let year = fiscal_years::Entity::find_by_id(year_id.into_inner())
            .filter(fiscal_years::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&txn)
            .await?
            .ok_or(FiscalError::YearNotFound(year_id.into_inner()))?;

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        fiscal_years::Entity::update_many()
            .col_expr(fiscal_years::Column::IsActive, Expr::value(false))
            .col_expr(fiscal_years::Column::UpdatedAt, Expr::value(now))
            .filter(fiscal_years::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(fiscal_years::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        let mut active: fiscal_years::ActiveModel = year.into();
        active.is_active = Set(true);
        active.updated_at = Set(now);
        let year = active.update(&txn).await?;

        txn.commit().await?;
        Ok(fiscal_year_from_model(year))
    }

    /// Closes a fiscal year. Postings dated inside it are rejected afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the year does not exist or is already closed.
    pub async fn close(
        &self,
        tenant_id: TenantId,
        year_id: FiscalYearId,
        closed_by: UserId,
    ) -> Result<FiscalYear, FiscalError> {
        let txn = self.db.begin().await?;

        // Waits for postings holding the year FOR SHARE.
        let year = fiscal_years::Entity::find_by_id(year_id.into_inner())
            .filter(fiscal_years::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(FiscalError::YearNotFound(year_id.into_inner()))?;
        if year.is_closed {
            return Err(FiscalError::AlreadyClosed(year.name));
        }

        let now = chrono::Utc::now().into();
        let mut active: fiscal_years::ActiveModel = year.into();
        active.is_closed = Set(true);
        active.closed_by = Set(Some(closed_by.into_inner()));
        active.closed_at = Set(Some(now));
        active.updated_at = Set(now);
        let year = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            fiscal_year = %year.name,
            closed_by = %closed_by,
            "Fiscal year closed"
        );
        Ok(fiscal_year_from_model(year))
    }

    /// Reopens a closed fiscal year.
    ///
    /// # Errors
    ///
    /// Returns an error if the year does not exist or is not closed.
    pub async fn reopen(
        &self,
        tenant_id: TenantId,
        year_id: FiscalYearId,
    ) -> Result<FiscalYear, FiscalError> {
        let year = self.find_model(tenant_id, year_id).await?;
        if !year.is_closed {
            return Err(FiscalError::NotClosed(year.name));
        }

        let mut active: fiscal_years::ActiveModel = year.into();
        active.is_closed = Set(false);
        active.closed_by = Set(None);
        active.closed_at = Set(None);
        active.updated_at = Set(chrono::Utc::now().into());
        let year = active.update(&self.db).await?;

        tracing::warn!(tenant_id = %tenant_id, fiscal_year = %year.name, "Fiscal year reopened");
        Ok(fiscal_year_from_model(year))
    }

    async fn find_model(
        &self,
        tenant_id: TenantId,
        year_id: FiscalYearId,
    ) -> Result<fiscal_years::Model, FiscalError> {
        fiscal_years::Entity::find_by_id(year_id.into_inner())
            .filter(fiscal_years::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await?
            .ok_or(FiscalError::YearNotFound(year_id.into_inner()))
    }
}
