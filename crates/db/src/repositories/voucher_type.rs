//! Voucher type repository.
//!
//! A voucher type owns one numbering sequence per tenant. `last_number` is
//! only advanced by the posting transaction.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use ledgerpost_core::posting::format_voucher_number;
use ledgerpost_shared::types::{TenantId, VoucherTypeId};

use super::config::ConfigError;
use crate::entities::voucher_types;

/// Widest zero padding accepted; `i64::MAX` has 19 digits.
pub const MAX_NUMBER_WIDTH: i32 = 18;

/// Input for creating a voucher type.
#[derive(Debug, Clone)]
pub struct CreateVoucherTypeInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Code, unique within the tenant (e.g. `SALES`).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Printed before the number, e.g. `SV-`.
    pub prefix: String,
    /// Zero padding, or the configured default when `None`.
    pub number_width: Option<i32>,
}

/// Voucher type repository.
#[derive(Debug, Clone)]
pub struct VoucherTypeRepository {
    db: DatabaseConnection,
}

impl VoucherTypeRepository {
    /// Creates a new voucher type repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a voucher type whose sequence starts at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the code or prefix is blank
    /// - the width is outside `1..=18`
    /// - the code is already used by the tenant
    pub async fn create_voucher_type(
        &self,
        input: CreateVoucherTypeInput,
    ) -> Result<voucher_types::Model, ConfigError> {
        let code = input.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ConfigError::InvalidInput("voucher type code is required".into()));
        }
        if input.prefix.is_empty() {
            return Err(ConfigError::InvalidInput("voucher prefix is required".into()));
        }
        if let Some(width) = input.number_width
            && !(1..=MAX_NUMBER_WIDTH).contains(&width)
        {
            return Err(ConfigError::InvalidInput(format!(
                "number width {width} must be between 1 and {MAX_NUMBER_WIDTH}"
            )));
        }

        let existing = voucher_types::Entity::find()
            .filter(voucher_types::Column::TenantId.eq(input.tenant_id.into_inner()))
            .filter(voucher_types::Column::Code.eq(&code))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ConfigError::DuplicateCode(code));
        }

        let now = chrono::Utc::now().into();
        let voucher_type = voucher_types::ActiveModel {
            id: Set(VoucherTypeId::new().into_inner()),
            tenant_id: Set(input.tenant_id.into_inner()),
            code: Set(code),
            name: Set(input.name),
            prefix: Set(input.prefix),
            number_width: Set(input.number_width),
            last_number: Set(0),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(voucher_type.insert(&self.db).await?)
    }

    /// Finds a voucher type of the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_voucher_type(
        &self,
        tenant_id: TenantId,
        voucher_type_id: VoucherTypeId,
    ) -> Result<Option<voucher_types::Model>, ConfigError> {
        Ok(voucher_types::Entity::find_by_id(voucher_type_id.into_inner())
            .filter(voucher_types::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await?)
    }

    /// Lists the tenant's voucher types ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_voucher_types(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<voucher_types::Model>, ConfigError> {
        Ok(voucher_types::Entity::find()
            .filter(voucher_types::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(voucher_types::Column::Code)
            .all(&self.db)
            .await?)
    }

    /// The number the next posting would receive, without reserving it.
    ///
    /// # Errors
    ///
    /// Returns an error if the voucher type does not exist for the tenant.
    pub async fn peek_next_number(
        &self,
        tenant_id: TenantId,
        voucher_type_id: VoucherTypeId,
        default_width: u32,
    ) -> Result<String, ConfigError> {
        let voucher_type = self
            .find_voucher_type(tenant_id, voucher_type_id)
            .await?
            .ok_or(ConfigError::VoucherTypeNotFound(voucher_type_id.into_inner()))?;

        let width = voucher_type
            .number_width
            .and_then(|w| u32::try_from(w).ok())
            .unwrap_or(default_width);
        Ok(format_voucher_number(
            &voucher_type.prefix,
            voucher_type.last_number + 1,
            width,
        ))
    }
}
