//! Account repository for the chart of accounts.
//!
//! Balances and versions are owned by the posting engine; this repository
//! only creates accounts and toggles whether they accept postings.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use ledgerpost_core::ledger::AccountType;
use ledgerpost_shared::types::{AccountId, TenantId};

use super::config::ConfigError;
use crate::entities::accounts;
use crate::entities::sea_orm_active_enums::AccountType as DbAccountType;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Account code, unique within the tenant.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Asset, liability, equity, income or expense.
    pub account_type: AccountType,
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by account type.
    pub account_type: Option<AccountType>,
    /// Filter by active status.
    pub is_active: Option<bool>,
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account with a zero balance at version 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is blank or already used by the tenant.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, ConfigError> {
        let code = input.code.trim().to_string();
        if code.is_empty() {
            return Err(ConfigError::InvalidInput("account code is required".into()));
        }

        let existing = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(input.tenant_id.into_inner()))
            .filter(accounts::Column::Code.eq(&code))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ConfigError::DuplicateCode(code));
        }

        let now = chrono::Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            tenant_id: Set(input.tenant_id.into_inner()),
            code: Set(code),
            name: Set(input.name),
            account_type: Set(input.account_type.into()),
            balance: Set(Decimal::ZERO),
            version: Set(0),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(account.insert(&self.db).await?)
    }

    /// Finds an account of the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Option<accounts::Model>, ConfigError> {
        Ok(accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await?)
    }

    /// Lists the tenant's accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_accounts(
        &self,
        tenant_id: TenantId,
        filter: AccountFilter,
    ) -> Result<Vec<accounts::Model>, ConfigError> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Code);

        if let Some(account_type) = filter.account_type {
            query = query.filter(accounts::Column::AccountType.eq(DbAccountType::from(account_type)));
        }

        if let Some(is_active) = filter.is_active {
            query = query.filter(accounts::Column::IsActive.eq(is_active));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Activates or deactivates an account. Inactive accounts reject postings.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist for the tenant.
    pub async fn set_active(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        is_active: bool,
    ) -> Result<accounts::Model, ConfigError> {
        let account = self
            .find_account(tenant_id, account_id)
            .await?
            .ok_or(ConfigError::AccountNotFound(account_id.into_inner()))?;

        let mut active: accounts::ActiveModel = account.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Returns which of `account_ids` exist for the tenant.
    pub(crate) async fn existing_ids(
        &self,
        tenant_id: TenantId,
        account_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, ConfigError> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::Id.is_in(account_ids.iter().copied()))
            .all(&self.db)
            .await?;
        Ok(found.into_iter().map(|a| a.id).collect())
    }
}
