//! Account role mapping repository.
//!
//! A mapping binds an account role, optionally narrowed to a business
//! module, to one account. At most one mapping exists per
//! (role, module) and per role without a module.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Select, Set,
};

use ledgerpost_core::posting::{
    AccountRoleMapping, ConfigInvalidation, normalize_module, normalize_role,
};
use ledgerpost_shared::types::{AccountId, TenantId};

use super::account::AccountRepository;
use super::config::{ConfigError, InvalidationHook};
use crate::convert::mapping_from_model;
use crate::entities::account_type_mappings;

/// Account role mapping repository.
#[derive(Debug, Clone)]
pub struct AccountMappingRepository {
    db: DatabaseConnection,
    invalidation: InvalidationHook,
}

impl AccountMappingRepository {
    /// Creates a new mapping repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            invalidation: InvalidationHook::default(),
        }
    }

    /// Evicts the tenant's cached posting configuration after every write.
    #[must_use]
    pub fn with_invalidation(mut self, hook: Arc<dyn ConfigInvalidation>) -> Self {
        self.invalidation = InvalidationHook::new(hook);
        self
    }

    /// Maps `role` (for `module`, or tenant-wide) to `account_id`, replacing
    /// any previous mapping for the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if the role is blank or the account does not exist.
    pub async fn upsert_mapping(
        &self,
        tenant_id: TenantId,
        role: &str,
        module: Option<&str>,
        account_id: AccountId,
    ) -> Result<AccountRoleMapping, ConfigError> {
        let role = normalize_role(role);
        if role.is_empty() {
            return Err(ConfigError::InvalidInput("account role is required".into()));
        }
        let module = normalize_module(module);

        AccountRepository::new(self.db.clone())
            .find_account(tenant_id, account_id)
            .await?
            .ok_or(ConfigError::AccountNotFound(account_id.into_inner()))?;

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let existing = keyed(tenant_id, &role, module.as_deref())
            .one(&self.db)
            .await?;

        let saved = if let Some(existing) = existing {
            let mut active: account_type_mappings::ActiveModel = existing.into();
            active.account_id = Set(account_id.into_inner());
            active.updated_at = Set(now);
            active.update(&self.db).await?
        } else {
            account_type_mappings::ActiveModel {
                id: Set(uuid::Uuid::now_v7()),
                tenant_id: Set(tenant_id.into_inner()),
                account_type: Set(role),
                module: Set(module),
                account_id: Set(account_id.into_inner()),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&self.db)
            .await?
        };

        self.invalidation.fire(tenant_id);
        Ok(mapping_from_model(saved))
    }

    /// Removes the mapping for `role` and `module`.
    ///
    /// # Errors
    ///
    /// Returns an error if no such mapping exists.
    pub async fn remove_mapping(
        &self,
        tenant_id: TenantId,
        role: &str,
        module: Option<&str>,
    ) -> Result<(), ConfigError> {
        let role = normalize_role(role);
        let module = normalize_module(module);

        let existing = keyed(tenant_id, &role, module.as_deref())
            .one(&self.db)
            .await?
            .ok_or_else(|| ConfigError::MappingNotFound {
                role: role.clone(),
                module: module.clone(),
            })?;

        account_type_mappings::Entity::delete_by_id(existing.id)
            .exec(&self.db)
            .await?;

        self.invalidation.fire(tenant_id);
        Ok(())
    }

    /// Lists the tenant's mappings ordered by role then module.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_mappings(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<AccountRoleMapping>, ConfigError> {
        let rows = account_type_mappings::Entity::find()
            .filter(account_type_mappings::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(account_type_mappings::Column::AccountType)
            .order_by_asc(account_type_mappings::Column::Module)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(mapping_from_model).collect())
    }
}

fn keyed(
    tenant_id: TenantId,
    role: &str,
    module: Option<&str>,
) -> Select<account_type_mappings::Entity> {
    let query = account_type_mappings::Entity::find()
        .filter(account_type_mappings::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(account_type_mappings::Column::AccountType.eq(role));
    match module {
        Some(module) => query.filter(account_type_mappings::Column::Module.eq(module)),
        None => query.filter(account_type_mappings::Column::Module.is_null()),
    }
}
