//! Transaction template repository.
//!
//! Templates are written as a whole (header plus rules) and validated with
//! the same rules the posting engine applies when it compiles them, so a
//! template that saves is a template that resolves.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use ledgerpost_core::ledger::EntryType;
use ledgerpost_core::posting::{
    ConfigInvalidation, RuleTarget, TemplateRule, TransactionTemplate, normalize_role,
    normalize_transaction_type,
};
use ledgerpost_shared::types::{
    AccountId, TemplateId, TemplateRuleId, TenantId, VoucherTypeId,
};

use super::account::AccountRepository;
use super::config::{ConfigError, InvalidationHook};
use crate::convert::template_from_models;
use crate::entities::{transaction_template_rules, transaction_templates, voucher_types};

/// One rule of a template being created.
#[derive(Debug, Clone)]
pub struct TemplateRuleInput {
    /// Posting order, unique within the template.
    pub line_number: i32,
    /// Role resolved through the account mappings.
    pub account_role: Option<String>,
    /// Direct account; exclusive with `account_role`.
    pub account_id: Option<AccountId>,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Amount selector, e.g. `TOTAL` or `PERCENTAGE_OF_TOTAL`.
    pub amount_source: String,
    /// Percentage for percentage selectors.
    pub percentage: Option<Decimal>,
    /// Narration copied to the journal line.
    pub narration: Option<String>,
}

/// Input for creating a template.
#[derive(Debug, Clone)]
pub struct CreateTemplateInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Code, unique within the tenant (e.g. `SO_POST`).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Transaction type the template posts.
    pub transaction_type: String,
    /// Voucher type numbering the produced vouchers.
    pub voucher_type_id: VoucherTypeId,
    /// Rules in any order.
    pub rules: Vec<TemplateRuleInput>,
}

/// Transaction template repository.
#[derive(Debug, Clone)]
pub struct TemplateRepository {
    db: DatabaseConnection,
    invalidation: InvalidationHook,
}

impl TemplateRepository {
    /// Creates a new template repository.
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

    /// Creates a template and its rules in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a rule names both or neither of a role and an account
    /// - the rules fail template validation
    /// - the code is taken, or the voucher type or an account is unknown
    pub async fn create_template(
        &self,
        input: CreateTemplateInput,
    ) -> Result<TransactionTemplate, ConfigError> {
        let template = build_template(&input)?;
        template.validate()?;

        let tenant = input.tenant_id.into_inner();

        let existing = transaction_templates::Entity::find()
            .filter(transaction_templates::Column::TenantId.eq(tenant))
            .filter(transaction_templates::Column::Code.eq(&template.code))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ConfigError::DuplicateCode(template.code));
        }

        let voucher_type = voucher_types::Entity::find_by_id(input.voucher_type_id.into_inner())
            .filter(voucher_types::Column::TenantId.eq(tenant))
            .one(&self.db)
            .await?;
        if voucher_type.is_none() {
            return Err(ConfigError::VoucherTypeNotFound(
                input.voucher_type_id.into_inner(),
            ));
        }

        let direct_accounts: Vec<Uuid> = template
            .rules
            .iter()
            .filter_map(|r| match r.target {
                RuleTarget::Account(id) => Some(id.into_inner()),
                RuleTarget::Role(_) => None,
            })
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let found: HashSet<Uuid> = AccountRepository::new(self.db.clone())
            .existing_ids(input.tenant_id, &direct_accounts)
            .await?
            .into_iter()
            .collect();
        if let Some(missing) = direct_accounts.iter().find(|id| !found.contains(id)) {
            return Err(ConfigError::AccountNotFound(*missing));
        }

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let txn = self.db.begin().await?;

        transaction_templates::ActiveModel {
            id: Set(template.id.into_inner()),
            tenant_id: Set(tenant),
            code: Set(template.code.clone()),
            name: Set(template.name.clone()),
            transaction_type: Set(template.transaction_type.clone()),
            voucher_type_id: Set(template.voucher_type_id.into_inner()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let rules = template.rules.iter().map(|rule| {
            let (account_id, account_type) = match &rule.target {
                RuleTarget::Account(id) => (Some(id.into_inner()), None),
                RuleTarget::Role(role) => (None, Some(role.clone())),
            };
            transaction_template_rules::ActiveModel {
                id: Set(rule.id.into_inner()),
                tenant_id: Set(tenant),
                template_id: Set(template.id.into_inner()),
                line_number: Set(rule.line_number),
                account_id: Set(account_id),
                account_type: Set(account_type),
                entry_type: Set(rule.entry_type.into()),
                amount_source: Set(rule.amount_source.clone()),
                percentage: Set(rule.percentage),
                narration: Set(rule.narration.clone()),
                created_at: Set(now),
            }
        });
        transaction_template_rules::Entity::insert_many(rules)
            .exec(&txn)
            .await?;

        txn.commit().await?;
        self.invalidation.fire(input.tenant_id);

        tracing::info!(
            tenant_id = %input.tenant_id,
            template = %template.code,
            transaction_type = %template.transaction_type,
            rules = template.rules.len(),
            "Transaction template created"
        );

        Ok(template)
    }

    /// Activates or deactivates a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not exist for the tenant.
    pub async fn set_active(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
        is_active: bool,
    ) -> Result<(), ConfigError> {
        let template = transaction_templates::Entity::find_by_id(template_id.into_inner())
            .filter(transaction_templates::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await?
            .ok_or(ConfigError::TemplateNotFound(template_id.into_inner()))?;

        let mut active: transaction_templates::ActiveModel = template.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().into());
        active.update(&self.db).await?;

        self.invalidation.fire(tenant_id);
        Ok(())
    }

    /// Finds a template with its rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> Result<Option<TransactionTemplate>, ConfigError> {
        let Some(template) = transaction_templates::Entity::find_by_id(template_id.into_inner())
            .filter(transaction_templates::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let rules = template
            .find_related(transaction_template_rules::Entity)
            .all(&self.db)
            .await?;
        Ok(Some(template_from_models(template, rules)))
    }

    /// Lists the tenant's templates, oldest first, with their rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_templates(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<TransactionTemplate>, ConfigError> {
        let rows = transaction_templates::Entity::find()
            .filter(transaction_templates::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(transaction_templates::Column::CreatedAt)
            .order_by_asc(transaction_templates::Column::Id)
            .find_with_related(transaction_template_rules::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(template, rules)| template_from_models(template, rules))
            .collect())
    }
}

fn build_template(input: &CreateTemplateInput) -> Result<TransactionTemplate, ConfigError> {
    let code = input.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ConfigError::InvalidInput("template code is required".into()));
    }
    let transaction_type = normalize_transaction_type(&input.transaction_type);
    if transaction_type.is_empty() {
        return Err(ConfigError::InvalidInput("transaction type is required".into()));
    }

    let rules = input
        .rules
        .iter()
        .map(|rule| {
            let role = rule
                .account_role
                .as_deref()
                .map(normalize_role)
                .filter(|r| !r.is_empty());
            let target = match (role, rule.account_id) {
                (Some(role), None) => RuleTarget::Role(role),
                (None, Some(id)) => RuleTarget::Account(id),
                (Some(_), Some(_)) => {
                    return Err(ConfigError::InvalidTemplate(format!(
                        "line {} names both an account role and an account",
                        rule.line_number
                    )));
                }
                (None, None) => {
                    return Err(ConfigError::InvalidTemplate(format!(
                        "line {} has neither an account role nor an account",
                        rule.line_number
                    )));
                }
            };
            Ok(TemplateRule {
                id: TemplateRuleId::new(),
                line_number: rule.line_number,
                target,
                entry_type: rule.entry_type,
                amount_source: rule.amount_source.trim().to_uppercase(),
                percentage: rule.percentage,
                narration: rule.narration.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TransactionTemplate {
        id: TemplateId::new(),
        tenant_id: input.tenant_id,
        code,
        name: input.name.clone(),
        transaction_type,
        voucher_type_id: input.voucher_type_id,
        is_active: true,
        rules,
    })
}
