//! Transaction templates, account role mappings and their resolution.
//!
//! A tenant's posting configuration is loaded once (see
//! [`super::cache::TenantConfigCache`]) and resolved here without touching
//! storage, so resolution is a pure function of the request and the loaded
//! configuration.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpost_shared::types::{AccountId, TemplateId, TemplateRuleId, TenantId, VoucherTypeId};

use super::amount::AmountSource;
use crate::ledger::{EntryType, PostingError};

/// Which account a rule posts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTarget {
    /// An abstract role resolved through the tenant's account mappings.
    Role(String),
    /// A concrete account.
    Account(AccountId),
}

/// A template rule as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRule {
    /// Rule id.
    pub id: TemplateRuleId,
    /// Posting order, unique within the template.
    pub line_number: i32,
    /// Role or direct account.
    pub target: RuleTarget,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Persisted amount selector, parsed on compile.
    pub amount_source: String,
    /// Percentage for percentage selectors.
    pub percentage: Option<Decimal>,
    /// Narration copied to the journal line.
    pub narration: Option<String>,
}

/// A transaction template: the ordered posting rules for one transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTemplate {
    /// Template id.
    pub id: TemplateId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Unique code, e.g. `SO_POST`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Transaction type this template posts, e.g. `SALES_ORDER`.
    pub transaction_type: String,
    /// Voucher type used to number the vouchers it produces.
    pub voucher_type_id: VoucherTypeId,
    /// Inactive templates are never resolved.
    pub is_active: bool,
    /// Rules, in any order.
    pub rules: Vec<TemplateRule>,
}

/// A rule with its account resolved and its amount source parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRule {
    /// Posting order.
    pub line_number: i32,
    /// Concrete account.
    pub account_id: AccountId,
    /// Debit or credit. For round-off rules this is only the declared side.
    pub entry_type: EntryType,
    /// Parsed amount source.
    pub source: AmountSource,
    /// Narration.
    pub narration: Option<String>,
}

impl TransactionTemplate {
    /// Checks the template's structure without resolving accounts.
    ///
    /// Rules must exist, line numbers must be unique, every selector must
    /// parse and at most one rule may be a round-off rule.
    pub fn validate(&self) -> Result<(), PostingError> {
        self.parsed_rules().map(|_| ())
    }

    fn parsed_rules(&self) -> Result<Vec<(&TemplateRule, AmountSource)>, PostingError> {
        if self.rules.is_empty() {
            return Err(PostingError::InvalidTemplate(format!(
                "template {} has no rules",
                self.code
            )));
        }

        let mut line_numbers = HashSet::with_capacity(self.rules.len());
        let mut round_offs = 0usize;
        let mut parsed = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            if !line_numbers.insert(rule.line_number) {
                return Err(PostingError::InvalidTemplate(format!(
                    "template {} repeats line number {}",
                    self.code, rule.line_number
                )));
            }
            if let RuleTarget::Role(role) = &rule.target
                && role.trim().is_empty()
            {
                return Err(PostingError::InvalidTemplate(format!(
                    "template {} line {} has neither an account role nor an account",
                    self.code, rule.line_number
                )));
            }
            let source = AmountSource::parse(&rule.amount_source, rule.percentage)?;
            if source.is_round_off() {
                round_offs += 1;
            }
            parsed.push((rule, source));
        }

        if round_offs > 1 {
            return Err(PostingError::InvalidTemplate(format!(
                "template {} has {round_offs} round-off rules, at most one is allowed",
                self.code
            )));
        }

        parsed.sort_by_key(|(rule, _)| rule.line_number);
        Ok(parsed)
    }

    /// Resolves every rule's account and parses its amount source.
    ///
    /// The result is ordered by line number.
    pub fn compile(
        &self,
        resolver: &dyn AccountResolver,
        module: Option<&str>,
    ) -> Result<Vec<PostingRule>, PostingError> {
        self.parsed_rules()?
            .into_iter()
            .map(|(rule, source)| {
                let account_id = match &rule.target {
                    RuleTarget::Account(id) => *id,
                    RuleTarget::Role(role) => resolver.resolve_account(role, module)?,
                };
                Ok(PostingRule {
                    line_number: rule.line_number,
                    account_id,
                    entry_type: rule.entry_type,
                    source,
                    narration: rule.narration.clone(),
                })
            })
            .collect()
    }
}

/// A (role, module?) → account mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRoleMapping {
    /// Account role, e.g. `ACCOUNTS_RECEIVABLE`.
    pub role: String,
    /// Business module narrowing the mapping; `None` is the tenant-wide fallback.
    pub module: Option<String>,
    /// Mapped account.
    pub account_id: AccountId,
}

/// Maps an account role to a concrete account.
pub trait AccountResolver: Send + Sync {
    /// Resolves `role`, preferring a mapping for `module` over the tenant-wide one.
    fn resolve_account(&self, role: &str, module: Option<&str>) -> Result<AccountId, PostingError>;
}

/// Normalizes a role name.
#[must_use]
pub fn normalize_role(role: &str) -> String {
    role.trim().to_uppercase()
}

/// Normalizes a module name. Blank modules are treated as no module.
#[must_use]
pub fn normalize_module(module: Option<&str>) -> Option<String> {
    module
        .map(|m| m.trim().to_uppercase())
        .filter(|m| !m.is_empty())
}

/// Normalizes a transaction type.
#[must_use]
pub fn normalize_transaction_type(transaction_type: &str) -> String {
    transaction_type.trim().to_uppercase()
}

/// Everything needed to turn a tenant's transaction into journal lines.
#[derive(Debug, Clone, Default)]
pub struct TenantPostingConfig {
    templates: Vec<TransactionTemplate>,
    mappings: HashMap<(String, Option<String>), AccountId>,
}

impl TenantPostingConfig {
    /// Builds the configuration.
    ///
    /// `templates` must be in stable load order (oldest first); when a
    /// transaction type has several active templates, the first wins.
    #[must_use]
    pub fn new(templates: Vec<TransactionTemplate>, mappings: Vec<AccountRoleMapping>) -> Self {
        let mappings = mappings
            .into_iter()
            .map(|m| {
                (
                    (normalize_role(&m.role), normalize_module(m.module.as_deref())),
                    m.account_id,
                )
            })
            .collect();
        Self {
            templates,
            mappings,
        }
    }

    /// Returns the first active template for `transaction_type`.
    pub fn resolve_template(
        &self,
        transaction_type: &str,
    ) -> Result<&TransactionTemplate, PostingError> {
        let wanted = normalize_transaction_type(transaction_type);
        self.templates
            .iter()
            .find(|t| t.is_active && normalize_transaction_type(&t.transaction_type) == wanted)
            .ok_or(PostingError::TemplateNotFound {
                transaction_type: transaction_type.to_string(),
            })
    }

    /// Number of templates loaded, active or not.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Number of role mappings loaded.
    #[must_use]
    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }
}

impl AccountResolver for TenantPostingConfig {
    fn resolve_account(&self, role: &str, module: Option<&str>) -> Result<AccountId, PostingError> {
        let role_key = normalize_role(role);
        let module_key = normalize_module(module);

        if module_key.is_some()
            && let Some(id) = self.mappings.get(&(role_key.clone(), module_key.clone()))
        {
            return Ok(*id);
        }

        self.mappings
            .get(&(role_key, None))
            .copied()
            .ok_or_else(|| PostingError::AccountMappingMissing {
                role: role.to_string(),
                module: module_key,
            })
    }
}
