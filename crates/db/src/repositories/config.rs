//! Shared pieces of the configuration repositories.

use std::sync::Arc;

use sea_orm::DbErr;
use uuid::Uuid;

use ledgerpost_core::PostingError;
use ledgerpost_core::posting::ConfigInvalidation;
use ledgerpost_shared::{AppError, ErrorCategory};
use ledgerpost_shared::types::TenantId;

/// Error types for posting configuration writes.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Code already used by another record of the tenant.
    #[error("Code '{0}' already exists")]
    DuplicateCode(String),

    /// Account not found for the tenant.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Voucher type not found for the tenant.
    #[error("Voucher type not found: {0}")]
    VoucherTypeNotFound(Uuid),

    /// Template not found for the tenant.
    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),

    /// No mapping for the role and module.
    #[error("No mapping for role '{role}'")]
    MappingNotFound {
        /// Account role.
        role: String,
        /// Module, when the mapping is module-specific.
        module: Option<String>,
    },

    /// Template or rule is malformed.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ConfigError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::VoucherTypeNotFound(_) => "VOUCHER_TYPE_NOT_FOUND",
            Self::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            Self::MappingNotFound { .. } => "MAPPING_NOT_FOUND",
            Self::InvalidTemplate(_) => "INVALID_TEMPLATE",
            Self::InvalidInput(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicateCode(_) => ErrorCategory::Conflict,
            Self::AccountNotFound(_)
            | Self::VoucherTypeNotFound(_)
            | Self::TemplateNotFound(_)
            | Self::MappingNotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidTemplate(_) | Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::Database(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.category().http_status_code()
    }
}

impl From<PostingError> for ConfigError {
    fn from(err: PostingError) -> Self {
        match err {
            PostingError::InvalidTemplate(msg) => Self::InvalidTemplate(msg),
            PostingError::UnsupportedAmountSource(source) => {
                Self::InvalidTemplate(format!("unsupported amount source '{source}'"))
            }
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::new(err.category(), err.error_code(), err.to_string())
    }
}

/// Optional cache invalidation hook fired after configuration commits.
#[derive(Clone, Default)]
pub(crate) struct InvalidationHook(Option<Arc<dyn ConfigInvalidation>>);

impl InvalidationHook {
    pub(crate) fn new(hook: Arc<dyn ConfigInvalidation>) -> Self {
        Self(Some(hook))
    }

    pub(crate) fn fire(&self, tenant_id: TenantId) {
        if let Some(hook) = &self.0 {
            hook.invalidate_tenant(tenant_id);
            tracing::debug!(tenant_id = %tenant_id, "Posting configuration cache invalidated");
        }
    }
}

impl std::fmt::Debug for InvalidationHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InvalidationHook")
            .field(&self.0.is_some())
            .finish()
    }
}
