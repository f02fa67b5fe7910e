//! Posting error types.
//!
//! Every failure the posting engine can report, grouped by category so
//! callers can tell configuration gaps from business-rule violations and
//! transient contention.

use chrono::NaiveDate;
use ledgerpost_shared::types::{AccountId, VoucherId, VoucherTypeId};
use ledgerpost_shared::AppError;
pub use ledgerpost_shared::ErrorCategory;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while posting, approving or reversing vouchers.
#[derive(Debug, Error)]
pub enum PostingError {
    // ========== Configuration Errors ==========
    /// No active template exists for the transaction type.
    #[error("No active transaction template for transaction type '{transaction_type}'")]
    TemplateNotFound {
        /// The requested transaction type.
        transaction_type: String,
    },

    /// No account is mapped for the role, neither for the module nor as a fallback.
    #[error("No account mapped for role '{role}'{}", module_suffix(.module.as_deref()))]
    AccountMappingMissing {
        /// The account role.
        role: String,
        /// The module that was asked for, if any.
        module: Option<String>,
    },

    /// A template rule uses an amount selector the engine does not understand.
    #[error("Unsupported amount source: {0}")]
    UnsupportedAmountSource(String),

    /// A template is structurally invalid.
    #[error("Invalid transaction template: {0}")]
    InvalidTemplate(String),

    /// The voucher type referenced by a template does not exist.
    #[error("Voucher type not found: {0}")]
    VoucherTypeNotFound(VoucherTypeId),

    // ========== Validation Errors ==========
    /// The monetary facts supplied with the request are inconsistent.
    #[error("Invalid monetary facts: {0}")]
    InvalidMonetaryFacts(String),

    /// A reversal was requested without a reason.
    #[error("A reversal reason is required")]
    ReversalReasonRequired,

    // ========== Invariant Errors ==========
    /// Debits and credits of the generated journal differ.
    #[error("Journal is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedPosting {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Every rule evaluated to zero, so there is nothing to post.
    #[error("Journal has no non-zero lines")]
    EmptyJournal,

    // ========== Business Rule Errors ==========
    /// No fiscal year covers the voucher date.
    #[error("No fiscal year covers {0}")]
    NoFiscalYear(NaiveDate),

    /// The fiscal year covering the voucher date is closed.
    #[error("Fiscal period covering {0} is closed")]
    FiscalPeriodClosed(NaiveDate),

    /// Only posted vouchers can be reversed.
    #[error("Voucher {0} is not posted")]
    VoucherNotPosted(VoucherId),

    /// The voucher has already been posted.
    #[error("Voucher {0} is already posted")]
    VoucherAlreadyPosted(VoucherId),

    /// The voucher was already reversed, or is itself a reversal.
    #[error("Voucher {0} is already reversed")]
    AlreadyReversed(VoucherId),

    /// The account is inactive and cannot receive postings.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    // ========== Not Found Errors ==========
    /// The voucher does not exist for this tenant.
    #[error("Voucher not found: {0}")]
    VoucherNotFound(VoucherId),

    /// The account does not exist for this tenant.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    // ========== Concurrency Errors ==========
    /// A lock could not be taken or the transaction was chosen as a deadlock victim.
    #[error("Concurrent modification detected: {0}")]
    ConcurrentModification(String),

    /// Another request committed the same idempotency key first.
    #[error("Idempotency key '{0}' was committed concurrently")]
    DuplicateIdempotencyKey(String),

    // ========== Infrastructure Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn module_suffix(module: Option<&str>) -> String {
    module.map_or_else(String::new, |m| format!(" in module '{m}'"))
}

impl PostingError {
    /// Returns the category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TemplateNotFound { .. }
            | Self::AccountMappingMissing { .. }
            | Self::UnsupportedAmountSource(_)
            | Self::InvalidTemplate(_)
            | Self::VoucherTypeNotFound(_) => ErrorCategory::Configuration,
            Self::InvalidMonetaryFacts(_) | Self::ReversalReasonRequired => {
                ErrorCategory::Validation
            }
            Self::UnbalancedPosting { .. } | Self::EmptyJournal => ErrorCategory::Invariant,
            Self::NoFiscalYear(_)
            | Self::FiscalPeriodClosed(_)
            | Self::VoucherNotPosted(_)
            | Self::VoucherAlreadyPosted(_)
            | Self::AlreadyReversed(_)
            | Self::AccountInactive(_) => ErrorCategory::BusinessRule,
            Self::VoucherNotFound(_) | Self::AccountNotFound(_) => ErrorCategory::NotFound,
            Self::ConcurrentModification(_) | Self::DuplicateIdempotencyKey(_) => {
                ErrorCategory::Concurrency
            }
            Self::Database(_) | Self::Internal(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            Self::AccountMappingMissing { .. } => "ACCOUNT_MAPPING_MISSING",
            Self::UnsupportedAmountSource(_) => "UNSUPPORTED_AMOUNT_SOURCE",
            Self::InvalidTemplate(_) => "INVALID_TEMPLATE",
            Self::VoucherTypeNotFound(_) => "VOUCHER_TYPE_NOT_FOUND",
            Self::InvalidMonetaryFacts(_) => "INVALID_MONETARY_FACTS",
            Self::ReversalReasonRequired => "REVERSAL_REASON_REQUIRED",
            Self::UnbalancedPosting { .. } => "UNBALANCED_POSTING",
            Self::EmptyJournal => "EMPTY_JOURNAL",
            Self::NoFiscalYear(_) => "NO_FISCAL_YEAR",
            Self::FiscalPeriodClosed(_) => "FISCAL_PERIOD_CLOSED",
            Self::VoucherNotPosted(_) => "VOUCHER_NOT_POSTED",
            Self::VoucherAlreadyPosted(_) => "VOUCHER_ALREADY_POSTED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::VoucherNotFound(_) => "VOUCHER_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::DuplicateIdempotencyKey(_) => "DUPLICATE_IDEMPOTENCY_KEY",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        self.category().http_status_code()
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}

impl From<PostingError> for AppError {
    fn from(err: PostingError) -> Self {
        Self::new(err.category(), err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PostingError::TemplateNotFound {
                transaction_type: "SALES_INVOICE".into()
            }
            .error_code(),
            "TEMPLATE_NOT_FOUND"
        );
        assert_eq!(
            PostingError::UnbalancedPosting {
                debit: dec!(100),
                credit: dec!(50),
            }
            .error_code(),
            "UNBALANCED_POSTING"
        );
        assert_eq!(PostingError::EmptyJournal.error_code(), "EMPTY_JOURNAL");
        assert_eq!(
            PostingError::AlreadyReversed(VoucherId::new()).error_code(),
            "ALREADY_REVERSED"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            PostingError::UnsupportedAmountSource("X".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            PostingError::InvalidMonetaryFacts("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            PostingError::EmptyJournal.category(),
            ErrorCategory::Invariant
        );
        assert_eq!(
            PostingError::FiscalPeriodClosed(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
                .category(),
            ErrorCategory::BusinessRule
        );
        assert_eq!(
            PostingError::ConcurrentModification("lock timeout".into()).category(),
            ErrorCategory::Concurrency
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            PostingError::InvalidMonetaryFacts(String::new()).http_status_code(),
            400
        );
        assert_eq!(
            PostingError::VoucherNotFound(VoucherId::new()).http_status_code(),
            404
        );
        assert_eq!(
            PostingError::ConcurrentModification(String::new()).http_status_code(),
            409
        );
        assert_eq!(
            PostingError::NoFiscalYear(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
                .http_status_code(),
            422
        );
        assert_eq!(
            PostingError::Database("boom".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(PostingError::ConcurrentModification("deadlock".into()).is_retryable());
        assert!(!PostingError::DuplicateIdempotencyKey("k".into()).is_retryable());
        assert!(!PostingError::EmptyJournal.is_retryable());
        assert!(!PostingError::Database("x".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PostingError::UnbalancedPosting {
            debit: Decimal::new(10000, 2),
            credit: Decimal::new(5000, 2),
        };
        assert_eq!(
            err.to_string(),
            "Journal is not balanced. Debit: 100.00, Credit: 50.00"
        );

        let err = PostingError::AccountMappingMissing {
            role: "SALES".into(),
            module: Some("RETAIL".into()),
        };
        assert_eq!(
            err.to_string(),
            "No account mapped for role 'SALES' in module 'RETAIL'"
        );

        let err = PostingError::AccountMappingMissing {
            role: "SALES".into(),
            module: None,
        };
        assert_eq!(err.to_string(), "No account mapped for role 'SALES'");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = PostingError::TemplateNotFound {
            transaction_type: "X".into(),
        }
        .into();
        assert_eq!(app.http_status_code(), 422);
        assert_eq!(app.category(), ErrorCategory::Configuration);
        assert_eq!(app.error_code(), "TEMPLATE_NOT_FOUND");

        let app: AppError = PostingError::ConcurrentModification("x".into()).into();
        assert_eq!(app.http_status_code(), 409);
        assert_eq!(app.error_code(), "CONCURRENT_MODIFICATION");

        let app: AppError = PostingError::Database("x".into()).into();
        assert_eq!(app.category(), ErrorCategory::Infrastructure);
        assert_eq!(app.message(), "Database error: x");
    }
}
