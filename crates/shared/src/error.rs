//! Error surface shared by every layer.
//!
//! Each layer keeps its own `thiserror` enum with precise variants and
//! codes. At the edge they all collapse into [`AppError`], which keeps the
//! originating code and adds the [`ErrorCategory`] a caller acts on.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Tenant configuration is missing or malformed.
    Configuration,
    /// The caller supplied input that cannot be accepted.
    Validation,
    /// A double-entry invariant would be broken.
    Invariant,
    /// The request is valid but the current state forbids it.
    BusinessRule,
    /// The referenced entity does not exist.
    NotFound,
    /// The request clashes with data that already exists.
    Conflict,
    /// Lost a race with another writer; safe to retry.
    Concurrency,
    /// Storage or internal failure.
    Infrastructure,
}

impl ErrorCategory {
    /// HTTP status code conventionally used for this category.
    #[must_use]
    pub const fn http_status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict | Self::Concurrency => 409,
            Self::Configuration | Self::Invariant | Self::BusinessRule => 422,
            Self::Infrastructure => 500,
        }
    }
}

/// A categorized error carrying the code of the layer that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    category: ErrorCategory,
    code: &'static str,
    message: String,
}

impl AppError {
    /// Creates an error.
    pub fn new(category: ErrorCategory, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    /// An infrastructure failure with no more specific code.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Infrastructure, "INTERNAL_ERROR", message)
    }

    /// Category of the failure.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Code of the originating error, e.g. `FISCAL_PERIOD_CLOSED`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        self.code
    }

    /// Human-readable message of the originating error.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.category.http_status_code()
    }
}
