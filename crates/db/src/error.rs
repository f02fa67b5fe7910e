//! Mapping of database failures onto posting errors.

use sea_orm::{DbErr, RuntimeErr};

use ledgerpost_core::PostingError;

/// `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";
/// `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Unique index guarding idempotency keys.
pub const IDEMPOTENCY_CONSTRAINT: &str = "uq_vouchers_idempotency";

fn database_error(err: &DbErr) -> Option<&(dyn sqlx::error::DatabaseError + 'static)> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => Some(e.as_ref()),
        _ => None,
    }
}

/// SQLSTATE of a database-reported error.
pub fn sql_state(err: &DbErr) -> Option<String> {
    database_error(err)
        .and_then(|e| e.code())
        .map(|code| code.into_owned())
}

/// Whether the error is lock contention worth retrying.
pub fn is_contention(err: &DbErr) -> bool {
    matches!(
        sql_state(err).as_deref(),
        Some(LOCK_NOT_AVAILABLE | DEADLOCK_DETECTED | SERIALIZATION_FAILURE)
    )
}

/// Whether the error is a unique violation of `constraint`.
pub fn is_unique_violation(err: &DbErr, constraint: &str) -> bool {
    database_error(err).is_some_and(|e| {
        e.code().as_deref() == Some(UNIQUE_VIOLATION) && e.constraint() == Some(constraint)
    })
}

/// Classifies a database error for the posting engine.
pub fn classify(err: DbErr) -> PostingError {
    if is_contention(&err) {
        return PostingError::ConcurrentModification(err.to_string());
    }
    PostingError::Database(err.to_string())
}
