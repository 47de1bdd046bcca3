pub mod audit_service;
pub mod sanction_service;
pub mod verification_service;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use troth_shared::errors::{AppError, ErrorCode};

/// Turns a violated partial unique index into the matching conflict error.
pub fn on_unique_violation(err: DieselError, code: ErrorCode, message: &str) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => AppError::new(code, message),
        other => AppError::Database(other),
    }
}
