pub mod match_service;
pub mod profile_service;
pub mod quota_service;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use troth_shared::errors::{AppError, ErrorCode};

/// Maps a unique-index violation to a conflict error; other errors pass through.
pub fn on_unique_violation(err: DieselError, code: ErrorCode, message: &str) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => AppError::new(code, message),
        other => AppError::Database(other),
    }
}
