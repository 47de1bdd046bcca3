use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use rand::Rng;
use uuid::Uuid;

use troth_shared::errors::{AppError, ErrorCode};

use crate::models::NewEmailVerification;
use crate::schema::email_verifications;

pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 15;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

pub fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// Stores a fresh code for `user_id` and returns it for delivery.
pub fn issue_verification_code(conn: &mut PgConnection, user_id: Uuid) -> Result<String, AppError> {
    let code = generate_verification_code();
    diesel::insert_into(email_verifications::table)
        .values(&NewEmailVerification {
            user_id,
            code: code.clone(),
            expires_at: Utc::now() + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES),
        })
        .execute(conn)?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_passwords_are_rejected() {
        for weak in ["short1", "onlyletters", "12345678"] {
            let err = validate_password(weak).unwrap_err();
            assert_eq!(err.code(), ErrorCode::PasswordTooWeak, "{weak}");
        }
        assert!(validate_password("marigold42").is_ok());
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("marigold42").unwrap();
        assert!(verify_password("marigold42", &hash).unwrap());
        assert!(!verify_password("marigold43", &hash).unwrap());
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
