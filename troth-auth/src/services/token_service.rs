use chrono::{Duration, Utc};
use diesel::prelude::*;
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use troth_shared::errors::AppError;
use troth_shared::types::auth::{Claims, TokenPair, UserRole};

use crate::config::AppConfig;
use crate::models::NewRefreshToken;
use crate::schema::refresh_tokens;

pub fn create_access_token(
    user_id: Uuid,
    role: UserRole,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, role, ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

pub fn create_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn create_token_pair(
    user_id: Uuid,
    role: UserRole,
    secret: &str,
    access_ttl: i64,
) -> Result<(TokenPair, String), AppError> {
    let access_token = create_access_token(user_id, role, secret, access_ttl)?;
    let refresh_token = create_refresh_token();
    let refresh_hash = hash_token(&refresh_token);
    let pair = TokenPair::bearer(access_token, refresh_token, access_ttl);
    Ok((pair, refresh_hash))
}

/// Issues a token pair and persists the hashed refresh token.
pub fn issue_session(
    conn: &mut PgConnection,
    config: &AppConfig,
    user_id: Uuid,
    role: UserRole,
    device_fingerprint: Option<String>,
) -> Result<TokenPair, AppError> {
    let (pair, refresh_hash) =
        create_token_pair(user_id, role, &config.jwt_secret, config.jwt_access_ttl)?;

    diesel::insert_into(refresh_tokens::table)
        .values(&NewRefreshToken {
            user_id,
            token_hash: refresh_hash,
            device_fingerprint,
            expires_at: Utc::now() + Duration::seconds(config.jwt_refresh_ttl),
        })
        .execute(conn)?;

    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn access_token_carries_role() {
        let user_id = Uuid::now_v7();
        let token = create_access_token(user_id, UserRole::Admin, "secret", 60).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.sub, user_id);
        assert!(data.claims.is_admin());
    }

    #[test]
    fn refresh_tokens_are_hashed_deterministically() {
        let token = create_refresh_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
    }
}
