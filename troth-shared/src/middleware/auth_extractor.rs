use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims, UserRole, TOKEN_ISSUER};

/// Query parameter accepted in place of the Authorization header, for
/// clients such as EventSource that cannot set headers.
const TOKEN_QUERY_PARAM: &str = "access_token";

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = match extract_bearer_token(&parts.headers) {
            Ok(token) => token,
            Err(header_err) => token_from_query(parts.uri.query()).ok_or(header_err)?,
        };
        let claims = validate_jwt(&token)?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

fn token_from_query(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn validate_jwt(token: &str) -> Result<Claims, AppError> {
    let jwt_secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "development-secret-change-in-production".to_string());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_issuer(&[TOKEN_ISSUER]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
    })?;

    Ok(token_data.claims)
}

/// Require Admin role
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(AppError::new(ErrorCode::Forbidden, "admin access required"));
        }
        Ok(Self(user))
    }
}

/// Require Moderator or Admin role
pub struct ModeratorUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ModeratorUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.can_moderate() {
            return Err(AppError::new(ErrorCode::Forbidden, "moderator access required"));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Token abc"));
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn query_token_is_found_among_other_params() {
        assert_eq!(
            token_from_query(Some("since=10&access_token=xyz")),
            Some("xyz".to_string())
        );
        assert_eq!(token_from_query(Some("access_token=")), None);
        assert_eq!(token_from_query(Some("token=xyz")), None);
        assert_eq!(token_from_query(None), None);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let err = validate_jwt("not-a-jwt").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenInvalid);
    }
}
