use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `iss` claim on every access token minted by troth-auth.
pub const TOKEN_ISSUER: &str = "troth-auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::User, UserRole::Moderator, UserRole::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    /// Moderators review reports and verifications; admins can too.
    pub fn can_moderate(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, role: UserRole, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            role,
            iss: TOKEN_ISSUER.to_string(),
            iat: now,
            exp: now + ttl_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_moderator(&self) -> bool {
        self.role.can_moderate()
    }
}

/// The signed-in caller, as seen by every service.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub, role: claims.role, token_id: claims.jti }
    }
}

/// Returned by register, login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl TokenPair {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self { access_token, refresh_token, token_type: "Bearer".to_string(), expires_in }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_and_displays() {
        assert_eq!("Admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(UserRole::Moderator.to_string(), "moderator");
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn admin_is_also_moderator() {
        let claims = Claims::new(Uuid::now_v7(), UserRole::Admin, 60);
        assert!(claims.is_admin());
        assert!(claims.is_moderator());
        assert!(!claims.is_expired());
    }

    #[test]
    fn negative_ttl_is_expired() {
        let claims = Claims::new(Uuid::now_v7(), UserRole::User, -10);
        assert!(claims.is_expired());
        assert!(!claims.is_moderator());
    }

    #[test]
    fn auth_user_carries_token_id() {
        let claims = Claims::new(Uuid::now_v7(), UserRole::User, 60);
        let jti = claims.jti;
        let user = AuthUser::from(claims);
        assert_eq!(user.token_id, jti);
    }

    #[test]
    fn claims_name_the_issuer() {
        let claims = Claims::new(Uuid::now_v7(), UserRole::Moderator, 60);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["iss"], TOKEN_ISSUER);
        assert_eq!(json["role"], "moderator");
    }
}
