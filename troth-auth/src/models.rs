use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use troth_shared::types::account::{AccountStatus, BanTerm, VerificationFlags};
use troth_shared::types::auth::UserRole;
use troth_shared::types::event::payloads::AccountStatusChanged;

use crate::schema::{email_verifications, refresh_tokens, users};

// --- Users ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub account_status: String,
    pub trust_score: i32,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub photo_verified: bool,
    pub id_verified: bool,
    pub ban_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::User)
    }

    pub fn status(&self) -> AccountStatus {
        self.account_status.parse().unwrap_or(AccountStatus::Limited)
    }

    pub fn flags(&self) -> VerificationFlags {
        VerificationFlags {
            email: self.email_verified,
            phone: self.phone_verified,
            photo: self.photo_verified,
            id: self.id_verified,
        }
    }

    /// A ban is in force when the account is banned and the ban is either
    /// permanent or not yet expired.
    pub fn ban_in_force(&self, now: DateTime<Utc>) -> bool {
        self.status().is_banned() && self.ban_until.map_or(true, |until| until > now)
    }

    /// The ban currently binding the account, if any.
    pub fn ban_term(&self, now: DateTime<Utc>) -> Option<BanTerm> {
        self.ban_in_force(now).then(|| BanTerm::from_expiry(self.ban_until))
    }

    /// Term after a new ban: the longer of the current and incoming ban.
    pub fn extended_ban(&self, incoming: BanTerm, now: DateTime<Utc>) -> BanTerm {
        BanTerm::longest(self.ban_term(now).into_iter().chain([incoming])).unwrap_or(incoming)
    }

    pub fn status_payload(&self) -> AccountStatusChanged {
        AccountStatusChanged {
            user_id: self.id,
            account_status: self.status(),
            trust_score: self.trust_score,
            flags: self.flags(),
            ban_until: self.ban_until,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

// --- Email Verifications ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = email_verifications)]
pub struct EmailVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = email_verifications)]
pub struct NewEmailVerification {
    pub user_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

// --- Refresh Tokens ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub device_fingerprint: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub device_fingerprint: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(status: &str, ban_until: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            email: "asha@example.com".into(),
            password_hash: String::new(),
            role: "user".into(),
            account_status: status.into(),
            trust_score: 0,
            email_verified: true,
            phone_verified: false,
            photo_verified: true,
            id_verified: false,
            ban_until,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn permanent_ban_is_in_force() {
        assert!(user("BANNED", None).ban_in_force(Utc::now()));
    }

    #[test]
    fn expired_ban_is_not_in_force() {
        let now = Utc::now();
        assert!(!user("BANNED", Some(now - Duration::hours(1))).ban_in_force(now));
        assert!(user("BANNED", Some(now + Duration::hours(1))).ban_in_force(now));
    }

    #[test]
    fn shorter_ban_does_not_shorten_current_one() {
        let now = Utc::now();
        let month = now + Duration::days(30);
        let banned = user("BANNED", Some(month));
        assert_eq!(banned.extended_ban(BanTerm::Until(now + Duration::hours(1)), now), BanTerm::Until(month));

        let forever = user("BANNED", None);
        assert_eq!(forever.extended_ban(BanTerm::Until(month), now), BanTerm::Permanent);

        let lapsed = user("BANNED", Some(now - Duration::hours(1)));
        assert_eq!(lapsed.extended_ban(BanTerm::Until(month), now), BanTerm::Until(month));

        assert_eq!(user("LIMITED", None).extended_ban(BanTerm::Permanent, now), BanTerm::Permanent);
    }

    #[test]
    fn limited_user_is_not_banned() {
        assert!(!user("LIMITED", None).ban_in_force(Utc::now()));
    }

    #[test]
    fn flags_mirror_columns() {
        let flags = user("LIMITED", None).flags();
        assert!(flags.email && flags.photo);
        assert!(!flags.phone && !flags.id);
    }

    #[test]
    fn unknown_strings_fall_back_to_defaults() {
        let mut u = user("???", None);
        u.role = "superuser".into();
        assert_eq!(u.status(), AccountStatus::Limited);
        assert_eq!(u.role(), UserRole::User);
    }
}
