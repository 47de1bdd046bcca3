use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an account. Stored as its uppercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Limited,
    Verified,
    Banned,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Limited => "LIMITED",
            AccountStatus::Verified => "VERIFIED",
            AccountStatus::Banned => "BANNED",
        }
    }

    pub fn is_banned(&self) -> bool {
        *self == AccountStatus::Banned
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LIMITED" => Ok(AccountStatus::Limited),
            "VERIFIED" => Ok(AccountStatus::Verified),
            "BANNED" => Ok(AccountStatus::Banned),
            _ => Err(format!("unknown account status: {s}")),
        }
    }
}

/// Milestones that feed the trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationKind {
    Email,
    Phone,
    Photo,
    Id,
}

impl VerificationKind {
    pub const ALL: [VerificationKind; 4] = [
        VerificationKind::Email,
        VerificationKind::Phone,
        VerificationKind::Photo,
        VerificationKind::Id,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationKind::Email => "EMAIL",
            VerificationKind::Phone => "PHONE",
            VerificationKind::Photo => "PHOTO",
            VerificationKind::Id => "ID",
        }
    }

    /// Human label used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            VerificationKind::Email => "email",
            VerificationKind::Phone => "phone number",
            VerificationKind::Photo => "photo",
            VerificationKind::Id => "identity document",
        }
    }
}

impl std::fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VerificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EMAIL" => Ok(VerificationKind::Email),
            "PHONE" => Ok(VerificationKind::Phone),
            "PHOTO" => Ok(VerificationKind::Photo),
            "ID" => Ok(VerificationKind::Id),
            _ => Err(format!("unknown document type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlags {
    pub email: bool,
    pub phone: bool,
    pub photo: bool,
    pub id: bool,
}

impl VerificationFlags {
    pub fn is_set(&self, kind: VerificationKind) -> bool {
        match kind {
            VerificationKind::Email => self.email,
            VerificationKind::Phone => self.phone,
            VerificationKind::Photo => self.photo,
            VerificationKind::Id => self.id,
        }
    }

    pub fn with(mut self, kind: VerificationKind) -> Self {
        match kind {
            VerificationKind::Email => self.email = true,
            VerificationKind::Phone => self.phone = true,
            VerificationKind::Photo => self.photo = true,
            VerificationKind::Id => self.id = true,
        }
        self
    }
}

/// How long a ban lasts. Ordered so the longer term compares greater and a
/// permanent ban outranks any timed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "until", rename_all = "lowercase")]
pub enum BanTerm {
    Until(DateTime<Utc>),
    Permanent,
}

impl BanTerm {
    /// A stored expiry, where `None` means the ban never ends.
    pub fn from_expiry(expires_at: Option<DateTime<Utc>>) -> Self {
        match expires_at {
            Some(at) => BanTerm::Until(at),
            None => BanTerm::Permanent,
        }
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        match self {
            BanTerm::Until(at) => Some(*at),
            BanTerm::Permanent => None,
        }
    }

    pub fn is_over(&self, now: DateTime<Utc>) -> bool {
        matches!(self, BanTerm::Until(at) if *at <= now)
    }

    /// The term still binding once every given ban is combined, if any.
    pub fn longest(terms: impl IntoIterator<Item = BanTerm>) -> Option<BanTerm> {
        terms.into_iter().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("verified".parse::<AccountStatus>(), Ok(AccountStatus::Verified));
        assert_eq!("BANNED".parse::<AccountStatus>(), Ok(AccountStatus::Banned));
        assert!("suspended".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&AccountStatus::Limited).unwrap();
        assert_eq!(json, "\"LIMITED\"");
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in VerificationKind::ALL {
            assert_eq!(kind.as_str().parse::<VerificationKind>(), Ok(kind));
        }
    }

    #[test]
    fn with_sets_only_the_given_flag() {
        let flags = VerificationFlags::default().with(VerificationKind::Photo);
        assert!(flags.photo);
        assert!(!flags.email && !flags.phone && !flags.id);
        assert!(flags.is_set(VerificationKind::Photo));
    }

    #[test]
    fn permanent_ban_outlasts_any_timed_ban() {
        let soon = Utc::now() + chrono::Duration::hours(1);
        let later = Utc::now() + chrono::Duration::days(30);
        assert_eq!(
            BanTerm::longest([BanTerm::Until(soon), BanTerm::Until(later)]),
            Some(BanTerm::Until(later))
        );
        assert_eq!(
            BanTerm::longest([BanTerm::Until(later), BanTerm::Permanent, BanTerm::Until(soon)]),
            Some(BanTerm::Permanent)
        );
        assert_eq!(BanTerm::longest([]), None);
    }

    #[test]
    fn ban_term_maps_stored_expiry() {
        let at = Utc::now();
        assert_eq!(BanTerm::from_expiry(None), BanTerm::Permanent);
        assert_eq!(BanTerm::from_expiry(Some(at)).expiry(), Some(at));
        assert!(BanTerm::Until(at).is_over(at));
        assert!(!BanTerm::Permanent.is_over(at));
    }
}
