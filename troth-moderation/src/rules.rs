//! Moderation state rules: sanction lengths, verification and report review.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use troth_shared::errors::{AppError, ErrorCode};
use troth_shared::types::account::BanTerm;

// --- Sanctions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionType {
    Warning,
    #[serde(rename = "ban_1h")]
    Ban1h,
    #[serde(rename = "ban_24h")]
    Ban24h,
    #[serde(rename = "ban_30d")]
    Ban30d,
    BanPermanent,
}

impl SanctionType {
    pub const ALL: [SanctionType; 5] = [
        SanctionType::Warning,
        SanctionType::Ban1h,
        SanctionType::Ban24h,
        SanctionType::Ban30d,
        SanctionType::BanPermanent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Ban1h => "ban_1h",
            Self::Ban24h => "ban_24h",
            Self::Ban30d => "ban_30d",
            Self::BanPermanent => "ban_permanent",
        }
    }

    pub fn is_ban(&self) -> bool {
        !matches!(self, Self::Warning)
    }

    /// When the sanction stops applying. Warnings and permanent bans never expire.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Ban1h => Some(issued_at + Duration::hours(1)),
            Self::Ban24h => Some(issued_at + Duration::hours(24)),
            Self::Ban30d => Some(issued_at + Duration::days(30)),
            Self::Warning | Self::BanPermanent => None,
        }
    }
}

/// Longest ban still binding among a user's in-force sanctions, given as
/// stored `(sanction_type, expires_at)` pairs. Warnings never ban.
pub fn remaining_ban<'a>(
    sanctions: impl IntoIterator<Item = (&'a str, Option<DateTime<Utc>>)>,
    now: DateTime<Utc>,
) -> Option<BanTerm> {
    BanTerm::longest(
        sanctions
            .into_iter()
            .filter(|(kind, _)| kind.parse::<SanctionType>().map_or(false, |t| t.is_ban()))
            .map(|(_, expires_at)| BanTerm::from_expiry(expires_at))
            .filter(|term| !term.is_over(now)),
    )
}

impl std::str::FromStr for SanctionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                AppError::new(
                    ErrorCode::ValidationError,
                    format!("invalid sanction_type '{s}'. Must be one of: {}", valid.join(", ")),
                )
            })
    }
}

// --- Verifications ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// A request is reviewed exactly once.
    pub fn review(self, approve: bool) -> Result<Self, AppError> {
        match self {
            Self::Pending if approve => Ok(Self::Approved),
            Self::Pending => Ok(Self::Rejected),
            other => Err(AppError::new(
                ErrorCode::VerificationAlreadyReviewed,
                format!("verification was already {}", other.as_str().to_lowercase()),
            )),
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("unknown verification status: {s}")),
        }
    }
}

// --- Reports ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Actioned,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Actioned => "actioned",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn review(self, decision: ReportStatus) -> Result<Self, AppError> {
        if decision == Self::Pending {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "status must be 'actioned' or 'dismissed'",
            ));
        }
        match self {
            Self::Pending => Ok(decision),
            _ => Err(AppError::new(
                ErrorCode::ReportAlreadyReviewed,
                "this report has already been reviewed",
            )),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "actioned" => Ok(Self::Actioned),
            "dismissed" => Ok(Self::Dismissed),
            _ => Err(format!("unknown report status: {s}")),
        }
    }
}

pub const MAX_REASON_CHARS: usize = 1000;

/// Trimmed free-text reason, required and bounded.
pub fn require_reason(raw: &str) -> Result<String, AppError> {
    let reason = raw.trim();
    if reason.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "reason is required"));
    }
    if reason.chars().count() > MAX_REASON_CHARS {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("reason must be at most {MAX_REASON_CHARS} characters"),
        ));
    }
    Ok(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanction_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(SanctionType::Ban1h.expires_at(now), Some(now + Duration::hours(1)));
        assert_eq!(SanctionType::Ban24h.expires_at(now), Some(now + Duration::hours(24)));
        assert_eq!(
            SanctionType::Ban30d.expires_at(now),
            Some(Utc.with_ymd_and_hms(2026, 3, 31, 10, 0, 0).unwrap())
        );
        assert_eq!(SanctionType::BanPermanent.expires_at(now), None);
        assert_eq!(SanctionType::Warning.expires_at(now), None);
    }

    #[test]
    fn only_warning_is_not_a_ban() {
        let bans: Vec<_> = SanctionType::ALL.iter().filter(|t| t.is_ban()).collect();
        assert_eq!(bans.len(), 4);
        assert!(!SanctionType::Warning.is_ban());
    }

    #[test]
    fn sanction_type_parses_wire_names() {
        assert_eq!("ban_24h".parse::<SanctionType>().unwrap(), SanctionType::Ban24h);
        let err = "ban_forever".parse::<SanctionType>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(serde_json::to_value(SanctionType::Ban30d).unwrap(), "ban_30d");
        assert_eq!(serde_json::to_value(SanctionType::BanPermanent).unwrap(), "ban_permanent");
    }

    #[test]
    fn remaining_ban_ignores_warnings_and_expired_bans() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let in_a_day = now + Duration::hours(24);
        let in_a_month = now + Duration::days(30);

        assert_eq!(remaining_ban([("warning", None)], now), None);
        assert_eq!(remaining_ban([("ban_1h", Some(now - Duration::minutes(5)))], now), None);
        assert_eq!(
            remaining_ban([("ban_24h", Some(in_a_day)), ("ban_30d", Some(in_a_month)), ("warning", None)], now),
            Some(BanTerm::Until(in_a_month))
        );
        assert_eq!(
            remaining_ban([("ban_permanent", None), ("ban_30d", Some(in_a_month))], now),
            Some(BanTerm::Permanent)
        );
    }

    #[test]
    fn verification_reviewed_once() {
        assert_eq!(VerificationStatus::Pending.review(true).unwrap(), VerificationStatus::Approved);
        assert_eq!(VerificationStatus::Pending.review(false).unwrap(), VerificationStatus::Rejected);
        let err = VerificationStatus::Approved.review(false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VerificationAlreadyReviewed);
    }

    #[test]
    fn report_review_rules() {
        assert_eq!(
            ReportStatus::Pending.review(ReportStatus::Dismissed).unwrap(),
            ReportStatus::Dismissed
        );
        assert_eq!(
            ReportStatus::Pending.review(ReportStatus::Pending).unwrap_err().code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            ReportStatus::Actioned.review(ReportStatus::Dismissed).unwrap_err().code(),
            ErrorCode::ReportAlreadyReviewed
        );
    }

    #[test]
    fn reason_is_trimmed_and_bounded() {
        assert_eq!(require_reason("  spam  ").unwrap(), "spam");
        assert!(require_reason("   ").is_err());
        assert!(require_reason(&"x".repeat(MAX_REASON_CHARS + 1)).is_err());
    }
}
