//! Status rules for interests, matches and proposals.
//!
//! Handlers load rows, ask these types whether a transition is legal, then
//! write the result inside a transaction. Nothing here touches the database.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use troth_shared::errors::{AppError, ErrorCode};
use troth_shared::types::account::AccountStatus;

// --- Interest ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterestStatus {
    Pending,
    Accepted,
    Declined,
    Withdrawn,
}

impl InterestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Withdrawn => "WITHDRAWN",
        }
    }

    /// Receiver's answer to a pending interest.
    pub fn respond(self, accept: bool) -> Result<Self, AppError> {
        match self {
            Self::Pending if accept => Ok(Self::Accepted),
            Self::Pending => Ok(Self::Declined),
            other => Err(AppError::new(
                ErrorCode::InterestAlreadyResolved,
                format!("interest is already {}", other.as_str().to_lowercase()),
            )),
        }
    }

    /// Sender cancelling before the receiver answered.
    pub fn withdraw(self) -> Result<Self, AppError> {
        match self {
            Self::Pending => Ok(Self::Withdrawn),
            other => Err(AppError::new(
                ErrorCode::InterestAlreadyResolved,
                format!("cannot withdraw an interest that is {}", other.as_str().to_lowercase()),
            )),
        }
    }
}

impl std::fmt::Display for InterestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InterestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "DECLINED" => Ok(Self::Declined),
            "WITHDRAWN" => Ok(Self::Withdrawn),
            _ => Err(format!("unknown interest status: {s}")),
        }
    }
}

// --- Proposal ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProposalAnswer {
    Pending,
    Yes,
    No,
}

impl ProposalAnswer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }

    /// Moves a pending proposal to `answer`. PENDING is not an answer.
    pub fn answer(self, answer: ProposalAnswer) -> Result<Self, AppError> {
        if answer == Self::Pending {
            return Err(AppError::new(ErrorCode::ValidationError, "answer must be YES or NO"));
        }
        match self {
            Self::Pending => Ok(answer),
            _ => Err(AppError::new(ErrorCode::ProposalAlreadyAnswered, "proposal was already answered")),
        }
    }
}

impl std::str::FromStr for ProposalAnswer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            _ => Err(format!("unknown proposal answer: {s}")),
        }
    }
}

// --- Match ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchSource {
    Interest,
    Favorite,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interest => "INTEREST",
            Self::Favorite => "FAVORITE",
        }
    }
}

/// Matches are stored once per pair with the smaller id first.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// The other member of a match, or `None` when `me` is not a member.
pub fn partner_of(user_a: Uuid, user_b: Uuid, me: Uuid) -> Option<Uuid> {
    if me == user_a {
        Some(user_b)
    } else if me == user_b {
        Some(user_a)
    } else {
        None
    }
}

// --- Interest quota ---

#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    pub limited: u64,
    pub verified: u64,
}

impl QuotaLimits {
    pub fn daily_limit(&self, status: AccountStatus) -> u64 {
        match status {
            AccountStatus::Limited => self.limited,
            AccountStatus::Verified => self.verified,
            AccountStatus::Banned => 0,
        }
    }
}

pub fn quota_key(user_id: Uuid, now: DateTime<Utc>) -> String {
    format!("interest:quota:{user_id}:{}", now.format("%Y-%m-%d"))
}

/// Seconds until the next UTC midnight, so daily counters reset with the date.
pub fn seconds_until_reset(now: DateTime<Utc>) -> u64 {
    let tomorrow = now.date_naive() + Duration::days(1);
    let reset = tomorrow.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).unwrap_or(now);
    (reset - now).num_seconds().max(1) as u64
}

// --- Age ---

pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Youngest and oldest age a search may ask for.
pub const SEARCH_AGE_RANGE: std::ops::RangeInclusive<u32> = 18..=120;

/// Birth date bounds for an inclusive age range: `(born_on_or_after, born_on_or_before)`.
///
/// Ages outside `SEARCH_AGE_RANGE`, or a minimum above the maximum, are
/// rejected as validation errors.
pub fn birth_date_bounds(
    today: NaiveDate,
    min_age: Option<u32>,
    max_age: Option<u32>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError> {
    for age in [min_age, max_age].into_iter().flatten() {
        if !SEARCH_AGE_RANGE.contains(&age) {
            return Err(AppError::Validation(format!(
                "age must be between {} and {}",
                SEARCH_AGE_RANGE.start(),
                SEARCH_AGE_RANGE.end()
            )));
        }
    }
    if let (Some(min), Some(max)) = (min_age, max_age) {
        if min > max {
            return Err(AppError::Validation("min_age must not exceed max_age".into()));
        }
    }

    // Ages are bounded above, so the year arithmetic cannot overflow
    let years_ago = |years: u32| {
        let year = today.year() - years as i32;
        today.with_year(year).or_else(|| (today - Duration::days(1)).with_year(year))
    };

    // Oldest allowed: turns max_age + 1 tomorrow
    let earliest = max_age
        .and_then(|max| years_ago(max + 1))
        .map(|d| d + Duration::days(1));
    let latest = min_age.and_then(years_ago);
    Ok((earliest, latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn pending_interest_can_be_accepted_or_declined() {
        assert_eq!(InterestStatus::Pending.respond(true).unwrap(), InterestStatus::Accepted);
        assert_eq!(InterestStatus::Pending.respond(false).unwrap(), InterestStatus::Declined);
    }

    #[test]
    fn resolved_interest_cannot_change() {
        for status in [InterestStatus::Accepted, InterestStatus::Declined, InterestStatus::Withdrawn] {
            let err = status.respond(true).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InterestAlreadyResolved);
            assert!(status.withdraw().is_err());
        }
    }

    #[test]
    fn only_pending_interest_can_be_withdrawn() {
        assert_eq!(InterestStatus::Pending.withdraw().unwrap(), InterestStatus::Withdrawn);
    }

    #[test]
    fn interest_status_parses_case_insensitively() {
        assert_eq!("accepted".parse::<InterestStatus>().unwrap(), InterestStatus::Accepted);
        assert!("maybe".parse::<InterestStatus>().is_err());
    }

    #[test]
    fn proposal_answers_once() {
        assert_eq!(ProposalAnswer::Pending.answer(ProposalAnswer::Yes).unwrap(), ProposalAnswer::Yes);
        let err = ProposalAnswer::No.answer(ProposalAnswer::Yes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProposalAlreadyAnswered);
    }

    #[test]
    fn pending_is_not_an_answer() {
        let err = ProposalAnswer::Pending.answer(ProposalAnswer::Pending).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn proposal_answer_wire_format() {
        let answer: ProposalAnswer = serde_json::from_str("\"YES\"").unwrap();
        assert_eq!(answer, ProposalAnswer::Yes);
        assert_eq!(serde_json::to_value(MatchSource::Favorite).unwrap(), "FAVORITE");
    }

    #[test]
    fn pair_order_is_stable() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert_eq!(canonical_pair(a, b), (a, b));
        assert_eq!(canonical_pair(b, a), (a, b));
    }

    #[test]
    fn partner_lookup() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert_eq!(partner_of(a, b, a), Some(b));
        assert_eq!(partner_of(a, b, b), Some(a));
        assert_eq!(partner_of(a, b, Uuid::from_u128(3)), None);
    }

    #[test]
    fn quota_depends_on_status() {
        let limits = QuotaLimits { limited: 5, verified: 50 };
        assert_eq!(limits.daily_limit(AccountStatus::Limited), 5);
        assert_eq!(limits.daily_limit(AccountStatus::Verified), 50);
        assert_eq!(limits.daily_limit(AccountStatus::Banned), 0);
    }

    #[test]
    fn quota_key_changes_with_the_day() {
        let user = Uuid::from_u128(7);
        let monday = Utc.with_ymd_and_hms(2026, 3, 2, 23, 59, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 3, 3, 0, 1, 0).unwrap();
        assert_ne!(quota_key(user, monday), quota_key(user, tuesday));
        assert!(quota_key(user, monday).ends_with("2026-03-02"));
    }

    #[test]
    fn reset_is_next_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 23, 0, 0).unwrap();
        assert_eq!(seconds_until_reset(now), 3600);
    }

    #[test]
    fn age_counts_birthday() {
        let birth = NaiveDate::from_ymd_opt(1995, 6, 15).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2026, 6, 14).unwrap()), 30);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()), 31);
    }

    #[test]
    fn birth_date_bounds_are_inclusive() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let (earliest, latest) = birth_date_bounds(today, Some(25), Some(30)).unwrap();
        let earliest = earliest.unwrap();
        let latest = latest.unwrap();

        // 25 today
        assert_eq!(latest, NaiveDate::from_ymd_opt(2001, 6, 15).unwrap());
        assert_eq!(age_on(latest, today), 25);
        // still 30, turns 31 tomorrow
        assert_eq!(earliest, NaiveDate::from_ymd_opt(1995, 6, 16).unwrap());
        assert_eq!(age_on(earliest, today), 30);
        assert_eq!(age_on(earliest - Duration::days(1), today), 31);
    }

    #[test]
    fn open_ended_age_range() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(birth_date_bounds(today, None, None).unwrap(), (None, None));
    }

    #[test]
    fn out_of_range_ages_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        for (min, max) in [(Some(17), None), (None, Some(u32::MAX)), (Some(u32::MAX), None), (Some(40), Some(30))] {
            let err = birth_date_bounds(today, min, max).unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationError);
        }
    }

    #[test]
    fn widest_age_range_is_accepted() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let (earliest, latest) = birth_date_bounds(today, Some(18), Some(120)).unwrap();
        assert_eq!(latest.unwrap(), NaiveDate::from_ymd_opt(2008, 2, 28).unwrap());
        assert_eq!(earliest.unwrap(), NaiveDate::from_ymd_opt(1905, 3, 1).unwrap());
    }
}
