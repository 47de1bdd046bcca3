//! Trust score arithmetic.
//!
//! The score is additive: every approved verification milestone contributes a
//! fixed number of points, and the total never leaves `0..=MAX_TRUST_SCORE`.
//! Account status follows the flags unless the account is banned.

use chrono::{DateTime, Utc};

use crate::types::account::{AccountStatus, BanTerm, VerificationFlags, VerificationKind};

pub const MAX_TRUST_SCORE: i32 = 100;

pub const EMAIL_POINTS: i32 = 10;
pub const PHONE_POINTS: i32 = 20;
pub const PHOTO_POINTS: i32 = 30;
pub const ID_POINTS: i32 = 40;

pub fn points_for(kind: VerificationKind) -> i32 {
    match kind {
        VerificationKind::Email => EMAIL_POINTS,
        VerificationKind::Phone => PHONE_POINTS,
        VerificationKind::Photo => PHOTO_POINTS,
        VerificationKind::Id => ID_POINTS,
    }
}

pub fn calculate_trust_score(flags: &VerificationFlags) -> i32 {
    VerificationKind::ALL
        .iter()
        .filter(|kind| flags.is_set(**kind))
        .map(|kind| points_for(*kind))
        .sum::<i32>()
        .clamp(0, MAX_TRUST_SCORE)
}

/// Result of approving a verification milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustUpdate {
    pub flags: VerificationFlags,
    pub trust_score: i32,
    pub account_status: AccountStatus,
    /// False when the milestone was already recorded.
    pub changed: bool,
}

pub fn apply_verification(
    flags: VerificationFlags,
    status: AccountStatus,
    kind: VerificationKind,
) -> TrustUpdate {
    let changed = !flags.is_set(kind);
    let flags = flags.with(kind);
    TrustUpdate {
        flags,
        trust_score: calculate_trust_score(&flags),
        account_status: derive_account_status(status, &flags),
        changed,
    }
}

/// Banned accounts stay banned; otherwise photo + ID verification promotes
/// the account to `Verified`.
pub fn derive_account_status(current: AccountStatus, flags: &VerificationFlags) -> AccountStatus {
    if current.is_banned() {
        return AccountStatus::Banned;
    }
    restored_status(flags)
}

/// Status an account returns to once a ban is lifted or expires.
pub fn restored_status(flags: &VerificationFlags) -> AccountStatus {
    if flags.photo && flags.id {
        AccountStatus::Verified
    } else {
        AccountStatus::Limited
    }
}

/// Where a banned account lands once one of its bans is lifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftOutcome {
    StillBanned(BanTerm),
    Restored(AccountStatus),
}

pub fn lift_outcome(flags: &VerificationFlags, remaining: Option<BanTerm>, now: DateTime<Utc>) -> LiftOutcome {
    match remaining {
        Some(term) if !term.is_over(now) => LiftOutcome::StillBanned(term),
        _ => LiftOutcome::Restored(restored_status(flags)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_flags() -> VerificationFlags {
        VerificationKind::ALL
            .iter()
            .fold(VerificationFlags::default(), |f, k| f.with(*k))
    }

    #[test]
    fn empty_flags_score_zero() {
        assert_eq!(calculate_trust_score(&VerificationFlags::default()), 0);
    }

    #[test]
    fn all_milestones_reach_max() {
        assert_eq!(calculate_trust_score(&all_flags()), MAX_TRUST_SCORE);
    }

    #[test]
    fn points_are_additive() {
        let flags = VerificationFlags::default()
            .with(VerificationKind::Email)
            .with(VerificationKind::Photo);
        assert_eq!(calculate_trust_score(&flags), EMAIL_POINTS + PHOTO_POINTS);
    }

    #[test]
    fn approving_twice_does_not_double_count() {
        let first = apply_verification(
            VerificationFlags::default(),
            AccountStatus::Limited,
            VerificationKind::Phone,
        );
        assert!(first.changed);
        assert_eq!(first.trust_score, PHONE_POINTS);

        let second = apply_verification(first.flags, first.account_status, VerificationKind::Phone);
        assert!(!second.changed);
        assert_eq!(second.trust_score, PHONE_POINTS);
    }

    #[test]
    fn photo_and_id_promote_to_verified() {
        let after_photo = apply_verification(
            VerificationFlags::default(),
            AccountStatus::Limited,
            VerificationKind::Photo,
        );
        assert_eq!(after_photo.account_status, AccountStatus::Limited);

        let after_id = apply_verification(after_photo.flags, after_photo.account_status, VerificationKind::Id);
        assert_eq!(after_id.account_status, AccountStatus::Verified);
        assert_eq!(after_id.trust_score, PHOTO_POINTS + ID_POINTS);
    }

    #[test]
    fn banned_account_stays_banned_but_scores() {
        let update = apply_verification(
            VerificationFlags::default().with(VerificationKind::Photo),
            AccountStatus::Banned,
            VerificationKind::Id,
        );
        assert_eq!(update.account_status, AccountStatus::Banned);
        assert_eq!(update.trust_score, PHOTO_POINTS + ID_POINTS);
    }

    #[test]
    fn restored_status_ignores_previous_ban() {
        assert_eq!(restored_status(&all_flags()), AccountStatus::Verified);
        assert_eq!(restored_status(&VerificationFlags::default()), AccountStatus::Limited);
    }

    #[test]
    fn lift_keeps_ban_while_another_remains() {
        let now = Utc::now();
        let later = now + chrono::Duration::days(3);
        assert_eq!(
            lift_outcome(&all_flags(), Some(BanTerm::Permanent), now),
            LiftOutcome::StillBanned(BanTerm::Permanent)
        );
        assert_eq!(
            lift_outcome(&all_flags(), Some(BanTerm::Until(later)), now),
            LiftOutcome::StillBanned(BanTerm::Until(later))
        );
    }

    #[test]
    fn lift_restores_when_nothing_binds() {
        let now = Utc::now();
        assert_eq!(
            lift_outcome(&all_flags(), None, now),
            LiftOutcome::Restored(AccountStatus::Verified)
        );
        let lapsed = BanTerm::Until(now - chrono::Duration::minutes(1));
        assert_eq!(
            lift_outcome(&VerificationFlags::default(), Some(lapsed), now),
            LiftOutcome::Restored(AccountStatus::Limited)
        );
    }
}
