//! Account state transitions: verification milestones, trust score and
//! status changes. Every write happens under a row lock so concurrent
//! reviews of the same user cannot lose a flag.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::errors::{AppError, ErrorCode};
use troth_shared::trust::{self, LiftOutcome, TrustUpdate};
use troth_shared::types::account::{AccountStatus, BanTerm, VerificationKind};

use crate::models::User;
use crate::schema::users;

pub fn find_user(conn: &mut PgConnection, user_id: Uuid) -> Result<User, AppError> {
    users::table
        .find(user_id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
}

fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> Result<User, AppError> {
    users::table
        .find(user_id)
        .for_update()
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
}

/// Records an approved verification milestone, recomputing the trust score
/// and the derived account status.
pub fn process_verification(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: VerificationKind,
) -> Result<(User, TrustUpdate), AppError> {
    conn.transaction::<_, AppError, _>(|conn| {
        let user = lock_user(conn, user_id)?;
        let update = trust::apply_verification(user.flags(), user.status(), kind);
        if !update.changed {
            return Ok((user, update));
        }

        let user = diesel::update(users::table.find(user_id))
            .set((
                users::email_verified.eq(update.flags.email),
                users::phone_verified.eq(update.flags.phone),
                users::photo_verified.eq(update.flags.photo),
                users::id_verified.eq(update.flags.id),
                users::trust_score.eq(update.trust_score),
                users::account_status.eq(update.account_status.as_str()),
                users::updated_at.eq(Utc::now()),
            ))
            .get_result::<User>(conn)?;

        tracing::info!(
            user_id = %user_id,
            kind = %kind,
            trust_score = update.trust_score,
            account_status = %update.account_status,
            "verification applied"
        );
        Ok((user, update))
    })
}

/// Recomputes the trust score from the stored flags.
pub fn recalculate_trust(conn: &mut PgConnection, user_id: Uuid) -> Result<User, AppError> {
    conn.transaction::<_, AppError, _>(|conn| {
        let user = lock_user(conn, user_id)?;
        let score = trust::calculate_trust_score(&user.flags());
        if score == user.trust_score {
            return Ok(user);
        }
        let user = diesel::update(users::table.find(user_id))
            .set((users::trust_score.eq(score), users::updated_at.eq(Utc::now())))
            .get_result::<User>(conn)?;
        tracing::info!(user_id = %user_id, trust_score = score, "trust score recalculated");
        Ok(user)
    })
}

/// Sets the status directly. Leaving BANNED clears any ban expiry.
pub fn set_status(
    conn: &mut PgConnection,
    user_id: Uuid,
    status: AccountStatus,
) -> Result<User, AppError> {
    let ban_until: Option<DateTime<Utc>> = None;
    let user = diesel::update(users::table.find(user_id))
        .set((
            users::account_status.eq(status.as_str()),
            users::ban_until.eq(ban_until),
            users::updated_at.eq(Utc::now()),
        ))
        .get_result::<User>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;
    tracing::info!(user_id = %user_id, account_status = %status, "account status set");
    Ok(user)
}

/// Bans the account until `ban_until`, or permanently when `None`. A ban
/// already in force is only ever extended.
pub fn apply_ban(
    conn: &mut PgConnection,
    user_id: Uuid,
    ban_until: Option<DateTime<Utc>>,
) -> Result<User, AppError> {
    conn.transaction::<_, AppError, _>(|conn| {
        let user = lock_user(conn, user_id)?;
        let term = user.extended_ban(BanTerm::from_expiry(ban_until), Utc::now());
        let user = write_ban(conn, user_id, term)?;
        tracing::info!(user_id = %user_id, ban_until = ?user.ban_until, "account banned");
        Ok(user)
    })
}

fn write_ban(conn: &mut PgConnection, user_id: Uuid, term: BanTerm) -> Result<User, AppError> {
    let user = diesel::update(users::table.find(user_id))
        .set((
            users::account_status.eq(AccountStatus::Banned.as_str()),
            users::ban_until.eq(term.expiry()),
            users::updated_at.eq(Utc::now()),
        ))
        .get_result::<User>(conn)?;
    Ok(user)
}

/// Settles a banned account after one of its bans is lifted: it stays
/// banned for `remaining` when that still binds, otherwise it gets back the
/// status its flags earn. Returns `None` when nothing changed.
pub fn lift_ban(
    conn: &mut PgConnection,
    user_id: Uuid,
    remaining: Option<BanTerm>,
) -> Result<Option<User>, AppError> {
    conn.transaction::<_, AppError, _>(|conn| {
        let user = lock_user(conn, user_id)?;
        if !user.status().is_banned() {
            return Ok(None);
        }
        match trust::lift_outcome(&user.flags(), remaining, Utc::now()) {
            LiftOutcome::StillBanned(term) if term.expiry() == user.ban_until => Ok(None),
            LiftOutcome::StillBanned(term) => {
                let user = write_ban(conn, user_id, term)?;
                tracing::info!(user_id = %user_id, ban_until = ?user.ban_until, "ban shortened to remaining sanction");
                Ok(Some(user))
            }
            LiftOutcome::Restored(status) => Ok(Some(set_status(conn, user_id, status)?)),
        }
    })
}
