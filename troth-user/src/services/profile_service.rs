use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::event::payloads::AccountStatusChanged;

use crate::models::{NewProfile, Profile};
use crate::schema::profiles;

/// Creates the empty profile for a newly registered user. Redelivered
/// events leave the existing profile untouched.
pub fn create_default_profile(conn: &mut PgConnection, user_id: Uuid, email: &str) -> AppResult<Profile> {
    let display_name = email.split('@').next().unwrap_or_default().chars().take(60).collect();

    let inserted = diesel::insert_into(profiles::table)
        .values(&NewProfile { user_id, display_name })
        .on_conflict(profiles::user_id)
        .do_nothing()
        .get_result::<Profile>(conn)
        .optional()?;

    match inserted {
        Some(profile) => {
            tracing::info!(profile_id = %profile.id, user_id = %user_id, "default profile created");
            Ok(profile)
        }
        None => find_by_user(conn, user_id),
    }
}

pub fn find_by_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Profile> {
    profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first::<Profile>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Profile of another member, hidden when they are banned or not discoverable.
pub fn find_visible(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Profile> {
    let profile = find_by_user(conn, user_id)?;
    if !profile.is_discoverable() {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
    }
    Ok(profile)
}

/// Loads profiles for both users under a row lock, smallest id first so two
/// requests on the same pair always lock in the same order.
pub fn lock_pair(conn: &mut PgConnection, a: Uuid, b: Uuid) -> AppResult<(Profile, Profile)> {
    let mut rows = profiles::table
        .filter(profiles::user_id.eq_any([a, b]))
        .order(profiles::user_id.asc())
        .for_update()
        .load::<Profile>(conn)?;

    let position = |id: Uuid| rows.iter().position(|p| p.user_id == id);
    let (Some(ia), Some(_)) = (position(a), position(b)) else {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
    };
    let first = rows.swap_remove(ia);
    let second = rows.pop().ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;
    Ok((first, second))
}

/// Mirrors the account status and trust score owned by the auth service.
pub fn mirror_account(conn: &mut PgConnection, data: &AccountStatusChanged) -> AppResult<usize> {
    let updated = diesel::update(profiles::table.filter(profiles::user_id.eq(data.user_id)))
        .set((
            profiles::account_status.eq(data.account_status.as_str()),
            profiles::trust_score.eq(data.trust_score),
            profiles::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    Ok(updated)
}
