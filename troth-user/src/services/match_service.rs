use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::errors::{AppError, AppResult, ErrorCode};

use crate::lifecycle::{canonical_pair, MatchSource, ProposalAnswer};
use crate::models::{Match, NewMatch};
use crate::schema::{matches, proposals};

pub fn find_between(conn: &mut PgConnection, a: Uuid, b: Uuid) -> AppResult<Option<Match>> {
    let (user_a, user_b) = canonical_pair(a, b);
    let found = matches::table
        .filter(matches::user_a_id.eq(user_a))
        .filter(matches::user_b_id.eq(user_b))
        .first::<Match>(conn)
        .optional()?;
    Ok(found)
}

/// Creates the match for a pair unless it already exists. The unique index
/// on the canonical pair makes this safe under concurrent callers; the flag
/// tells whether this call created it.
pub fn ensure_match(
    conn: &mut PgConnection,
    a: Uuid,
    b: Uuid,
    source: MatchSource,
) -> AppResult<(Match, bool)> {
    let (user_a_id, user_b_id) = canonical_pair(a, b);

    let inserted = diesel::insert_into(matches::table)
        .values(&NewMatch { user_a_id, user_b_id, source: source.as_str().to_string() })
        .on_conflict((matches::user_a_id, matches::user_b_id))
        .do_nothing()
        .get_result::<Match>(conn)
        .optional()?;

    match inserted {
        Some(created) => {
            tracing::info!(match_id = %created.id, source = source.as_str(), "match created");
            Ok((created, true))
        }
        None => {
            let existing = find_between(conn, a, b)?
                .ok_or_else(|| AppError::internal("match vanished during creation"))?;
            Ok((existing, false))
        }
    }
}

/// Loads a match the caller belongs to, locking it for the transaction.
pub fn lock_for_member(conn: &mut PgConnection, match_id: Uuid, user_id: Uuid) -> AppResult<Match> {
    let found = matches::table
        .find(match_id)
        .for_update()
        .first::<Match>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    if found.partner_of(user_id).is_none() {
        return Err(AppError::new(ErrorCode::MatchNotFound, "match not found"));
    }
    Ok(found)
}

/// Deletes the match and closes its pending proposals with a NO answer.
/// Returns the number of proposals closed.
pub fn remove_match(conn: &mut PgConnection, found: &Match) -> AppResult<usize> {
    let now = Utc::now();
    let closed = diesel::update(
        proposals::table
            .filter(proposals::match_id.eq(found.id))
            .filter(proposals::answer.eq(ProposalAnswer::Pending.as_str())),
    )
    .set((
        proposals::answer.eq(ProposalAnswer::No.as_str()),
        proposals::answered_at.eq(Some(now)),
        proposals::updated_at.eq(now),
    ))
    .execute(conn)?;

    diesel::delete(matches::table.find(found.id)).execute(conn)?;
    Ok(closed)
}
