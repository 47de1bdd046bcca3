use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::account::BanTerm;

use crate::models::{NewSanction, Sanction};
use crate::rules::{self, SanctionType};
use crate::schema::sanctions;

pub struct SanctionRequest {
    pub user_id: Uuid,
    pub sanction_type: SanctionType,
    pub reason: String,
    pub report_id: Option<Uuid>,
    /// Overrides the length implied by the sanction type
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn issue(conn: &mut PgConnection, issued_by: Uuid, request: SanctionRequest) -> AppResult<Sanction> {
    let now = Utc::now();
    let expires_at = match request.expires_at {
        Some(at) if at <= now => {
            return Err(AppError::new(ErrorCode::ValidationError, "expires_at must be in the future"));
        }
        Some(at) if request.sanction_type.is_ban() => Some(at),
        _ => request.sanction_type.expires_at(now),
    };

    let sanction = diesel::insert_into(sanctions::table)
        .values(&NewSanction {
            user_id: request.user_id,
            report_id: request.report_id,
            sanction_type: request.sanction_type.as_str().to_string(),
            reason: request.reason,
            issued_by,
            expires_at,
        })
        .get_result::<Sanction>(conn)?;

    tracing::info!(
        sanction_id = %sanction.id,
        user_id = %sanction.user_id,
        sanction_type = %sanction.sanction_type,
        expires_at = ?sanction.expires_at,
        "sanction issued"
    );
    Ok(sanction)
}

/// Deactivates an active sanction belonging to `user_id`.
pub fn lift(conn: &mut PgConnection, user_id: Uuid, sanction_id: Uuid) -> AppResult<Sanction> {
    conn.transaction::<_, AppError, _>(|conn| {
        let sanction = sanctions::table
            .find(sanction_id)
            .filter(sanctions::user_id.eq(user_id))
            .filter(sanctions::is_active.eq(true))
            .for_update()
            .first::<Sanction>(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::SanctionNotFound, "no active sanction found for this user"))?;

        let lifted = diesel::update(sanctions::table.find(sanction.id))
            .set(sanctions::is_active.eq(false))
            .get_result::<Sanction>(conn)?;
        Ok(lifted)
    })
}

/// Active sanctions whose end has not passed.
pub fn in_force(now: DateTime<Utc>) -> sanctions::BoxedQuery<'static, diesel::pg::Pg> {
    sanctions::table
        .filter(sanctions::is_active.eq(true))
        .filter(sanctions::expires_at.is_null().or(sanctions::expires_at.gt(now)))
        .into_boxed()
}

/// Longest ban still in force for `user_id`, if any.
pub fn remaining_ban(conn: &mut PgConnection, user_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<BanTerm>> {
    let rows: Vec<(String, Option<DateTime<Utc>>)> = in_force(now)
        .filter(sanctions::user_id.eq(user_id))
        .filter(sanctions::sanction_type.ne(SanctionType::Warning.as_str()))
        .select((sanctions::sanction_type, sanctions::expires_at))
        .load(conn)?;

    Ok(rules::remaining_ban(rows.iter().map(|(kind, at)| (kind.as_str(), *at)), now))
}
