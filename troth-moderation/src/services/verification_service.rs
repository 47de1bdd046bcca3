use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::account::VerificationKind;

use crate::models::{NewVerification, Verification};
use crate::rules::VerificationStatus;
use crate::schema::verifications;
use crate::services::on_unique_violation;

fn not_found() -> AppError {
    AppError::new(ErrorCode::VerificationNotFound, "verification not found")
}

/// Opens a request. The partial unique index allows one PENDING request per
/// user and document type, so concurrent submissions cannot both land.
pub fn submit(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: VerificationKind,
    document_url: Option<String>,
) -> AppResult<Verification> {
    let verification = diesel::insert_into(verifications::table)
        .values(&NewVerification {
            user_id,
            document_type: kind.as_str().to_string(),
            document_url,
        })
        .get_result::<Verification>(conn)
        .map_err(|e| {
            on_unique_violation(
                e,
                ErrorCode::VerificationAlreadyPending,
                "a request for this document type is already pending review",
            )
        })?;

    tracing::info!(
        verification_id = %verification.id,
        user_id = %user_id,
        document_type = %kind,
        "verification submitted"
    );
    Ok(verification)
}

pub fn has_pending(conn: &mut PgConnection, user_id: Uuid, kind: VerificationKind) -> AppResult<bool> {
    let pending: i64 = verifications::table
        .filter(verifications::user_id.eq(user_id))
        .filter(verifications::document_type.eq(kind.as_str()))
        .filter(verifications::status.eq(VerificationStatus::Pending.as_str()))
        .count()
        .get_result(conn)?;
    Ok(pending > 0)
}

pub fn find(conn: &mut PgConnection, verification_id: Uuid) -> AppResult<Verification> {
    verifications::table
        .find(verification_id)
        .first::<Verification>(conn)
        .optional()?
        .ok_or_else(not_found)
}

/// Records the decision on a pending request.
pub fn review(
    conn: &mut PgConnection,
    verification_id: Uuid,
    reviewer_id: Uuid,
    approve: bool,
    notes: Option<String>,
) -> AppResult<Verification> {
    conn.transaction::<_, AppError, _>(|conn| {
        let current = verifications::table
            .find(verification_id)
            .for_update()
            .first::<Verification>(conn)
            .optional()?
            .ok_or_else(not_found)?;

        let next = current.status().review(approve)?;
        let now = Utc::now();

        let reviewed = diesel::update(verifications::table.find(verification_id))
            .set((
                verifications::status.eq(next.as_str()),
                verifications::reviewed_by.eq(Some(reviewer_id)),
                verifications::notes.eq(notes),
                verifications::reviewed_at.eq(Some(now)),
                verifications::updated_at.eq(now),
            ))
            .get_result::<Verification>(conn)?;
        Ok(reviewed)
    })
}
