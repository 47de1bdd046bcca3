use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::errors::AppResult;

use crate::models::NewAdminAction;
use crate::schema::admin_actions;

/// Append an entry to the admin audit log.
pub fn record(
    conn: &mut PgConnection,
    admin_id: Uuid,
    action: &str,
    target_user_id: Option<Uuid>,
    details: serde_json::Value,
) -> AppResult<()> {
    diesel::insert_into(admin_actions::table)
        .values(&NewAdminAction {
            admin_id,
            action: action.to_string(),
            target_user_id,
            details: Some(details),
        })
        .execute(conn)?;

    tracing::info!(admin_id = %admin_id, action = %action, target_user_id = ?target_user_id, "admin action recorded");
    Ok(())
}
