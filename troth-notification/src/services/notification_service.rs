use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::clients::db::{get_conn, DbPool};
use troth_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewNotification, Notification};
use crate::schema::notifications;

fn not_found() -> AppError {
    AppError::new(ErrorCode::NotificationNotFound, "notification not found")
}

/// Insert a batch of notifications built from one event.
pub fn create_notifications(pool: &DbPool, drafts: &[NewNotification]) -> AppResult<Vec<Notification>> {
    if drafts.is_empty() {
        return Ok(Vec::new());
    }
    let mut conn = get_conn(pool)?;

    let created = diesel::insert_into(notifications::table)
        .values(drafts)
        .get_results::<Notification>(&mut conn)?;

    for notification in &created {
        tracing::debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            notification_type = %notification.notification_type,
            "notification created"
        );
    }

    Ok(created)
}

/// List notifications for a user with pagination.
pub fn list_notifications(
    pool: &DbPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<Notification>, i64)> {
    let mut conn = get_conn(pool)?;

    let total: i64 = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .count()
        .get_result(&mut conn)?;

    let items = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .order(notifications::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load::<Notification>(&mut conn)?;

    Ok((items, total))
}

pub fn count_unread(pool: &DbPool, user_id: Uuid) -> AppResult<i64> {
    let mut conn = get_conn(pool)?;

    let count: i64 = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .filter(notifications::is_read.eq(false))
        .count()
        .get_result(&mut conn)?;

    Ok(count)
}

pub fn mark_all_read(pool: &DbPool, user_id: Uuid) -> AppResult<usize> {
    let mut conn = get_conn(pool)?;

    let updated = diesel::update(
        notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false)),
    )
    .set(notifications::is_read.eq(true))
    .execute(&mut conn)?;

    Ok(updated)
}

/// Mark a single notification as read (only if it belongs to the user).
pub fn mark_read(pool: &DbPool, notification_id: Uuid, user_id: Uuid) -> AppResult<Notification> {
    let mut conn = get_conn(pool)?;

    diesel::update(
        notifications::table
            .filter(notifications::id.eq(notification_id))
            .filter(notifications::user_id.eq(user_id)),
    )
    .set(notifications::is_read.eq(true))
    .get_result::<Notification>(&mut conn)
    .optional()?
    .ok_or_else(not_found)
}

pub fn delete_notification(pool: &DbPool, notification_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let mut conn = get_conn(pool)?;

    let deleted = diesel::delete(
        notifications::table
            .filter(notifications::id.eq(notification_id))
            .filter(notifications::user_id.eq(user_id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(not_found());
    }
    Ok(())
}
