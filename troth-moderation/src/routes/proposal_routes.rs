use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::middleware::AdminUser;
use troth_shared::types::api::ApiResponse;
use troth_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::ProposalAlert;
use crate::schema::proposal_alerts;
use crate::services::audit_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub acknowledged: Option<bool>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl AlertFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams { page: self.page, per_page: self.per_page }
    }

    fn filtered(&self) -> proposal_alerts::BoxedQuery<'_, Pg> {
        let mut query = proposal_alerts::table.into_boxed();
        match self.acknowledged {
            Some(true) => query = query.filter(proposal_alerts::acknowledged_at.is_not_null()),
            Some(false) => query = query.filter(proposal_alerts::acknowledged_at.is_null()),
            None => {}
        }
        query
    }
}

/// GET /admin/proposals?acknowledged
pub async fn list_proposal_alerts(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<AlertFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<ProposalAlert>>>> {
    let mut conn = get_conn(&state.db)?;
    let pagination = params.pagination();

    let items = params
        .filtered()
        .order(proposal_alerts::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<ProposalAlert>(&mut conn)?;
    let total: i64 = params.filtered().count().get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

/// PUT /admin/proposals/:id/acknowledge
///
/// Acknowledging twice returns the alert unchanged, keeping the first
/// acknowledger.
pub async fn acknowledge_proposal_alert(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProposalAlert>>> {
    let mut conn = get_conn(&state.db)?;

    let alert = conn.transaction::<_, AppError, _>(|conn| {
        let alert = proposal_alerts::table
            .find(alert_id)
            .for_update()
            .first::<ProposalAlert>(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ProposalAlertNotFound, "proposal alert not found"))?;

        if alert.acknowledged_at.is_some() {
            return Ok(alert);
        }

        let acknowledged = diesel::update(proposal_alerts::table.find(alert.id))
            .set((
                proposal_alerts::acknowledged_by.eq(admin.id),
                proposal_alerts::acknowledged_at.eq(Utc::now()),
            ))
            .get_result::<ProposalAlert>(conn)?;

        audit_service::record(
            conn,
            admin.id,
            "acknowledge_proposal",
            None,
            serde_json::json!({
                "alert_id": acknowledged.id,
                "proposal_id": acknowledged.proposal_id,
                "match_id": acknowledged.match_id,
            }),
        )?;
        Ok(acknowledged)
    })?;

    Ok(Json(ApiResponse::ok(alert)))
}
