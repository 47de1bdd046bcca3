use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::middleware::{AdminUser, ModeratorUser};
use troth_shared::types::api::ApiResponse;
use troth_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{AdminAction, Report, Sanction};
use crate::rules::{self, ReportStatus, SanctionType, VerificationStatus};
use crate::schema::{admin_actions, proposal_alerts, reports, sanctions, verifications};
use crate::services::audit_service;
use crate::services::sanction_service::{self, SanctionRequest};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct ReportFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<ReportStatus>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl ReportFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }

    fn filtered(&self) -> reports::BoxedQuery<'_, Pg> {
        let mut query = reports::table.into_boxed();
        if let Some(status) = self.status {
            query = query.filter(reports::status.eq(status.as_str()));
        }
        query
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewReportRequest {
    pub status: ReportStatus,
    /// Only applied when the report is actioned
    pub sanction_type: Option<SanctionType>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportReview {
    pub report: Report,
    pub sanction: Option<Sanction>,
}

#[derive(Debug, Deserialize)]
pub struct IssueSanctionRequest {
    pub sanction_type: SanctionType,
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub pending_reports: i64,
    pub reports_today: i64,
    pub active_sanctions: i64,
    pub pending_verifications: i64,
    pub open_proposal_alerts: i64,
}

fn report_not_found() -> AppError {
    AppError::new(ErrorCode::ReportNotFound, "report not found")
}

// --- Reports ---

/// GET /admin/reports?status
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    _staff: ModeratorUser,
    Query(params): Query<ReportFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Report>>>> {
    let mut conn = get_conn(&state.db)?;
    let pagination = params.pagination();

    let items = params
        .filtered()
        .order(reports::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Report>(&mut conn)?;
    let total: i64 = params.filtered().count().get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    _staff: ModeratorUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let mut conn = get_conn(&state.db)?;

    let report = reports::table
        .find(report_id)
        .first::<Report>(&mut conn)
        .optional()?
        .ok_or_else(report_not_found)?;

    Ok(Json(ApiResponse::ok(report)))
}

/// PUT /admin/reports/:id/review
///
/// Closes a pending report as `actioned` or `dismissed`. An actioned report
/// may carry a sanction against the reported user, issued in the same
/// transaction and linked back to the report.
pub async fn review_report(
    State(state): State<Arc<AppState>>,
    ModeratorUser(staff): ModeratorUser,
    Path(report_id): Path<Uuid>,
    Json(body): Json<ReviewReportRequest>,
) -> AppResult<Json<ApiResponse<ReportReview>>> {
    let reason = body.reason.as_deref().map(rules::require_reason).transpose()?;
    let mut conn = get_conn(&state.db)?;

    let review = conn.transaction::<_, AppError, _>(|conn| {
        let report = reports::table
            .find(report_id)
            .for_update()
            .first::<Report>(conn)
            .optional()?
            .ok_or_else(report_not_found)?;

        let decision = report.status().review(body.status)?;

        let report = diesel::update(reports::table.find(report.id))
            .set((
                reports::status.eq(decision.as_str()),
                reports::reviewed_by.eq(staff.id),
                reports::reviewed_at.eq(Utc::now()),
            ))
            .get_result::<Report>(conn)?;

        let sanction = match (decision, body.sanction_type) {
            (ReportStatus::Actioned, Some(sanction_type)) => Some(sanction_service::issue(
                conn,
                staff.id,
                SanctionRequest {
                    user_id: report.reported_id,
                    sanction_type,
                    reason: reason.clone().unwrap_or_else(|| report.reason.clone()),
                    report_id: Some(report.id),
                    expires_at: None,
                },
            )?),
            _ => None,
        };

        audit_service::record(
            conn,
            staff.id,
            &format!("review_report_{}", decision.as_str()),
            Some(report.reported_id),
            serde_json::json!({
                "report_id": report.id,
                "status": decision,
                "sanction_id": sanction.as_ref().map(|s| s.id),
                "sanction_type": sanction.as_ref().map(|s| s.sanction_type.clone()),
            }),
        )?;

        Ok(ReportReview { report, sanction })
    })?;

    if let Some(ref sanction) = review.sanction {
        publisher::publish_sanction_issued(&state.rabbitmq, sanction).await;
    }

    tracing::info!(
        report_id = %review.report.id,
        reviewer_id = %staff.id,
        status = %review.report.status,
        sanctioned = review.sanction.is_some(),
        "report reviewed"
    );

    Ok(Json(ApiResponse::ok(review)))
}

// --- Sanctions ---

/// Full sanction history for one user, newest first.
pub async fn get_user_sanctions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Sanction>>>> {
    let mut conn = get_conn(&state.db)?;

    let history = sanctions::table
        .filter(sanctions::user_id.eq(user_id))
        .order(sanctions::created_at.desc())
        .load::<Sanction>(&mut conn)?;

    Ok(Json(ApiResponse::ok(history)))
}

pub async fn issue_sanction(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<IssueSanctionRequest>,
) -> AppResult<Json<ApiResponse<Sanction>>> {
    if user_id == admin.id {
        return Err(AppError::new(ErrorCode::Forbidden, "you cannot sanction yourself"));
    }
    let reason = rules::require_reason(&body.reason)?;
    let mut conn = get_conn(&state.db)?;

    let sanction = conn.transaction::<_, AppError, _>(|conn| {
        let sanction = sanction_service::issue(
            conn,
            admin.id,
            SanctionRequest {
                user_id,
                sanction_type: body.sanction_type,
                reason,
                report_id: None,
                expires_at: body.expires_at,
            },
        )?;

        audit_service::record(
            conn,
            admin.id,
            "issue_sanction",
            Some(user_id),
            serde_json::json!({
                "sanction_id": sanction.id,
                "sanction_type": sanction.sanction_type,
                "reason": sanction.reason,
                "expires_at": sanction.expires_at,
            }),
        )?;
        Ok(sanction)
    })?;

    publisher::publish_sanction_issued(&state.rabbitmq, &sanction).await;

    Ok(Json(ApiResponse::ok_with_message(sanction, "sanction issued")))
}

/// DELETE /admin/users/:id/sanction/:sid
pub async fn lift_sanction(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path((user_id, sanction_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<Sanction>>> {
    let mut conn = get_conn(&state.db)?;

    let lifted = sanction_service::lift(&mut conn, user_id, sanction_id)?;

    audit_service::record(
        &mut conn,
        admin.id,
        "lift_sanction",
        Some(user_id),
        serde_json::json!({
            "sanction_id": lifted.id,
            "sanction_type": lifted.sanction_type,
        }),
    )?;

    // Only bans change the account; lifting one reports what still binds
    if lifted.kind().map_or(false, |t| t.is_ban()) {
        let remaining_ban = sanction_service::remaining_ban(&mut conn, user_id, Utc::now())?;
        publisher::publish_sanction_lifted(&state.rabbitmq, &lifted, remaining_ban).await;
    }

    tracing::info!(sanction_id = %lifted.id, user_id = %user_id, admin_id = %admin.id, "sanction lifted");

    Ok(Json(ApiResponse::ok_with_message(lifted, "sanction lifted")))
}

/// Sanctions still in force: active and not yet expired.
pub async fn list_active_sanctions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Sanction>>>> {
    let mut conn = get_conn(&state.db)?;
    let now = Utc::now();

    let items = sanction_service::in_force(now)
        .order(sanctions::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load::<Sanction>(&mut conn)?;
    let total: i64 = sanction_service::in_force(now).count().get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

// --- Dashboard ---

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let mut conn = get_conn(&state.db)?;
    let now = Utc::now();

    let pending_reports: i64 = reports::table
        .filter(reports::status.eq(ReportStatus::Pending.as_str()))
        .count()
        .get_result(&mut conn)?;

    let reports_today: i64 = reports::table
        .filter(reports::created_at.ge(start_of_day(now)))
        .count()
        .get_result(&mut conn)?;

    let active_sanctions: i64 = sanction_service::in_force(now).count().get_result(&mut conn)?;

    let pending_verifications: i64 = verifications::table
        .filter(verifications::status.eq(VerificationStatus::Pending.as_str()))
        .count()
        .get_result(&mut conn)?;

    let open_proposal_alerts: i64 = proposal_alerts::table
        .filter(proposal_alerts::acknowledged_at.is_null())
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(DashboardStats {
        pending_reports,
        reports_today,
        active_sanctions,
        pending_verifications,
        open_proposal_alerts,
    })))
}

// --- Audit log ---

pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<AdminAction>>>> {
    let mut conn = get_conn(&state.db)?;

    let items = admin_actions::table
        .order(admin_actions::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load::<AdminAction>(&mut conn)?;
    let total: i64 = admin_actions::table.count().get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_starts_at_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 4, 12, 17, 45, 3).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2026, 4, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn review_request_uses_wire_names() {
        let body: ReviewReportRequest = serde_json::from_value(serde_json::json!({
            "status": "actioned",
            "sanction_type": "ban_24h",
        }))
        .unwrap();
        assert_eq!(body.status, ReportStatus::Actioned);
        assert_eq!(body.sanction_type, Some(SanctionType::Ban24h));
        assert!(body.reason.is_none());

        let bad = serde_json::from_value::<ReviewReportRequest>(serde_json::json!({
            "status": "actioned",
            "sanction_type": "ban_forever",
        }));
        assert!(bad.is_err());
    }
}
