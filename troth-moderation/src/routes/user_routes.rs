use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::api::ApiResponse;
use troth_shared::types::auth::AuthUser;

use crate::events::publisher;
use crate::models::{NewReport, Report};
use crate::rules::{self, ReportStatus};
use crate::schema::reports;
use crate::services::on_unique_violation;
use crate::AppState;

pub const REPORT_TYPES: [&str; 5] = ["fake_profile", "harassment", "inappropriate_content", "scam", "other"];

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub reported_id: Uuid,
    pub report_type: String,
    pub reason: String,
    pub context: Option<String>,
    pub message_id: Option<Uuid>,
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateReportRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    if auth.id == body.reported_id {
        return Err(AppError::new(ErrorCode::CannotReportSelf, "you cannot report yourself"));
    }
    if !REPORT_TYPES.contains(&body.report_type.as_str()) {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("report_type must be one of: {}", REPORT_TYPES.join(", ")),
        ));
    }
    let reason = rules::require_reason(&body.reason)?;

    let mut conn = get_conn(&state.db)?;

    let existing: i64 = reports::table
        .filter(reports::reporter_id.eq(auth.id))
        .filter(reports::reported_id.eq(body.reported_id))
        .filter(reports::status.eq(ReportStatus::Pending.as_str()))
        .count()
        .get_result(&mut conn)?;

    if existing > 0 {
        return Err(AppError::new(
            ErrorCode::DuplicateReport,
            "you already have a pending report against this user",
        ));
    }

    let report: Report = diesel::insert_into(reports::table)
        .values(&NewReport {
            reporter_id: auth.id,
            reported_id: body.reported_id,
            report_type: body.report_type,
            reason,
            context: body.context,
            message_id: body.message_id,
        })
        .get_result(&mut conn)
        .map_err(|e| {
            on_unique_violation(e, ErrorCode::DuplicateReport, "you already have a pending report against this user")
        })?;

    publisher::publish_report_created(&state.rabbitmq, &report).await;

    tracing::info!(report_id = %report.id, reporter_id = %auth.id, reported_id = %report.reported_id, "report created");

    Ok(Json(ApiResponse::ok(report)))
}
