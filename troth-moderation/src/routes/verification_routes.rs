use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::clients::minio::document_extension;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::middleware::ModeratorUser;
use troth_shared::types::account::VerificationKind;
use troth_shared::types::api::ApiResponse;
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::Verification;
use crate::rules::VerificationStatus;
use crate::schema::verifications;
use crate::services::{audit_service, verification_service};
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct SubmitVerificationRequest {
    pub document_type: VerificationKind,
    pub document_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<VerificationStatus>,
    pub document_type: Option<VerificationKind>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl VerificationFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams { page: self.page, per_page: self.per_page }
    }

    fn filtered(&self) -> verifications::BoxedQuery<'_, Pg> {
        let mut query = verifications::table.into_boxed();
        if let Some(status) = self.status {
            query = query.filter(verifications::status.eq(status.as_str()));
        }
        if let Some(kind) = self.document_type {
            query = query.filter(verifications::document_type.eq(kind.as_str()));
        }
        query
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewVerificationRequest {
    pub approve: bool,
    pub notes: Option<String>,
}

// --- Member endpoints ---

/// POST /verifications
pub async fn submit_verification(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SubmitVerificationRequest>,
) -> AppResult<Json<ApiResponse<Verification>>> {
    let document_url = body.document_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    let mut conn = get_conn(&state.db)?;
    let verification = verification_service::submit(&mut conn, auth.id, body.document_type, document_url)?;

    Ok(Json(ApiResponse::ok_with_message(verification, "verification submitted for review")))
}

/// POST /verifications/upload
///
/// Multipart form with a `document_type` text field and a `file` field
/// (jpeg, png, webp or pdf).
pub async fn upload_verification(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<Verification>>> {
    let upload_error = |msg: String| AppError::new(ErrorCode::DocumentUploadFailed, msg);

    let mut kind: Option<VerificationKind> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(format!("failed to read multipart: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("document_type") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(format!("failed to read document_type: {e}")))?;
                let parsed = text
                    .parse::<VerificationKind>()
                    .map_err(|e| AppError::new(ErrorCode::ValidationError, e))?;
                kind = Some(parsed);
            }
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error(format!("failed to read file data: {e}")))?;
                file = Some((content_type, data.to_vec()));
            }
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| AppError::new(ErrorCode::ValidationError, "document_type is required"))?;
    let (content_type, data) = file.ok_or_else(|| upload_error("no file provided".into()))?;
    if data.is_empty() {
        return Err(upload_error("file is empty".into()));
    }
    let ext = document_extension(&content_type)
        .ok_or_else(|| upload_error("unsupported document format, accepted: jpeg, png, webp, pdf".into()))?;

    // Refuse before uploading so rejected requests leave no stray objects
    {
        let mut conn = get_conn(&state.db)?;
        if verification_service::has_pending(&mut conn, auth.id, kind)? {
            return Err(AppError::new(
                ErrorCode::VerificationAlreadyPending,
                "a request for this document type is already pending review",
            ));
        }
    }

    let key = format!("verifications/{}/{}/{}.{}", auth.id, kind.as_str().to_lowercase(), Uuid::now_v7(), ext);
    let document_url = state
        .minio
        .upload(&key, data, &content_type)
        .await
        .map_err(upload_error)?;

    let mut conn = get_conn(&state.db)?;
    let verification = verification_service::submit(&mut conn, auth.id, kind, Some(document_url))?;

    Ok(Json(ApiResponse::ok_with_message(verification, "verification submitted for review")))
}

/// GET /verifications/mine
pub async fn my_verifications(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Verification>>>> {
    let mut conn = get_conn(&state.db)?;
    let items = verifications::table
        .filter(verifications::user_id.eq(auth.id))
        .order(verifications::created_at.desc())
        .load::<Verification>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

// --- Staff endpoints ---

/// GET /admin/verifications?status&document_type
pub async fn list_verifications(
    State(state): State<Arc<AppState>>,
    _staff: ModeratorUser,
    Query(params): Query<VerificationFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Verification>>>> {
    let mut conn = get_conn(&state.db)?;
    let pagination = params.pagination();

    // Oldest first so the review queue is worked in order
    let items = params
        .filtered()
        .order(verifications::created_at.asc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Verification>(&mut conn)?;
    let total: i64 = params.filtered().count().get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

/// GET /admin/verifications/:id
pub async fn get_verification(
    State(state): State<Arc<AppState>>,
    _staff: ModeratorUser,
    Path(verification_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Verification>>> {
    let mut conn = get_conn(&state.db)?;
    let verification = verification_service::find(&mut conn, verification_id)?;

    Ok(Json(ApiResponse::ok(verification)))
}

/// PUT /admin/verifications/:id/review
pub async fn review_verification(
    State(state): State<Arc<AppState>>,
    ModeratorUser(staff): ModeratorUser,
    Path(verification_id): Path<Uuid>,
    Json(body): Json<ReviewVerificationRequest>,
) -> AppResult<Json<ApiResponse<Verification>>> {
    let notes = body.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let mut conn = get_conn(&state.db)?;

    let reviewed = verification_service::review(&mut conn, verification_id, staff.id, body.approve, notes)?;

    audit_service::record(
        &mut conn,
        staff.id,
        if body.approve { "approve_verification" } else { "reject_verification" },
        Some(reviewed.user_id),
        serde_json::json!({
            "verification_id": reviewed.id,
            "document_type": reviewed.document_type,
            "notes": reviewed.notes,
        }),
    )?;

    publisher::publish_verification_reviewed(&state.rabbitmq, &reviewed).await;

    tracing::info!(
        verification_id = %reviewed.id,
        user_id = %reviewed.user_id,
        reviewer_id = %staff.id,
        status = %reviewed.status,
        "verification reviewed"
    );

    Ok(Json(ApiResponse::ok(reviewed)))
}
