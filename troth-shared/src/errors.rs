use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth and account errors
/// - E2xxx: Profile errors
/// - E3xxx: Interest, match and proposal errors
/// - E4xxx: Messaging errors
/// - E5xxx: Notification errors
/// - E6xxx: Moderation and verification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    EmailNotVerified,
    TokenExpired,
    TokenInvalid,
    RefreshTokenRevoked,
    PasswordTooWeak,
    VerificationCodeExpired,
    VerificationCodeInvalid,
    EmailRateLimited,
    UserBanned,
    UserNotFound,

    // Profile (E2xxx)
    ProfileNotFound,
    PhotoUploadFailed,
    FavoriteAlreadyExists,
    FavoriteNotFound,
    CannotTargetSelf,

    // Interest / Match / Proposal (E3xxx)
    InterestNotFound,
    InterestAlreadySent,
    InterestAlreadyResolved,
    InterestQuotaExceeded,
    MatchNotFound,
    NotMatched,
    ProposalNotFound,
    ProposalAlreadyPending,
    ProposalAlreadyAnswered,

    // Messaging (E4xxx)
    ConversationNotFound,
    NotConversationMember,
    MessageNotFound,
    ConversationClosed,

    // Notification (E5xxx)
    NotificationNotFound,

    // Moderation (E6xxx)
    ReportNotFound,
    SanctionNotFound,
    ReportAlreadyReviewed,
    CannotReportSelf,
    DuplicateReport,
    VerificationNotFound,
    VerificationAlreadyPending,
    VerificationAlreadyReviewed,
    DocumentUploadFailed,
    ProposalAlertNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::EmailNotVerified => "E1003",
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",
            Self::RefreshTokenRevoked => "E1006",
            Self::PasswordTooWeak => "E1007",
            Self::VerificationCodeExpired => "E1008",
            Self::VerificationCodeInvalid => "E1009",
            Self::EmailRateLimited => "E1010",
            Self::UserBanned => "E1011",
            Self::UserNotFound => "E1012",

            // Profile
            Self::ProfileNotFound => "E2001",
            Self::PhotoUploadFailed => "E2002",
            Self::FavoriteAlreadyExists => "E2003",
            Self::FavoriteNotFound => "E2004",
            Self::CannotTargetSelf => "E2005",

            // Interest / Match / Proposal
            Self::InterestNotFound => "E3001",
            Self::InterestAlreadySent => "E3002",
            Self::InterestAlreadyResolved => "E3003",
            Self::InterestQuotaExceeded => "E3004",
            Self::MatchNotFound => "E3005",
            Self::NotMatched => "E3006",
            Self::ProposalNotFound => "E3007",
            Self::ProposalAlreadyPending => "E3008",
            Self::ProposalAlreadyAnswered => "E3009",

            // Messaging
            Self::ConversationNotFound => "E4001",
            Self::NotConversationMember => "E4002",
            Self::MessageNotFound => "E4003",
            Self::ConversationClosed => "E4004",

            // Notification
            Self::NotificationNotFound => "E5001",

            // Moderation
            Self::ReportNotFound => "E6001",
            Self::SanctionNotFound => "E6002",
            Self::ReportAlreadyReviewed => "E6003",
            Self::CannotReportSelf => "E6004",
            Self::DuplicateReport => "E6005",
            Self::VerificationNotFound => "E6006",
            Self::VerificationAlreadyPending => "E6007",
            Self::VerificationAlreadyReviewed => "E6008",
            Self::DocumentUploadFailed => "E6009",
            Self::ProposalAlertNotFound => "E6010",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::PhotoUploadFailed | Self::DocumentUploadFailed => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::UserNotFound | Self::ProfileNotFound | Self::FavoriteNotFound
            | Self::InterestNotFound | Self::MatchNotFound | Self::ProposalNotFound
            | Self::ConversationNotFound | Self::MessageNotFound | Self::NotificationNotFound
            | Self::ReportNotFound | Self::SanctionNotFound | Self::VerificationNotFound
            | Self::ProposalAlertNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::RefreshTokenRevoked | Self::EmailNotVerified
            | Self::VerificationCodeExpired | Self::VerificationCodeInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::UserBanned | Self::NotMatched | Self::CannotTargetSelf
            | Self::CannotReportSelf | Self::NotConversationMember
            | Self::ConversationClosed => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::EmailRateLimited
            | Self::InterestQuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::EmailAlreadyExists | Self::FavoriteAlreadyExists | Self::InterestAlreadySent
            | Self::InterestAlreadyResolved | Self::ProposalAlreadyPending
            | Self::ProposalAlreadyAnswered | Self::ReportAlreadyReviewed
            | Self::DuplicateReport | Self::VerificationAlreadyPending
            | Self::VerificationAlreadyReviewed => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code carried by this error, as rendered in the response body.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::Internal(_) | AppError::Database(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_envelope() {
        let value = body_json(AppError::new(ErrorCode::NotMatched, "you are not matched with this user")).await;

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E3006");
        assert_eq!(value["error"]["message"], "you are not matched with this user");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn details_are_rendered() {
        let err = AppError::with_details(
            ErrorCode::InterestQuotaExceeded,
            "daily interest quota reached",
            serde_json::json!({ "limit": 5 }),
        );
        let value = body_json(err).await;
        assert_eq!(value["error"]["details"]["limit"], 5);
    }

    #[tokio::test]
    async fn lifecycle_conflicts_map_to_409() {
        for code in [
            ErrorCode::InterestAlreadySent,
            ErrorCode::InterestAlreadyResolved,
            ErrorCode::ProposalAlreadyPending,
            ErrorCode::ProposalAlreadyAnswered,
            ErrorCode::VerificationAlreadyReviewed,
        ] {
            let response = AppError::new(code, "conflict").into_response();
            assert_eq!(response.status(), StatusCode::CONFLICT, "{code:?}");
        }
    }

    #[tokio::test]
    async fn diesel_not_found_is_404() {
        let response = AppError::Database(diesel::result::Error::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_error_hides_cause() {
        let value = body_json(AppError::Internal(anyhow::anyhow!("connection reset"))).await;
        assert_eq!(value["error"]["code"], "E0001");
        assert_eq!(value["error"]["message"], "internal server error");
    }

    #[test]
    fn quota_is_too_many_requests() {
        assert_eq!(
            ErrorCode::InterestQuotaExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn code_accessor_reflects_variant() {
        assert_eq!(AppError::bad_request("x").code(), ErrorCode::BadRequest);
        assert_eq!(AppError::Validation("x".into()).code(), ErrorCode::ValidationError);
    }
}
