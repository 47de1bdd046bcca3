use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use troth_shared::types::account::VerificationKind;

use crate::rules::{ReportStatus, SanctionType, VerificationStatus};
use crate::schema::{admin_actions, proposal_alerts, reports, sanctions, verifications};

// --- Report ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub report_type: String,
    pub reason: String,
    pub context: Option<String>,
    pub message_id: Option<Uuid>,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn status(&self) -> ReportStatus {
        self.status.parse().unwrap_or(ReportStatus::Pending)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reports)]
pub struct NewReport {
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub report_type: String,
    pub reason: String,
    pub context: Option<String>,
    pub message_id: Option<Uuid>,
}

// --- Sanction ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = sanctions)]
pub struct Sanction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_id: Option<Uuid>,
    pub sanction_type: String,
    pub reason: String,
    pub issued_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Sanction {
    pub fn kind(&self) -> Option<SanctionType> {
        self.sanction_type.parse().ok()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sanctions)]
pub struct NewSanction {
    pub user_id: Uuid,
    pub report_id: Option<Uuid>,
    pub sanction_type: String,
    pub reason: String,
    pub issued_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

// --- Verification ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = verifications)]
pub struct Verification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: String,
    pub document_url: Option<String>,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Verification {
    pub fn status(&self) -> VerificationStatus {
        self.status.parse().unwrap_or(VerificationStatus::Pending)
    }

    pub fn kind(&self) -> Option<VerificationKind> {
        self.document_type.parse().ok()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = verifications)]
pub struct NewVerification {
    pub user_id: Uuid,
    pub document_type: String,
    pub document_url: Option<String>,
}

// --- ProposalAlert ---

/// Staff follow-up created when a proposal is answered YES.
#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = proposal_alerts)]
pub struct ProposalAlert {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub match_id: Uuid,
    pub proposer_id: Uuid,
    pub recipient_id: Uuid,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = proposal_alerts)]
pub struct NewProposalAlert {
    pub proposal_id: Uuid,
    pub match_id: Uuid,
    pub proposer_id: Uuid,
    pub recipient_id: Uuid,
}

// --- AdminAction ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = admin_actions)]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: String,
    pub target_user_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = admin_actions)]
pub struct NewAdminAction {
    pub admin_id: Uuid,
    pub action: String,
    pub target_user_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
}
