use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::types::account::BanTerm;
use troth_shared::types::event::{routing_keys, payloads, Event};

use crate::models::{Report, Sanction, Verification};
use crate::rules::VerificationStatus;

const SOURCE: &str = "troth-moderation";

pub async fn publish_report_created(rabbitmq: &RabbitMQClient, report: &Report) {
    let event = Event::new(
        SOURCE,
        routing_keys::MODERATION_REPORT_CREATED,
        payloads::ReportCreated {
            report_id: report.id,
            reporter_id: report.reporter_id,
            reported_id: report.reported_id,
            report_type: report.report_type.clone(),
        },
    )
    .with_user(report.reporter_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MODERATION_REPORT_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish report.created event");
    }
}

/// Sanctions issued from a report carry the report id as correlation id.
pub async fn publish_sanction_issued(rabbitmq: &RabbitMQClient, sanction: &Sanction) {
    let mut event = Event::new(
        SOURCE,
        routing_keys::MODERATION_SANCTION_ISSUED,
        payloads::SanctionIssued {
            sanction_id: sanction.id,
            user_id: sanction.user_id,
            sanction_type: sanction.sanction_type.clone(),
            reason: sanction.reason.clone(),
            expires_at: sanction.expires_at,
        },
    )
    .with_user(sanction.user_id);
    if let Some(report_id) = sanction.report_id {
        event = event.with_correlation(report_id);
    }

    if let Err(e) = rabbitmq.publish(routing_keys::MODERATION_SANCTION_ISSUED, &event).await {
        tracing::error!(error = %e, "failed to publish sanction.issued event");
    }
}

pub async fn publish_sanction_lifted(rabbitmq: &RabbitMQClient, sanction: &Sanction, remaining_ban: Option<BanTerm>) {
    let event = Event::new(
        SOURCE,
        routing_keys::MODERATION_SANCTION_LIFTED,
        payloads::SanctionLifted {
            sanction_id: sanction.id,
            user_id: sanction.user_id,
            remaining_ban,
        },
    )
    .with_user(sanction.user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MODERATION_SANCTION_LIFTED, &event).await {
        tracing::error!(error = %e, "failed to publish sanction.lifted event");
    }
}

pub async fn publish_verification_reviewed(rabbitmq: &RabbitMQClient, verification: &Verification) {
    let (Some(document_type), Some(reviewed_by)) = (verification.kind(), verification.reviewed_by) else {
        tracing::error!(verification_id = %verification.id, "verification is not reviewed, event skipped");
        return;
    };

    let event = Event::new(
        SOURCE,
        routing_keys::MODERATION_VERIFICATION_REVIEWED,
        payloads::VerificationReviewed {
            verification_id: verification.id,
            user_id: verification.user_id,
            document_type,
            approved: verification.status() == VerificationStatus::Approved,
            reviewed_by,
            notes: verification.notes.clone(),
        },
    )
    .with_user(verification.user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MODERATION_VERIFICATION_REVIEWED, &event).await {
        tracing::error!(error = %e, "failed to publish verification.reviewed event");
    }
}
