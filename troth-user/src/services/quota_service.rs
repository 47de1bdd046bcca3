use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use troth_shared::clients::redis::RedisClient;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::account::AccountStatus;

use crate::lifecycle::{quota_key, seconds_until_reset, QuotaLimits};

#[derive(Debug, Serialize, PartialEq)]
pub struct QuotaStatus {
    pub limit: u64,
    pub used: u64,
    pub remaining: u64,
    pub resets_in_secs: u64,
}

/// One counted use of the daily interest allowance.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaSlot {
    key: String,
}

/// Consumes one interest from today's allowance. Redis outages fail open
/// and return no slot, since nothing was counted.
pub async fn consume_interest(
    redis: &RedisClient,
    limits: QuotaLimits,
    user_id: Uuid,
    status: AccountStatus,
) -> AppResult<Option<QuotaSlot>> {
    let limit = limits.daily_limit(status);
    if limit == 0 {
        return Err(AppError::new(ErrorCode::InterestQuotaExceeded, "interests are not available for this account"));
    }

    let now = Utc::now();
    let key = quota_key(user_id, now);
    let allowed = match redis.rate_limit_check(&key, limit, seconds_until_reset(now)).await {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user_id, "interest quota check failed, allowing");
            return Ok(None);
        }
    };

    if !allowed {
        return Err(AppError::with_details(
            ErrorCode::InterestQuotaExceeded,
            format!("daily interest limit of {limit} reached"),
            serde_json::json!({ "limit": limit }),
        ));
    }
    Ok(Some(QuotaSlot { key }))
}

/// Passes `outcome` through, handing the slot back to the allowance when
/// the interest it paid for was never created.
pub async fn settle_interest<T>(
    redis: &RedisClient,
    slot: Option<QuotaSlot>,
    outcome: AppResult<T>,
) -> AppResult<T> {
    if let Some(slot) = unspent(slot, &outcome) {
        if let Err(e) = redis.release(&slot.key).await {
            tracing::warn!(error = %e, key = %slot.key, "failed to return interest quota");
        }
    }
    outcome
}

fn unspent<T>(slot: Option<QuotaSlot>, outcome: &AppResult<T>) -> Option<QuotaSlot> {
    slot.filter(|_| outcome.is_err())
}

pub async fn current(
    redis: &RedisClient,
    limits: QuotaLimits,
    user_id: Uuid,
    status: AccountStatus,
) -> QuotaStatus {
    let now = Utc::now();
    let limit = limits.daily_limit(status);
    let used = match redis.get(&quota_key(user_id, now)).await {
        Ok(value) => value.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read interest quota");
            0
        }
    };
    summarize(limit, used, seconds_until_reset(now))
}

fn summarize(limit: u64, used: u64, resets_in_secs: u64) -> QuotaStatus {
    // The counter keeps incrementing on refused attempts
    let used = used.min(limit);
    QuotaStatus { limit, used, remaining: limit - used, resets_in_secs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_never_underflows() {
        let status = summarize(5, 9, 60);
        assert_eq!(status.used, 5);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn fresh_day_has_full_allowance() {
        assert_eq!(
            summarize(50, 0, 10),
            QuotaStatus { limit: 50, used: 0, remaining: 50, resets_in_secs: 10 }
        );
    }

    #[test]
    fn failed_interest_returns_its_slot() {
        let slot = || Some(QuotaSlot { key: "interest:quota:x:2026-03-02".into() });
        let failed: AppResult<()> = Err(AppError::new(ErrorCode::InterestAlreadySent, "interest already pending"));

        assert_eq!(unspent(slot(), &failed), slot());
        assert_eq!(unspent(slot(), &Ok(())), None);
        assert_eq!(unspent(None, &failed), None);
    }
}
