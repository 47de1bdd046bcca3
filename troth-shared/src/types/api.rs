use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
}

/// Ordered from best to worst; a response reports its worst check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    /// Healthy on `Ok`, otherwise `on_failure` with the error text.
    pub fn from_result<T, E: std::fmt::Display>(
        name: impl Into<String>,
        result: Result<T, E>,
        on_failure: HealthStatus,
    ) -> Self {
        let (status, message) = match result {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => (on_failure, Some(e.to_string())),
        };
        Self { name: name.into(), status, message }
    }
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: service.into(),
            version: version.into(),
            checks: None,
        }
    }

    pub fn with_checks(mut self, checks: Vec<HealthCheck>) -> Self {
        self.status = checks.iter().map(|c| c.status).max().unwrap_or(HealthStatus::Healthy);
        self.checks = Some(checks);
        self
    }
}

/// Body for endpoints that only acknowledge an action.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn done() -> Self {
        Self { ok: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, status: HealthStatus) -> HealthCheck {
        HealthCheck {
            name: name.to_string(),
            status,
            message: None,
        }
    }

    #[test]
    fn ok_omits_message() {
        let value = serde_json::to_value(ApiResponse::ok(Ack::done())).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["ok"], true);
        assert!(value.get("message").is_none());
    }

    #[test]
    fn worst_check_wins() {
        let health = HealthResponse::healthy("troth-user", "0.1.0").with_checks(vec![
            check("postgres", HealthStatus::Healthy),
            check("redis", HealthStatus::Degraded),
        ]);
        assert_eq!(health.status, HealthStatus::Degraded);

        let health = HealthResponse::healthy("troth-user", "0.1.0").with_checks(vec![
            check("postgres", HealthStatus::Unhealthy),
            check("redis", HealthStatus::Degraded),
        ]);
        assert_eq!(health.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn failed_check_keeps_error_text() {
        let failed = HealthCheck::from_result("redis", Err::<(), _>("connection refused"), HealthStatus::Degraded);
        assert_eq!(failed.status, HealthStatus::Degraded);
        assert_eq!(failed.message.as_deref(), Some("connection refused"));

        let ok = HealthCheck::from_result("database", Ok::<_, String>(()), HealthStatus::Unhealthy);
        assert_eq!(ok.status, HealthStatus::Healthy);
        assert!(ok.message.is_none());
    }
}
