//! Push-notification gateway driver
//!
//! The gateway exposes a Pushover-style message API: one POST per
//! notification, application token + recipient key, JSON response with a
//! status flag and an errors array.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DriverResult, PushDriver};

/// Notification content and addressing
#[derive(Debug, Clone, Serialize)]
pub struct PushParams {
    /// Notification title
    pub title: String,

    /// Notification body
    pub message: String,

    /// Optional supplementary URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Display label for the URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_title: Option<String>,

    /// Gateway priority (-2..2), gateway default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i8>,
}

/// Gateway response
#[derive(Debug, Clone, Deserialize)]
pub struct PushOutcome {
    /// 1 on success
    pub status: i32,

    /// Service-reported error details
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PushOutcome {
    /// Whether delivery was accepted
    pub fn is_success(&self) -> bool {
        self.status == 1
    }

    /// Joined error detail for ledger messages
    pub fn error_detail(&self) -> String {
        if self.errors.is_empty() {
            "unspecified gateway error".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}

/// HTTP implementation of [`PushDriver`]
pub struct HttpPushDriver {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushDriver {
    /// Create a driver against the gateway message endpoint
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Serialize)]
struct PushRequest<'a> {
    token: &'a str,
    user: &'a str,
    #[serde(flatten)]
    params: &'a PushParams,
}

#[async_trait]
impl PushDriver for HttpPushDriver {
    async fn send_notification(
        &self,
        api_token: &str,
        recipient_key: &str,
        params: &PushParams,
    ) -> DriverResult<PushOutcome> {
        debug!(recipient = recipient_key, title = %params.title, "Sending push notification");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&PushRequest {
                token: api_token,
                user: recipient_key,
                params,
            })
            .send()
            .await?;

        // The gateway reports failures in-body with a non-1 status; HTTP
        // errors only cover transport-level faults
        let outcome: PushOutcome = response.json().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_flag() {
        let ok = PushOutcome {
            status: 1,
            errors: vec![],
        };
        assert!(ok.is_success());

        let failed = PushOutcome {
            status: 0,
            errors: vec!["user key is invalid".to_string()],
        };
        assert!(!failed.is_success());
        assert_eq!(failed.error_detail(), "user key is invalid");
    }

    #[test]
    fn test_outcome_deserialize_without_errors() {
        let outcome: PushOutcome = serde_json::from_str(r#"{"status": 1}"#).unwrap();
        assert!(outcome.is_success());
        assert!(outcome.errors.is_empty());
    }
}
