//! Device command driver
//!
//! Routes state-change requests through the connector service layer to the
//! vendor integration that owns the device.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::{DeviceCommandDriver, DriverError, DriverResult};

/// HTTP implementation of [`DeviceCommandDriver`]
pub struct HttpDeviceCommandDriver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeviceCommandDriver {
    /// Create a driver against the connector service base URL
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateChangeRequest<'a> {
    target_state: &'a str,
}

#[async_trait]
impl DeviceCommandDriver for HttpDeviceCommandDriver {
    async fn request_state_change(
        &self,
        connector_id: &str,
        device_external_id: &str,
        target_state: &str,
    ) -> DriverResult<()> {
        debug!(connector_id, device = device_external_id, target_state, "Requesting state change");

        let url = format!(
            "{}/connectors/{connector_id}/devices/{device_external_id}/state",
            self.base_url
        );
        let response = self
            .client
            .post(&url)
            .json(&StateChangeRequest { target_state })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(DriverError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}
