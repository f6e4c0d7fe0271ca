//! Camera platform driver
//!
//! Speaks a vendor-neutral HTTP API exposed by the connector service layer;
//! the connector id routes the request to the right vendor integration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{CameraDriver, DriverError, DriverResult};

/// Payload for an externally-created platform event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraEventPayload {
    /// Short label shown in the platform timeline
    pub label: String,

    /// Longer description, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Event instant
    pub timestamp: DateTime<Utc>,
}

/// Payload for a camera bookmark
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPayload {
    /// Bookmark name
    pub name: String,

    /// Longer description, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Bookmark instant
    pub timestamp: DateTime<Utc>,

    /// Clip length in seconds, if the platform supports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

/// HTTP implementation of [`CameraDriver`]
pub struct HttpCameraDriver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCameraDriver {
    /// Create a driver against the connector service base URL
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn check(response: reqwest::Response) -> DriverResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        Err(DriverError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl CameraDriver for HttpCameraDriver {
    async fn create_event(
        &self,
        connector_id: &str,
        payload: &CameraEventPayload,
    ) -> DriverResult<()> {
        debug!(connector_id, label = %payload.label, "Creating platform event");
        let url = format!("{}/connectors/{connector_id}/events", self.base_url);
        let response = self.client.post(&url).json(payload).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_bookmark(
        &self,
        connector_id: &str,
        camera_external_id: &str,
        payload: &BookmarkPayload,
    ) -> DriverResult<()> {
        debug!(connector_id, camera = camera_external_id, "Creating bookmark");
        let url = format!(
            "{}/connectors/{connector_id}/cameras/{camera_external_id}/bookmarks",
            self.base_url
        );
        let response = self.client.post(&url).json(payload).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_best_shot_image(
        &self,
        connector_id: &str,
        camera_external_id: &str,
    ) -> DriverResult<Vec<u8>> {
        let url = format!(
            "{}/connectors/{connector_id}/cameras/{camera_external_id}/best-shot",
            self.base_url
        );
        let response = self.client.get(&url).send().await?;
        let response = Self::check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
