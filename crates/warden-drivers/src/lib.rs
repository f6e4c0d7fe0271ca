//! Driver interfaces for external collaborators
//!
//! The core treats camera platforms, the push-notification gateway, and
//! device command channels as black-box request/response services. Each is
//! a trait here; production implementations speak HTTP via reqwest, and
//! [`testing`] provides recording fakes for dependent crates' tests.

mod camera;
mod device_command;
mod push;
pub mod testing;

pub use camera::{BookmarkPayload, CameraEventPayload, HttpCameraDriver};
pub use device_command::HttpDeviceCommandDriver;
pub use push::{HttpPushDriver, PushOutcome, PushParams};

use async_trait::async_trait;
use thiserror::Error;

/// Driver errors
///
/// Every variant surfaces as an action failure in the execution ledger;
/// drivers never retry.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("driver not configured: {0}")]
    NotConfigured(String),
}

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Camera/video-platform operations
#[async_trait]
pub trait CameraDriver: Send + Sync {
    /// Create an external event on the platform owning the connector
    async fn create_event(
        &self,
        connector_id: &str,
        payload: &CameraEventPayload,
    ) -> DriverResult<()>;

    /// Create a bookmark on a specific camera
    async fn create_bookmark(
        &self,
        connector_id: &str,
        camera_external_id: &str,
        payload: &BookmarkPayload,
    ) -> DriverResult<()>;

    /// Fetch the best-shot snapshot for a camera, as raw image bytes
    async fn fetch_best_shot_image(
        &self,
        connector_id: &str,
        camera_external_id: &str,
    ) -> DriverResult<Vec<u8>>;
}

/// Push-notification gateway operations
#[async_trait]
pub trait PushDriver: Send + Sync {
    /// Deliver one notification to a recipient key
    async fn send_notification(
        &self,
        api_token: &str,
        recipient_key: &str,
        params: &PushParams,
    ) -> DriverResult<PushOutcome>;
}

/// Device command channel
#[async_trait]
pub trait DeviceCommandDriver: Send + Sync {
    /// Request a device state change; errors mean the command was not
    /// accepted
    async fn request_state_change(
        &self,
        connector_id: &str,
        device_external_id: &str,
        target_state: &str,
    ) -> DriverResult<()>;
}
