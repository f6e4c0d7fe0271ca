//! Recording fakes for dependent crates' tests
//!
//! Each fake records the calls it receives and can be told to fail, so
//! executor and pipeline tests can assert isolation behavior without a
//! network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::{
    BookmarkPayload, CameraDriver, CameraEventPayload, DeviceCommandDriver, DriverError,
    DriverResult, PushDriver, PushOutcome, PushParams,
};

fn simulated_failure(what: &str) -> DriverError {
    DriverError::Api {
        status: 502,
        detail: format!("simulated {what} failure"),
    }
}

/// Recording camera driver
#[derive(Default)]
pub struct FakeCameraDriver {
    fail: AtomicBool,
    /// (connector_id, label) per created event
    pub events: Mutex<Vec<(String, String)>>,
    /// (connector_id, camera_id, name) per bookmark
    pub bookmarks: Mutex<Vec<(String, String, String)>>,
    /// Snapshot bytes returned by fetch
    pub snapshot: Vec<u8>,
}

impl FakeCameraDriver {
    pub fn new() -> Self {
        Self {
            snapshot: vec![0xFF, 0xD8, 0xFF],
            ..Self::default()
        }
    }

    /// Make every subsequent call fail
    pub fn fail_next_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CameraDriver for FakeCameraDriver {
    async fn create_event(
        &self,
        connector_id: &str,
        payload: &CameraEventPayload,
    ) -> DriverResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure("camera event"));
        }
        self.events
            .lock()
            .unwrap()
            .push((connector_id.to_string(), payload.label.clone()));
        Ok(())
    }

    async fn create_bookmark(
        &self,
        connector_id: &str,
        camera_external_id: &str,
        payload: &BookmarkPayload,
    ) -> DriverResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure("bookmark"));
        }
        self.bookmarks.lock().unwrap().push((
            connector_id.to_string(),
            camera_external_id.to_string(),
            payload.name.clone(),
        ));
        Ok(())
    }

    async fn fetch_best_shot_image(
        &self,
        _connector_id: &str,
        _camera_external_id: &str,
    ) -> DriverResult<Vec<u8>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure("snapshot"));
        }
        Ok(self.snapshot.clone())
    }
}

/// Recording push driver
#[derive(Default)]
pub struct FakePushDriver {
    fail: AtomicBool,
    reject: AtomicBool,
    /// (recipient_key, title) per delivered notification
    pub sent: Mutex<Vec<(String, String)>>,
}

impl FakePushDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail at the transport level
    pub fn fail_next_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Deliver but report an in-body gateway rejection
    pub fn reject_next_calls(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl PushDriver for FakePushDriver {
    async fn send_notification(
        &self,
        _api_token: &str,
        recipient_key: &str,
        params: &PushParams,
    ) -> DriverResult<PushOutcome> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure("push"));
        }
        if self.reject.load(Ordering::SeqCst) {
            return Ok(PushOutcome {
                status: 0,
                errors: vec!["user key is invalid".to_string()],
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient_key.to_string(), params.title.clone()));
        Ok(PushOutcome {
            status: 1,
            errors: vec![],
        })
    }
}

/// Recording device command driver
#[derive(Default)]
pub struct FakeDeviceCommandDriver {
    fail: AtomicBool,
    /// (device_external_id, target_state) per accepted command
    pub commands: Mutex<Vec<(String, String)>>,
}

impl FakeDeviceCommandDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceCommandDriver for FakeDeviceCommandDriver {
    async fn request_state_change(
        &self,
        _connector_id: &str,
        device_external_id: &str,
        target_state: &str,
    ) -> DriverResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure("device command"));
        }
        self.commands
            .lock()
            .unwrap()
            .push((device_external_id.to_string(), target_state.to_string()));
        Ok(())
    }
}
