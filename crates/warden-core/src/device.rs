//! Internal device records
//!
//! A Device is the platform's record of a physical unit reported by a
//! connector. Devices are keyed by (connector, external id); the pipeline
//! mutates `status` and `battery_percentage` from event payloads and never
//! deletes a device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key identifying a device within one organization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceKey {
    /// Connector that owns the device
    pub connector_id: String,

    /// External id as reported by the connector
    pub external_id: String,
}

impl DeviceKey {
    pub fn new(connector_id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            external_id: external_id.into(),
        }
    }
}

/// Internal device record
///
/// `space_id` and `alarm_zone_id` are independent, each at most one. The
/// single nullable zone key makes "one zone per device" hold by
/// construction rather than by query shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Internal database id
    pub id: i64,

    /// Owning organization
    pub organization_id: String,

    /// Connector that owns the device
    pub connector_id: String,

    /// External id, scoped to the connector
    pub external_id: String,

    /// Display name
    pub name: String,

    /// Standardized device type (e.g. "camera", "contact_sensor")
    pub device_type: String,

    /// Standardized device subtype
    pub subtype: Option<String>,

    /// Last reported display state
    pub status: Option<String>,

    /// Last reported battery percentage (0-100)
    pub battery_percentage: Option<u8>,

    /// Space the device is placed in, if any
    pub space_id: Option<i64>,

    /// Alarm zone the device belongs to, if any
    pub alarm_zone_id: Option<i64>,

    /// Last time an event updated this record
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// Key for lookups
    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.connector_id.clone(), self.external_id.clone())
    }

    /// Whether the device is a camera (thumbnail/bookmark capable)
    pub fn is_camera(&self) -> bool {
        self.device_type == "camera"
    }
}
