//! Core types for Warden
//!
//! This crate provides the fundamental types used throughout the Warden
//! platform: StandardizedEvent, Device, AlarmZone, Connector, Location,
//! audit log entries, and automation execution records.

mod audit;
mod connector;
mod device;
mod event;
mod execution;
mod location;
mod zone;

pub use audit::{AuditAction, AuditLogEntry};
pub use connector::{Connector, ConnectorCategory, ConnectorCategoryParseError};
pub use device::{Device, DeviceKey};
pub use event::{EventPayload, StandardizedEvent};
pub use execution::{
    ActionExecutionRecord, ActionStatus, ExecutionRecord, ExecutionStatus, StatusParseError,
    TriggerKind,
};
pub use location::{Location, Space, SunTimes};
pub use zone::{
    AlarmZone, ArmedState, ArmedStateParseError, TriggerBehavior, TriggerBehaviorParseError,
    TriggerOverride,
};

/// Maximum age of a persisted sun-times record before solar schedules
/// refuse to fire against it.
pub const SUN_TIMES_MAX_AGE_DAYS: i64 = 7;

/// Standardized event taxonomy used across connectors.
///
/// Connectors normalize vendor payloads into these category/type values
/// before events enter the pipeline.
pub mod taxonomy {
    /// Analytics-derived events (object/person/motion detections)
    pub const CATEGORY_ANALYTICS: &str = "analytics";

    /// Physical device state changes (contacts, locks, switches)
    pub const CATEGORY_DEVICE_STATE: &str = "device_state";

    /// Device health events (battery, connectivity)
    pub const CATEGORY_DEVICE_HEALTH: &str = "device_health";

    /// Access-control events (badge reads, door controllers)
    pub const CATEGORY_ACCESS: &str = "access";

    pub const TYPE_MOTION_DETECTED: &str = "motion_detected";
    pub const TYPE_PERSON_DETECTED: &str = "person_detected";
    pub const TYPE_VEHICLE_DETECTED: &str = "vehicle_detected";
    pub const TYPE_DOOR_OPENED: &str = "door_opened";
    pub const TYPE_DOOR_CLOSED: &str = "door_closed";
    pub const TYPE_WINDOW_OPENED: &str = "window_opened";
    pub const TYPE_LOCK_UNLOCKED: &str = "lock_unlocked";
    pub const TYPE_LOCK_LOCKED: &str = "lock_locked";
    pub const TYPE_GLASS_BREAK: &str = "glass_break";
    pub const TYPE_BATTERY_LEVEL: &str = "battery_level";
    pub const TYPE_ACCESS_DENIED: &str = "access_denied";
    pub const TYPE_ACCESS_GRANTED: &str = "access_granted";

    /// Display states carried in normalized payloads
    pub const DISPLAY_OPEN: &str = "open";
    pub const DISPLAY_CLOSED: &str = "closed";
    pub const DISPLAY_LOCKED: &str = "locked";
    pub const DISPLAY_UNLOCKED: &str = "unlocked";
    pub const DISPLAY_MOTION: &str = "motion";
    pub const DISPLAY_IDLE: &str = "idle";
}
