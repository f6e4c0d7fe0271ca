//! Alarm zone types
//!
//! An AlarmZone groups devices under a shared armed/disarmed/triggered
//! state. Zones belong to a location and may carry per-event-type trigger
//! overrides when their behavior is set to custom.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a persisted armed state value
#[derive(Debug, Error)]
#[error("invalid armed state: {0}")]
pub struct ArmedStateParseError(String);

/// Error parsing a persisted trigger behavior value
#[derive(Debug, Error)]
#[error("invalid trigger behavior: {0}")]
pub struct TriggerBehaviorParseError(String);

/// Armed state of an alarm zone
///
/// Transitions to Triggered only occur while Armed; Disarmed zones never
/// trigger regardless of event content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArmedState {
    Disarmed,
    Armed,
    Triggered,
}

impl ArmedState {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmedState::Disarmed => "DISARMED",
            ArmedState::Armed => "ARMED",
            ArmedState::Triggered => "TRIGGERED",
        }
    }
}

impl std::str::FromStr for ArmedState {
    type Err = ArmedStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISARMED" => Ok(ArmedState::Disarmed),
            "ARMED" => Ok(ArmedState::Armed),
            "TRIGGERED" => Ok(ArmedState::Triggered),
            other => Err(ArmedStateParseError(other.to_string())),
        }
    }
}

impl std::fmt::Display for ArmedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a zone decides whether an event should trigger it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerBehavior {
    /// Fixed platform-wide classification
    #[default]
    Standard,

    /// Per-event-type overrides, falling back to the standard classification
    Custom,
}

impl TriggerBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerBehavior::Standard => "standard",
            TriggerBehavior::Custom => "custom",
        }
    }
}

impl std::str::FromStr for TriggerBehavior {
    type Err = TriggerBehaviorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(TriggerBehavior::Standard),
            "custom" => Ok(TriggerBehavior::Custom),
            other => Err(TriggerBehaviorParseError(other.to_string())),
        }
    }
}

/// A security grouping of devices with shared armed state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmZone {
    /// Internal database id
    pub id: i64,

    /// Owning organization
    pub organization_id: String,

    /// Location the zone belongs to
    pub location_id: i64,

    /// Display name
    pub name: String,

    /// Current armed state
    pub armed_state: ArmedState,

    /// Trigger decision policy
    pub trigger_behavior: TriggerBehavior,

    /// Last armed-state change
    pub updated_at: DateTime<Utc>,
}

impl AlarmZone {
    /// Whether incoming events can trigger this zone at all
    pub fn is_armed(&self) -> bool {
        self.armed_state == ArmedState::Armed
    }
}

/// Per-zone, per-event-type trigger rule
///
/// Consulted only when the zone's behavior is custom; a matching entry's
/// flag wins over the standard classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerOverride {
    /// Zone this override belongs to
    pub zone_id: i64,

    /// Exact standardized event type
    pub event_type: String,

    /// Whether events of this type trigger the zone
    pub should_trigger: bool,
}
