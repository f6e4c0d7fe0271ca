//! Audit log entries for alarm zone state changes
//!
//! Every armed-state transition writes exactly one entry, in the same
//! transaction as the state change, so every TRIGGERED state has a
//! traceable cause.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::ArmedState;

/// What caused an armed-state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Zone armed by a user or automation
    Arm,

    /// Zone disarmed by a user or automation
    Disarm,

    /// Zone flipped to TRIGGERED by an incoming event
    Trigger,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Arm => "arm",
            AuditAction::Disarm => "disarm",
            AuditAction::Trigger => "trigger",
        }
    }
}

/// One armed-state transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Entry id (ULID, sortable by creation time)
    pub id: String,

    /// Owning organization
    pub organization_id: String,

    /// Zone that changed state
    pub zone_id: i64,

    /// What happened
    pub action: AuditAction,

    /// State before the transition
    pub previous_state: ArmedState,

    /// State after the transition
    pub new_state: ArmedState,

    /// Machine-readable reason tag ("alarm_event_trigger", "user_action",
    /// "automation_action")
    pub reason: String,

    /// Event that caused a trigger transition, if any
    pub trigger_event_id: Option<Uuid>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Build a new entry with a fresh ULID and the current timestamp
    pub fn new(
        organization_id: impl Into<String>,
        zone_id: i64,
        action: AuditAction,
        previous_state: ArmedState,
        new_state: ArmedState,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            organization_id: organization_id.into(),
            zone_id,
            action,
            previous_state,
            new_state,
            reason: reason.into(),
            trigger_event_id: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the causing event
    pub fn with_trigger_event(mut self, event_id: Uuid) -> Self {
        self.trigger_event_id = Some(event_id);
        self
    }
}
