//! Automation execution records
//!
//! One ExecutionRecord per automation firing, one ActionExecutionRecord per
//! action within it. Records are created before work is dispatched and
//! finalized after it settles, so a crash mid-run still leaves an accurate
//! trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error parsing a persisted status value
#[derive(Debug, Error)]
#[error("invalid execution status: {0}")]
pub struct StatusParseError(String);

/// What started an automation firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fired by an incoming standardized event
    Event,

    /// Fired by the scheduler tick
    Schedule,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Event => "event",
            TriggerKind::Schedule => "schedule",
        }
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(TriggerKind::Event),
            "schedule" => Ok(TriggerKind::Schedule),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Final status of an automation firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Actions still in flight
    Running,

    /// Every action succeeded
    Success,

    /// Some actions succeeded, some failed
    PartialFailure,

    /// Every action failed
    Failure,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::PartialFailure => "partial_failure",
            ExecutionStatus::Failure => "failure",
        }
    }

    /// Final status given settled action counts
    pub fn from_counts(successful: u32, failed: u32) -> Self {
        match (successful, failed) {
            (_, 0) => ExecutionStatus::Success,
            (0, _) => ExecutionStatus::Failure,
            _ => ExecutionStatus::PartialFailure,
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ExecutionStatus::Running),
            "success" => Ok(ExecutionStatus::Success),
            "partial_failure" => Ok(ExecutionStatus::PartialFailure),
            "failure" => Ok(ExecutionStatus::Failure),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Status of a single action within a firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Running,
    Success,
    Failure,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Running => "running",
            ActionStatus::Success => "success",
            ActionStatus::Failure => "failure",
        }
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ActionStatus::Running),
            "success" => Ok(ActionStatus::Success),
            "failure" => Ok(ActionStatus::Failure),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// One row per automation firing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Internal database id
    pub id: i64,

    /// Owning organization
    pub organization_id: String,

    /// Automation that fired
    pub automation_id: i64,

    /// What started the firing
    pub trigger_kind: TriggerKind,

    /// When the trigger matched
    pub trigger_timestamp: DateTime<Utc>,

    /// Causing event, absent for scheduled runs
    pub trigger_event_id: Option<Uuid>,

    /// Current/final status
    pub status: ExecutionStatus,

    /// Declared action count, recorded before any action runs
    pub total_actions: u32,

    /// Actions that settled successfully
    pub successful_actions: u32,

    /// Actions that settled with a failure
    pub failed_actions: u32,

    /// Wall-clock duration of the firing, set at finalization
    pub duration_ms: Option<u64>,

    /// When the record was created
    pub started_at: DateTime<Utc>,
}

/// One row per action within a firing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionExecutionRecord {
    /// Internal database id
    pub id: i64,

    /// Parent execution
    pub execution_id: i64,

    /// Position in the automation's declared action list
    pub action_index: u32,

    /// Action kind tag (e.g. "send_http_request")
    pub action_type: String,

    /// Declared params template (pre-resolution)
    pub action_params: serde_json::Value,

    /// Current/final status
    pub status: ActionStatus,

    /// Failure detail, if the action failed
    pub error_message: Option<String>,

    /// When dispatch began
    pub started_at: DateTime<Utc>,

    /// When the action settled
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_counts() {
        assert_eq!(ExecutionStatus::from_counts(3, 0), ExecutionStatus::Success);
        assert_eq!(ExecutionStatus::from_counts(0, 3), ExecutionStatus::Failure);
        assert_eq!(
            ExecutionStatus::from_counts(2, 1),
            ExecutionStatus::PartialFailure
        );
        // Zero actions settle as success
        assert_eq!(ExecutionStatus::from_counts(0, 0), ExecutionStatus::Success);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ExecutionStatus::Running,
            ExecutionStatus::Success,
            ExecutionStatus::PartialFailure,
            ExecutionStatus::Failure,
        ] {
            assert_eq!(status.as_str().parse::<ExecutionStatus>().unwrap(), status);
        }
    }
}
