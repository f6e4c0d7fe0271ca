//! Automation configuration model
//!
//! Automations are authored externally; their `config_json` deserializes
//! into one trigger plus an ordered action list. Unknown trigger kinds,
//! action types, or target states fail deserialization, which disables the
//! single automation rather than the engine.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_rules::RuleNode;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid automation config: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Parsed automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// What starts the automation
    pub trigger: TriggerConfig,

    /// Ordered actions executed when the trigger fires
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

impl AutomationConfig {
    /// Parse the stored config JSON
    pub fn parse(config_json: &serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(config_json.clone())?)
    }
}

/// Trigger definition: event-based or scheduled, never both
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Fires on matching standardized events
    Event {
        /// Rule tree evaluated against the event fact map
        rule: RuleNode,

        /// Optional time-of-day gate applied after a structural match
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_filter: Option<TimeOfDayFilter>,
    },

    /// Fires on the scheduler tick
    Scheduled {
        /// Schedule definition
        schedule: ScheduleConfig,
    },
}

/// Time-of-day gate, evaluated in the device location's timezone
///
/// Windows may wrap midnight (`after: 22:00, before: 06:00`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDayFilter {
    /// Inclusive window start
    pub after: NaiveTime,

    /// Exclusive window end
    pub before: NaiveTime,
}

impl TimeOfDayFilter {
    /// Whether a local time falls inside the window
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.after <= self.before {
            time >= self.after && time < self.before
        } else {
            // Wraps midnight
            time >= self.after || time < self.before
        }
    }
}

/// Schedule definition for scheduled triggers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheduleType", rename_all = "snake_case")]
pub enum ScheduleConfig {
    /// Five-field CRON expression
    FixedTime {
        /// CRON expression (minute hour day-of-month month day-of-week)
        #[serde(rename = "cronExpression")]
        cron_expression: String,

        /// IANA timezone; falls back to the automation's location timezone,
        /// then UTC
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
    },

    /// Relative to today's sunrise at the automation's location
    Sunrise {
        /// Minutes after (positive) or before (negative) sunrise
        #[serde(rename = "offsetMinutes", default)]
        offset_minutes: i32,
    },

    /// Relative to today's sunset at the automation's location
    Sunset {
        /// Minutes after (positive) or before (negative) sunset
        #[serde(rename = "offsetMinutes", default)]
        offset_minutes: i32,
    },
}

/// Closed set of states the set-device-state action may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionableState {
    On,
    Off,
    Open,
    Close,
    Lock,
    Unlock,
}

impl ActionableState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionableState::On => "on",
            ActionableState::Off => "off",
            ActionableState::Open => "open",
            ActionableState::Close => "close",
            ActionableState::Lock => "lock",
            ActionableState::Unlock => "unlock",
        }
    }
}

/// One action in an automation's ordered list
///
/// String-valued params may carry `{{dotted.path}}` tokens, resolved
/// against the per-execution context just before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "camelCase")]
pub enum ActionConfig {
    /// Create an event on an external camera platform
    CreateEvent(CreateEventParams),

    /// Create a bookmark on the source device's associated cameras
    CreateBookmark(CreateBookmarkParams),

    /// Call an arbitrary HTTP endpoint
    SendHttpRequest(SendHttpRequestParams),

    /// Command a device into a target state
    SetDeviceState(SetDeviceStateParams),

    /// Deliver a push notification
    SendPushNotification(SendPushNotificationParams),

    /// Arm alarm zones
    ArmAlarmZone(ZoneActionParams),

    /// Disarm alarm zones
    DisarmAlarmZone(ZoneActionParams),
}

impl ActionConfig {
    /// Stable type tag recorded in the execution ledger
    pub fn type_tag(&self) -> &'static str {
        match self {
            ActionConfig::CreateEvent(_) => "createEvent",
            ActionConfig::CreateBookmark(_) => "createBookmark",
            ActionConfig::SendHttpRequest(_) => "sendHttpRequest",
            ActionConfig::SetDeviceState(_) => "setDeviceState",
            ActionConfig::SendPushNotification(_) => "sendPushNotification",
            ActionConfig::ArmAlarmZone(_) => "armAlarmZone",
            ActionConfig::DisarmAlarmZone(_) => "disarmAlarmZone",
        }
    }

    /// Declared params as stored in the ledger (pre-resolution)
    pub fn params_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => {
                map.get("params").cloned().unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        }
    }
}

/// Params for createEvent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventParams {
    /// Connector hosting the external event
    pub target_connector_id: String,

    /// Timeline label (templated)
    pub label: String,

    /// Longer description (templated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Params for createBookmark
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookmarkParams {
    /// Connector hosting the bookmark
    pub target_connector_id: String,

    /// Bookmark name (templated)
    pub name: String,

    /// Longer description (templated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Clip length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

/// One templated HTTP header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderTemplate {
    /// Header name (templated)
    pub key: String,

    /// Header value (templated)
    pub value: String,
}

/// Params for sendHttpRequest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendHttpRequestParams {
    /// Target URL (templated)
    pub url: String,

    /// HTTP method, GET when absent
    #[serde(default = "default_method")]
    pub method: String,

    /// User-declared headers (templated element-wise)
    #[serde(default)]
    pub headers: Vec<HeaderTemplate>,

    /// Request body, attached for POST/PUT/PATCH (templated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Explicit content type; JSON is defaulted only when the body looks
    /// like JSON and this is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Params for setDeviceState
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDeviceStateParams {
    /// Internal id of the device to command
    pub target_device_id: i64,

    /// Requested state; must be one of the actionable states
    pub target_state: String,
}

/// Params for sendPushNotification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPushNotificationParams {
    /// Notification title (templated)
    pub title: String,

    /// Notification body (templated)
    pub message: String,

    /// Specific recipient key; the service's default group when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_key: Option<String>,

    /// Gateway priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i8>,
}

/// Params for armAlarmZone / disarmAlarmZone
///
/// An explicit id list wins; otherwise all zones in the automation's
/// location scope, or the whole organization without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneActionParams {
    /// Explicit zone ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_ids: Option<Vec<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_trigger_config() {
        let config = AutomationConfig::parse(&json!({
            "trigger": {
                "kind": "event",
                "rule": {"all": [
                    {"fact": "event.type", "operator": "equal", "value": "door_opened"}
                ]},
                "time_filter": {"after": "22:00:00", "before": "06:00:00"}
            },
            "actions": [
                {"type": "sendPushNotification",
                 "params": {"title": "Alert", "message": "{{device.name}} opened"}}
            ]
        }))
        .unwrap();

        assert!(matches!(config.trigger, TriggerConfig::Event { .. }));
        assert_eq!(config.actions.len(), 1);
        assert_eq!(config.actions[0].type_tag(), "sendPushNotification");
    }

    #[test]
    fn test_scheduled_trigger_config() {
        let config = AutomationConfig::parse(&json!({
            "trigger": {
                "kind": "scheduled",
                "schedule": {
                    "scheduleType": "fixed_time",
                    "cronExpression": "0 9 * * *",
                    "timezone": "America/New_York"
                }
            },
            "actions": [{"type": "armAlarmZone", "params": {}}]
        }))
        .unwrap();

        match config.trigger {
            TriggerConfig::Scheduled {
                schedule: ScheduleConfig::FixedTime { cron_expression, timezone },
            } => {
                assert_eq!(cron_expression, "0 9 * * *");
                assert_eq!(timezone.as_deref(), Some("America/New_York"));
            }
            other => panic!("expected fixed_time schedule, got {other:?}"),
        }
    }

    #[test]
    fn test_sun_schedule_config() {
        let config = AutomationConfig::parse(&json!({
            "trigger": {
                "kind": "scheduled",
                "schedule": {"scheduleType": "sunset", "offsetMinutes": -30}
            },
            "actions": []
        }))
        .unwrap();

        match config.trigger {
            TriggerConfig::Scheduled {
                schedule: ScheduleConfig::Sunset { offset_minutes },
            } => assert_eq!(offset_minutes, -30),
            other => panic!("expected sunset schedule, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_type_is_rejected() {
        let result = AutomationConfig::parse(&json!({
            "trigger": {"kind": "event", "rule": {"all": []}},
            "actions": [{"type": "launchDrone", "params": {}}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_time_filter_windows() {
        let day = TimeOfDayFilter {
            after: "09:00:00".parse().unwrap(),
            before: "17:00:00".parse().unwrap(),
        };
        assert!(day.contains("12:00:00".parse().unwrap()));
        assert!(!day.contains("20:00:00".parse().unwrap()));

        let night = TimeOfDayFilter {
            after: "22:00:00".parse().unwrap(),
            before: "06:00:00".parse().unwrap(),
        };
        assert!(night.contains("23:30:00".parse().unwrap()));
        assert!(night.contains("02:00:00".parse().unwrap()));
        assert!(!night.contains("12:00:00".parse().unwrap()));
    }

    #[test]
    fn test_params_json_round_trip() {
        let action = ActionConfig::SendHttpRequest(SendHttpRequestParams {
            url: "https://hooks.example.com/{{event.type}}".to_string(),
            method: "POST".to_string(),
            headers: vec![],
            body: Some("{}".to_string()),
            content_type: None,
        });

        let params = action.params_json();
        assert_eq!(params["url"], "https://hooks.example.com/{{event.type}}");
        assert_eq!(params["method"], "POST");
    }
}
