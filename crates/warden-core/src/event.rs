//! Standardized event types
//!
//! Connectors normalize vendor-specific payloads into a StandardizedEvent
//! before anything else in the platform sees them. Events are immutable once
//! created and persisted exactly once per ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Normalized key/value payload carried by a standardized event
///
/// Only the fields the pipeline acts on are modeled explicitly; everything
/// else a connector emits is retained in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    /// Human-facing device state ("open", "closed", "motion", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_state: Option<String>,

    /// Battery percentage 0-100 reported by the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percentage: Option<u8>,

    /// Additional normalized fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl EventPayload {
    /// Payload carrying only a display state
    pub fn with_display_state(state: impl Into<String>) -> Self {
        Self {
            display_state: Some(state.into()),
            ..Self::default()
        }
    }

    /// Battery percentage, dropped if the connector reported an
    /// out-of-range value.
    pub fn battery(&self) -> Option<u8> {
        self.battery_percentage.filter(|p| *p <= 100)
    }
}

/// A vendor-agnostic event record produced from a raw connector payload
///
/// The `event_id` is globally unique; the persistence layer rejects a second
/// insert of the same id. `device_id` is the connector-scoped external
/// device identifier, not an internal database key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedEvent {
    /// Globally unique event identifier
    pub event_id: Uuid,

    /// When the event occurred (connector clock, UTC)
    pub timestamp: DateTime<Utc>,

    /// The connector that produced this event
    pub connector_id: String,

    /// External device id, scoped to the connector
    pub device_id: String,

    /// Standardized taxonomy: coarse category
    pub category: String,

    /// Standardized taxonomy: event type
    #[serde(rename = "type")]
    pub event_type: String,

    /// Standardized taxonomy: optional subtype
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// Normalized key/value payload
    #[serde(default)]
    pub payload: EventPayload,

    /// Opaque raw vendor payload, retained for audit
    #[serde(default)]
    pub original_event: serde_json::Value,
}

impl StandardizedEvent {
    /// Create a new event with a fresh id and the current timestamp
    pub fn new(
        connector_id: impl Into<String>,
        device_id: impl Into<String>,
        category: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            connector_id: connector_id.into(),
            device_id: device_id.into(),
            category: category.into(),
            event_type: event_type.into(),
            subtype: None,
            payload: EventPayload::default(),
            original_event: serde_json::Value::Null,
        }
    }

    /// Set the subtype
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Attach the raw vendor payload
    pub fn with_original(mut self, original: serde_json::Value) -> Self {
        self.original_event = original;
        self
    }
}
