//! Alarm zone state machine
//!
//! Decides whether incoming events flip a zone from ARMED to TRIGGERED and
//! performs explicit arm/disarm transitions. Every state change commits
//! together with its audit entry; a zone can only reach TRIGGERED while
//! ARMED, and DISARMED zones never trigger regardless of event content.

mod classifier;

pub use classifier::should_trigger_alarm;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use warden_core::{AlarmZone, ArmedState, AuditAction, AuditLogEntry, StandardizedEvent, TriggerBehavior};
use warden_store::{Store, StoreError};

/// Audit reason written when an event trips a zone
pub const REASON_EVENT_TRIGGER: &str = "alarm_event_trigger";

/// Audit reason for user-driven arm/disarm
pub const REASON_USER_ACTION: &str = "user_action";

/// Audit reason for automation-driven arm/disarm
pub const REASON_AUTOMATION_ACTION: &str = "automation_action";

/// Alarm engine errors
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("invalid transition for zone {zone_id}: {from} -> {to}")]
    InvalidTransition {
        zone_id: i64,
        from: ArmedState,
        to: ArmedState,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for alarm operations
pub type AlarmResult<T> = Result<T, AlarmError>;

/// Outcome of evaluating one event against one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Zone was not armed; nothing evaluated
    NotArmed,

    /// Event classified as non-triggering (standard table or override)
    NoTrigger,

    /// Zone transitioned to TRIGGERED
    Triggered,
}

/// The alarm zone state machine
pub struct AlarmEngine {
    store: Arc<Store>,
}

impl AlarmEngine {
    /// Create a new alarm engine
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Evaluate an incoming event against the device's zone
    ///
    /// Only ARMED zones are considered. Standard behavior applies the fixed
    /// classification table; custom behavior lets a matching per-event-type
    /// override win, falling back to the table when none matches. On a
    /// positive decision the TRIGGERED transition and its audit entry
    /// commit atomically; there is no retry if the write fails.
    pub fn evaluate_event(
        &self,
        event: &StandardizedEvent,
        zone: &AlarmZone,
    ) -> AlarmResult<TriggerDecision> {
        if zone.armed_state != ArmedState::Armed {
            return Ok(TriggerDecision::NotArmed);
        }

        let standard = should_trigger_alarm(
            &event.event_type,
            event.subtype.as_deref(),
            event.payload.display_state.as_deref(),
        );

        let triggers = match zone.trigger_behavior {
            TriggerBehavior::Standard => standard,
            TriggerBehavior::Custom => {
                match self.store.find_trigger_override(zone.id, &event.event_type)? {
                    Some(or) => {
                        debug!(
                            zone_id = zone.id,
                            event_type = %event.event_type,
                            should_trigger = or.should_trigger,
                            "Applying trigger override"
                        );
                        or.should_trigger
                    }
                    None => standard,
                }
            }
        };

        if !triggers {
            return Ok(TriggerDecision::NoTrigger);
        }

        let entry = AuditLogEntry::new(
            zone.organization_id.clone(),
            zone.id,
            AuditAction::Trigger,
            ArmedState::Armed,
            ArmedState::Triggered,
            REASON_EVENT_TRIGGER,
        )
        .with_trigger_event(event.event_id);

        match self.store.transition_zone_state(&entry) {
            Ok(()) => {
                info!(
                    zone_id = zone.id,
                    zone = %zone.name,
                    event_id = %event.event_id,
                    "Alarm zone triggered"
                );
                Ok(TriggerDecision::Triggered)
            }
            // Zone moved concurrently (disarmed mid-flight); missed triggers
            // are not resurrected
            Err(StoreError::NotFound { .. }) => {
                warn!(
                    zone_id = zone.id,
                    event_id = %event.event_id,
                    "Zone left ARMED state before trigger committed; skipping"
                );
                Ok(TriggerDecision::NoTrigger)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Explicit arm/disarm transition (user or automation driven)
    ///
    /// Returns `false` when the zone is already in the target state.
    /// TRIGGERED is not a valid target; only incoming events set it.
    pub fn set_armed_state(
        &self,
        zone: &AlarmZone,
        target: ArmedState,
        reason: &str,
    ) -> AlarmResult<bool> {
        if zone.armed_state == target {
            return Ok(false);
        }

        if target == ArmedState::Triggered {
            return Err(AlarmError::InvalidTransition {
                zone_id: zone.id,
                from: zone.armed_state,
                to: target,
            });
        }

        let action = match target {
            ArmedState::Armed => AuditAction::Arm,
            _ => AuditAction::Disarm,
        };

        let entry = AuditLogEntry::new(
            zone.organization_id.clone(),
            zone.id,
            action,
            zone.armed_state,
            target,
            reason,
        );

        self.store.transition_zone_state(&entry)?;
        info!(
            zone_id = zone.id,
            zone = %zone.name,
            from = %zone.armed_state,
            to = %target,
            reason,
            "Zone armed state changed"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{ConnectorCategory, EventPayload};

    const ORG: &str = "org-test";

    fn setup() -> (Arc<Store>, AlarmEngine, i64) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.create_organization(ORG, "Test").unwrap();
        store
            .create_connector(ORG, "conn-1", "Hub", ConnectorCategory::SensorHub, true)
            .unwrap();
        let location_id = store.create_location(ORG, "HQ", "UTC").unwrap();
        let zone_id = store
            .create_zone(ORG, location_id, "Perimeter", TriggerBehavior::Standard)
            .unwrap();
        let engine = AlarmEngine::new(store.clone());
        (store, engine, zone_id)
    }

    fn door_event() -> StandardizedEvent {
        StandardizedEvent::new("conn-1", "gate-1", "device_state", "door_opened")
            .with_payload(EventPayload::with_display_state("open"))
    }

    #[test]
    fn test_armed_zone_triggers_with_audit() {
        let (store, engine, zone_id) = setup();
        store.set_zone_state(zone_id, ArmedState::Armed).unwrap();
        let zone = store.find_zone(zone_id).unwrap().unwrap();

        let event = door_event();
        let decision = engine.evaluate_event(&event, &zone).unwrap();
        assert_eq!(decision, TriggerDecision::Triggered);

        let zone = store.find_zone(zone_id).unwrap().unwrap();
        assert_eq!(zone.armed_state, ArmedState::Triggered);

        let audit = store.audit_entries_for_zone(zone_id).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].reason, REASON_EVENT_TRIGGER);
        assert_eq!(audit[0].previous_state, ArmedState::Armed);
        assert_eq!(audit[0].new_state, ArmedState::Triggered);
        assert_eq!(audit[0].trigger_event_id, Some(event.event_id));
    }

    #[test]
    fn test_disarmed_zone_never_triggers() {
        let (store, engine, zone_id) = setup();
        let zone = store.find_zone(zone_id).unwrap().unwrap();
        assert_eq!(zone.armed_state, ArmedState::Disarmed);

        let decision = engine.evaluate_event(&door_event(), &zone).unwrap();
        assert_eq!(decision, TriggerDecision::NotArmed);

        let zone = store.find_zone(zone_id).unwrap().unwrap();
        assert_eq!(zone.armed_state, ArmedState::Disarmed);
        assert!(store.audit_entries_for_zone(zone_id).unwrap().is_empty());
    }

    #[test]
    fn test_triggered_zone_does_not_retrigger() {
        let (store, engine, zone_id) = setup();
        store.set_zone_state(zone_id, ArmedState::Triggered).unwrap();
        let zone = store.find_zone(zone_id).unwrap().unwrap();

        let decision = engine.evaluate_event(&door_event(), &zone).unwrap();
        assert_eq!(decision, TriggerDecision::NotArmed);
    }

    #[test]
    fn test_override_suppresses_standard_trigger() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.create_organization(ORG, "Test").unwrap();
        store
            .create_connector(ORG, "conn-1", "Hub", ConnectorCategory::SensorHub, true)
            .unwrap();
        let location_id = store.create_location(ORG, "HQ", "UTC").unwrap();
        let zone_id = store
            .create_zone(ORG, location_id, "Custom", TriggerBehavior::Custom)
            .unwrap();
        store.set_zone_state(zone_id, ArmedState::Armed).unwrap();
        store
            .set_trigger_override(zone_id, "door_opened", false)
            .unwrap();

        let engine = AlarmEngine::new(store.clone());
        let zone = store.find_zone(zone_id).unwrap().unwrap();

        // Override says no, even though the standard table says yes
        let decision = engine.evaluate_event(&door_event(), &zone).unwrap();
        assert_eq!(decision, TriggerDecision::NoTrigger);

        // Flip the override and the same event triggers
        store
            .set_trigger_override(zone_id, "door_opened", true)
            .unwrap();
        let decision = engine.evaluate_event(&door_event(), &zone).unwrap();
        assert_eq!(decision, TriggerDecision::Triggered);
    }

    #[test]
    fn test_custom_behavior_falls_back_to_standard() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.create_organization(ORG, "Test").unwrap();
        store
            .create_connector(ORG, "conn-1", "Hub", ConnectorCategory::SensorHub, true)
            .unwrap();
        let location_id = store.create_location(ORG, "HQ", "UTC").unwrap();
        let zone_id = store
            .create_zone(ORG, location_id, "Custom", TriggerBehavior::Custom)
            .unwrap();
        store.set_zone_state(zone_id, ArmedState::Armed).unwrap();

        let engine = AlarmEngine::new(store.clone());
        let zone = store.find_zone(zone_id).unwrap().unwrap();

        // No override for door_opened; the standard table applies
        let decision = engine.evaluate_event(&door_event(), &zone).unwrap();
        assert_eq!(decision, TriggerDecision::Triggered);
    }

    #[test]
    fn test_manual_arm_and_disarm() {
        let (store, engine, zone_id) = setup();
        let zone = store.find_zone(zone_id).unwrap().unwrap();

        assert!(engine
            .set_armed_state(&zone, ArmedState::Armed, REASON_USER_ACTION)
            .unwrap());

        let zone = store.find_zone(zone_id).unwrap().unwrap();
        assert_eq!(zone.armed_state, ArmedState::Armed);

        // Re-arming an armed zone is a no-op
        assert!(!engine
            .set_armed_state(&zone, ArmedState::Armed, REASON_USER_ACTION)
            .unwrap());

        assert!(engine
            .set_armed_state(&zone, ArmedState::Disarmed, REASON_AUTOMATION_ACTION)
            .unwrap());

        let audit = store.audit_entries_for_zone(zone_id).unwrap();
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn test_triggered_is_not_a_manual_target() {
        let (store, engine, zone_id) = setup();
        let zone = store.find_zone(zone_id).unwrap().unwrap();

        assert!(matches!(
            engine.set_armed_state(&zone, ArmedState::Triggered, REASON_USER_ACTION),
            Err(AlarmError::InvalidTransition { .. })
        ));
    }
}
