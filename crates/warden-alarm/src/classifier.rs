//! Standard trigger classification
//!
//! The fixed platform-wide table deciding whether an event type should
//! trigger an armed zone. Zones with custom behavior consult their
//! per-event-type overrides first and fall back here.

use warden_core::taxonomy;

/// Classification entries: (event type, optional subtype, optional
/// display-state gate) → trigger.
///
/// A `None` subtype matches any subtype; a display-state gate requires the
/// payload to carry that exact state (a closed door re-reporting "closed"
/// must not trip the alarm).
static TRIGGER_TABLE: &[(&str, Option<&str>, Option<&str>)] = &[
    (taxonomy::TYPE_DOOR_OPENED, None, None),
    (taxonomy::TYPE_WINDOW_OPENED, None, None),
    (taxonomy::TYPE_GLASS_BREAK, None, None),
    (taxonomy::TYPE_MOTION_DETECTED, None, Some(taxonomy::DISPLAY_MOTION)),
    (taxonomy::TYPE_PERSON_DETECTED, None, None),
    (taxonomy::TYPE_LOCK_UNLOCKED, None, None),
    (taxonomy::TYPE_ACCESS_DENIED, Some("forced_entry"), None),
];

/// Whether the standard classification marks this event as a trigger
pub fn should_trigger_alarm(
    event_type: &str,
    subtype: Option<&str>,
    display_state: Option<&str>,
) -> bool {
    TRIGGER_TABLE.iter().any(|(t, sub, state)| {
        if *t != event_type {
            return false;
        }
        if let Some(required_subtype) = sub {
            if subtype != Some(*required_subtype) {
                return false;
            }
        }
        if let Some(required_state) = state {
            if display_state != Some(*required_state) {
                return false;
            }
        }
        true
    })
}
