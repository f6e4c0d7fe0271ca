//! Event context resolution
//!
//! Given a standardized event, loads the owning connector, the internal
//! device record, and its space/location/alarm-zone associations, all
//! scoped to the connector's organization. Both the event publisher and
//! the automation fact builder call the same routine so they always see
//! identical context for the same event.

use thiserror::Error;
use tracing::{debug, trace};
use warden_core::{AlarmZone, Connector, Device, Location, Space, StandardizedEvent};
use warden_store::{Store, StoreError};

/// Resolver errors
///
/// An unknown device is NOT an error; resolution degrades to null context.
/// Only an unknown connector (an event that should never have passed
/// ingestion) and storage faults surface here.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("unknown connector: {0}")]
    UnknownConnector(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for resolution
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Everything the pipeline knows about an event's surroundings
///
/// All fields except the connector degrade independently to `None` when
/// the device is not registered for this connector.
#[derive(Debug, Clone)]
pub struct EventContext {
    /// Connector that produced the event (establishes the organization)
    pub connector: Connector,

    /// Internal device record, if registered
    pub device: Option<Device>,

    /// Space the device is placed in
    pub space: Option<Space>,

    /// Location owning that space (or the zone's location)
    pub location: Option<Location>,

    /// Alarm zone the device belongs to
    pub alarm_zone: Option<AlarmZone>,
}

impl EventContext {
    /// Owning organization id
    pub fn organization_id(&self) -> &str {
        &self.connector.organization_id
    }
}

/// Resolve the full context for an event
///
/// Read-only; never fails on missing device/space/zone, where every dependent
/// field is simply `None`.
pub fn resolve_event_context(
    store: &Store,
    event: &StandardizedEvent,
) -> ResolverResult<EventContext> {
    let connector = store
        .find_connector(&event.connector_id)?
        .ok_or_else(|| ResolverError::UnknownConnector(event.connector_id.clone()))?;

    let device = store.find_device(&event.connector_id, &event.device_id)?;

    let Some(device) = device else {
        debug!(
            connector_id = %event.connector_id,
            device_id = %event.device_id,
            "Device not registered; resolving with null context"
        );
        return Ok(EventContext {
            connector,
            device: None,
            space: None,
            location: None,
            alarm_zone: None,
        });
    };

    let space = match device.space_id {
        Some(space_id) => store.find_space(space_id)?,
        None => None,
    };

    let alarm_zone = match device.alarm_zone_id {
        Some(zone_id) => store.find_zone(zone_id)?,
        None => None,
    };

    // Location comes from the space when placed, else from the zone
    let location_id = space
        .as_ref()
        .map(|s| s.location_id)
        .or_else(|| alarm_zone.as_ref().map(|z| z.location_id));
    let location = match location_id {
        Some(id) => store.find_location(id)?,
        None => None,
    };

    trace!(
        device_id = device.id,
        space = ?space.as_ref().map(|s| s.id),
        zone = ?alarm_zone.as_ref().map(|z| z.id),
        location = ?location.as_ref().map(|l| l.id),
        "Resolved event context"
    );

    Ok(EventContext {
        connector,
        device: Some(device),
        space,
        location,
        alarm_zone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{ConnectorCategory, StandardizedEvent, TriggerBehavior};
    use warden_store::Store;

    const ORG: &str = "org-test";

    fn seed(store: &Store) -> (i64, i64, i64) {
        store.create_organization(ORG, "Test Org").unwrap();
        store
            .create_connector(ORG, "conn-1", "Hub", ConnectorCategory::SensorHub, true)
            .unwrap();
        let location_id = store.create_location(ORG, "HQ", "UTC").unwrap();
        let space_id = store.create_space(ORG, location_id, "Lobby").unwrap();
        let zone_id = store
            .create_zone(ORG, location_id, "Perimeter", TriggerBehavior::Standard)
            .unwrap();
        store
            .create_device(
                ORG,
                "conn-1",
                "sensor-1",
                "Front Door",
                "contact_sensor",
                Some(space_id),
                Some(zone_id),
            )
            .unwrap();
        (location_id, space_id, zone_id)
    }

    #[test]
    fn test_full_resolution() {
        let store = Store::open_in_memory().unwrap();
        let (location_id, space_id, zone_id) = seed(&store);

        let event = StandardizedEvent::new("conn-1", "sensor-1", "device_state", "door_opened");
        let ctx = resolve_event_context(&store, &event).unwrap();

        assert_eq!(ctx.organization_id(), ORG);
        assert!(ctx.device.is_some());
        assert_eq!(ctx.space.as_ref().map(|s| s.id), Some(space_id));
        assert_eq!(ctx.alarm_zone.as_ref().map(|z| z.id), Some(zone_id));
        assert_eq!(ctx.location.as_ref().map(|l| l.id), Some(location_id));
    }

    #[test]
    fn test_unknown_device_degrades_to_null_context() {
        let store = Store::open_in_memory().unwrap();
        seed(&store);

        let event = StandardizedEvent::new("conn-1", "ghost-device", "device_state", "door_opened");
        let ctx = resolve_event_context(&store, &event).unwrap();

        assert!(ctx.device.is_none());
        assert!(ctx.space.is_none());
        assert!(ctx.location.is_none());
        assert!(ctx.alarm_zone.is_none());
    }

    #[test]
    fn test_unknown_connector_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        seed(&store);

        let event = StandardizedEvent::new("conn-404", "sensor-1", "device_state", "door_opened");
        assert!(matches!(
            resolve_event_context(&store, &event),
            Err(ResolverError::UnknownConnector(id)) if id == "conn-404"
        ));
    }

    #[test]
    fn test_location_falls_back_to_zone_when_no_space() {
        let store = Store::open_in_memory().unwrap();
        let (location_id, _, zone_id) = seed(&store);
        store
            .create_device(
                ORG,
                "conn-1",
                "sensor-2",
                "Back Door",
                "contact_sensor",
                None,
                Some(zone_id),
            )
            .unwrap();

        let event = StandardizedEvent::new("conn-1", "sensor-2", "device_state", "door_opened");
        let ctx = resolve_event_context(&store, &event).unwrap();

        assert!(ctx.space.is_none());
        assert_eq!(ctx.location.as_ref().map(|l| l.id), Some(location_id));
    }
}
