//! Fact map construction for event triggers
//!
//! Builds the flat fact map the rules engine evaluates: event fields,
//! resolved device/zone/location/connector context, and the legacy aliases
//! older rule configs reference. Every known-but-absent value is an
//! explicit JSON null so rules never see an undefined fact.

use serde_json::{json, Value};
use warden_core::StandardizedEvent;
use warden_resolver::EventContext;
use warden_rules::FactMap;

fn opt(value: Option<impl Into<Value>>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

/// Build the fact map for one event and its resolved context
pub fn build_fact_map(event: &StandardizedEvent, ctx: &EventContext) -> FactMap {
    let mut facts = FactMap::new();

    // Event facts
    facts.insert("event.id".into(), json!(event.event_id.to_string()));
    facts.insert("event.category".into(), json!(event.category));
    facts.insert("event.type".into(), json!(event.event_type));
    facts.insert("event.subtype".into(), opt(event.subtype.clone()));
    facts.insert(
        "event.displayState".into(),
        opt(event.payload.display_state.clone()),
    );
    facts.insert(
        "event.batteryPercentage".into(),
        opt(event.payload.battery()),
    );
    facts.insert(
        "event.timestamp".into(),
        json!(event.timestamp.to_rfc3339()),
    );
    for (key, value) in &event.payload.extra {
        facts.insert(format!("event.payload.{key}"), value.clone());
    }

    // Connector facts
    facts.insert("connector.id".into(), json!(ctx.connector.id));
    facts.insert("connector.name".into(), json!(ctx.connector.name));
    facts.insert(
        "connector.category".into(),
        json!(ctx.connector.category.as_str()),
    );

    // Device facts
    let device = ctx.device.as_ref();
    facts.insert("device.id".into(), opt(device.map(|d| d.id)));
    facts.insert(
        "device.externalId".into(),
        opt(device.map(|d| d.external_id.clone())),
    );
    facts.insert("device.name".into(), opt(device.map(|d| d.name.clone())));
    facts.insert(
        "device.type".into(),
        opt(device.map(|d| d.device_type.clone())),
    );
    facts.insert(
        "device.subtype".into(),
        opt(device.and_then(|d| d.subtype.clone())),
    );
    facts.insert(
        "device.status".into(),
        opt(device.and_then(|d| d.status.clone())),
    );
    facts.insert(
        "device.batteryPercentage".into(),
        opt(device.and_then(|d| d.battery_percentage)),
    );

    // Space facts
    let space = ctx.space.as_ref();
    facts.insert("space.id".into(), opt(space.map(|s| s.id)));
    facts.insert("space.name".into(), opt(space.map(|s| s.name.clone())));

    // Location facts
    let location = ctx.location.as_ref();
    facts.insert("location.id".into(), opt(location.map(|l| l.id)));
    facts.insert(
        "location.name".into(),
        opt(location.map(|l| l.name.clone())),
    );
    facts.insert(
        "location.timezone".into(),
        opt(location.map(|l| l.timezone.clone())),
    );

    // Zone facts
    let zone = ctx.alarm_zone.as_ref();
    facts.insert("zone.id".into(), opt(zone.map(|z| z.id)));
    facts.insert("zone.name".into(), opt(zone.map(|z| z.name.clone())));
    facts.insert(
        "zone.armedState".into(),
        opt(zone.map(|z| z.armed_state.as_str())),
    );

    // Legacy aliases kept for rule configs written against the raw event
    facts.insert("eventType".into(), json!(event.event_type));
    facts.insert("deviceId".into(), json!(event.device_id));
    facts.insert(
        "displayState".into(),
        opt(event.payload.display_state.clone()),
    );
    facts.insert(
        "batteryPercentage".into(),
        opt(event.payload.battery()),
    );

    facts
}
