//! Event publisher
//!
//! Single-writer sequencing for event ingestion: persist the event row,
//! resolve context, fan out to real-time subscribers, apply device state
//! updates, then hand off to alarm evaluation and automation execution.
//! Only the event insert can abort processing; every later stage is
//! isolated so a fault in one never blocks the rest.

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;
use warden_alarm::AlarmEngine;
use warden_automation::AutomationEngine;
use warden_core::StandardizedEvent;
use warden_pubsub::{Channel, EventBus};
use warden_resolver::{resolve_event_context, EventContext, ResolverError};
use warden_store::{Store, StoreError};

use crate::thumbnail::ThumbnailCoordinator;

/// Errors that abort ingestion
///
/// Everything after the event insert degrades instead of failing; the
/// caller only ever sees these.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("duplicate event: {0}")]
    DuplicateEvent(Uuid),

    #[error("event storage failed: {0}")]
    Storage(StoreError),

    #[error("unknown connector: {0}")]
    UnknownConnector(String),
}

/// Result type for ingestion
pub type PublishResult<T> = Result<T, PublishError>;

/// Receipt returned once the event row is durable
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// Internal row id of the persisted event
    pub event_row_id: i64,
}

/// The event publishing pipeline
pub struct EventPublisher {
    store: Arc<Store>,
    bus: Arc<EventBus>,
    alarm: Arc<AlarmEngine>,
    automations: Arc<AutomationEngine>,
    thumbnails: ThumbnailCoordinator,
}

impl EventPublisher {
    /// Create a publisher over the injected handles
    pub fn new(
        store: Arc<Store>,
        bus: Arc<EventBus>,
        alarm: Arc<AlarmEngine>,
        automations: Arc<AutomationEngine>,
        thumbnails: ThumbnailCoordinator,
    ) -> Self {
        Self {
            store,
            bus,
            alarm,
            automations,
            thumbnails,
        }
    }

    /// Process one standardized event end to end
    ///
    /// The event row insert is the source of truth: its failure aborts
    /// everything. Fan-out, device updates, alarm evaluation, and
    /// automation execution each log-and-continue on error.
    pub async fn process_event(&self, event: &StandardizedEvent) -> PublishResult<IngestReceipt> {
        // (1) Persist the immutable event record
        let event_row_id = match self.store.insert_event(event) {
            Ok(id) => id,
            Err(StoreError::DuplicateEvent(id)) => {
                return Err(PublishError::DuplicateEvent(id));
            }
            Err(e) => return Err(PublishError::Storage(e)),
        };
        debug!(event_id = %event.event_id, event_row_id, "Event persisted");

        // (2) Resolve context; an unknown connector means the event should
        // never have been accepted
        let ctx = match resolve_event_context(&self.store, event) {
            Ok(ctx) => ctx,
            Err(ResolverError::UnknownConnector(id)) => {
                return Err(PublishError::UnknownConnector(id));
            }
            Err(ResolverError::Store(e)) => return Err(PublishError::Storage(e)),
        };

        // (3) Thumbnail acquisition (cost-gated, failure tolerant)
        let thumbnail = self.thumbnails.acquire(event, &ctx).await;

        // (4) Real-time fan-out; a pub/sub fault must not block anything
        self.publish_messages(event, &ctx, thumbnail.as_deref());

        // (5) Device state/battery updates from the payload
        if let Err(e) = self.apply_device_update(event, &ctx) {
            error!(event_id = %event.event_id, error = %e, "Device update failed");
        }

        // (6) Alarm zone evaluation
        if let Some(zone) = &ctx.alarm_zone {
            if let Err(e) = self.alarm.evaluate_event(event, zone) {
                error!(
                    event_id = %event.event_id,
                    zone_id = zone.id,
                    error = %e,
                    "Alarm evaluation failed"
                );
            }
        }

        // (7) Automation fan-out
        if let Err(e) = self
            .automations
            .handle_event(event, &ctx, thumbnail.as_deref())
            .await
        {
            error!(event_id = %event.event_id, error = %e, "Automation dispatch failed");
        }

        info!(event_id = %event.event_id, "Event processed");
        Ok(IngestReceipt { event_row_id })
    }

    /// Build and publish the base and thumbnail message variants
    fn publish_messages(
        &self,
        event: &StandardizedEvent,
        ctx: &EventContext,
        thumbnail: Option<&str>,
    ) {
        let organization_id = ctx.organization_id();
        let base = enriched_message(event, ctx, None);
        self.bus.publish(&Channel::events(organization_id), base);

        // The thumbnail variant only goes out when someone is watching
        let thumbnail_channel = Channel::thumbnail_events(organization_id);
        if self.bus.subscriber_count(&thumbnail_channel) > 0 {
            let enriched = enriched_message(event, ctx, thumbnail);
            self.bus.publish(&thumbnail_channel, enriched);
        }
    }

    /// Partial device update: only payload-present fields are written
    fn apply_device_update(
        &self,
        event: &StandardizedEvent,
        ctx: &EventContext,
    ) -> Result<(), StoreError> {
        let Some(device) = &ctx.device else {
            return Ok(());
        };

        self.store.update_device_state(
            device.id,
            event.payload.display_state.as_deref(),
            event.payload.battery(),
        )
    }
}

/// Message published to live viewers
fn enriched_message(
    event: &StandardizedEvent,
    ctx: &EventContext,
    thumbnail: Option<&str>,
) -> serde_json::Value {
    json!({
        "eventId": event.event_id.to_string(),
        "timestamp": event.timestamp.to_rfc3339(),
        "category": event.category,
        "type": event.event_type,
        "subtype": event.subtype,
        "payload": event.payload,
        "connector": {
            "id": ctx.connector.id,
            "name": ctx.connector.name,
        },
        "device": ctx.device.as_ref().map(|d| json!({
            "id": d.id,
            "name": d.name,
            "type": d.device_type,
        })),
        "space": ctx.space.as_ref().map(|s| json!({"id": s.id, "name": s.name})),
        "location": ctx.location.as_ref().map(|l| json!({"id": l.id, "name": l.name})),
        "alarmZone": ctx.alarm_zone.as_ref().map(|z| json!({
            "id": z.id,
            "name": z.name,
            "armedState": z.armed_state.as_str(),
        })),
        "thumbnail": thumbnail,
    })
}
