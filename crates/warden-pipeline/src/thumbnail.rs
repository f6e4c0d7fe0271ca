//! Thumbnail coordination
//!
//! A camera snapshot is only worth fetching when someone will use it:
//! either live viewers are subscribed to the organization's thumbnail
//! channel, or an enabled automation's action params reference the
//! thumbnail token. A missing or failed thumbnail never blocks event
//! processing.

use base64::Engine as _;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_core::{taxonomy, Device, StandardizedEvent};
use warden_drivers::CameraDriver;
use warden_pubsub::{Channel, EventBus};
use warden_resolver::EventContext;
use warden_store::Store;

/// Token automations declare to depend on a thumbnail
const THUMBNAIL_TOKEN: &str = "{{event.thumbnail";

/// Whether this event category can meaningfully carry a snapshot
///
/// Analytics detections with at least one candidate camera qualify;
/// device-health and access noise does not.
pub fn is_thumbnail_eligible(event: &StandardizedEvent, candidate_cameras: &[Device]) -> bool {
    if candidate_cameras.is_empty() {
        return false;
    }
    event.category == taxonomy::CATEGORY_ANALYTICS
        || event.event_type == taxonomy::TYPE_DOOR_OPENED
        || event.event_type == taxonomy::TYPE_GLASS_BREAK
}

/// Decides whether to fetch a snapshot for an event, and fetches it
pub struct ThumbnailCoordinator {
    store: Arc<Store>,
    bus: Arc<EventBus>,
    camera: Arc<dyn CameraDriver>,
}

impl ThumbnailCoordinator {
    /// Create a coordinator over the injected handles
    pub fn new(store: Arc<Store>, bus: Arc<EventBus>, camera: Arc<dyn CameraDriver>) -> Self {
        Self { store, bus, camera }
    }

    /// Fetch a thumbnail as a data URI if anyone will use it
    ///
    /// Returns `None` on ineligibility, no demand, or fetch failure; all
    /// are cost-control or degradation outcomes, never processing failures.
    pub async fn acquire(
        &self,
        event: &StandardizedEvent,
        ctx: &EventContext,
    ) -> Option<String> {
        let candidates = self.candidate_cameras(ctx);

        if !is_thumbnail_eligible(event, &candidates) {
            return None;
        }

        let organization_id = ctx.organization_id();
        let has_viewers =
            self.bus.subscriber_count(&Channel::thumbnail_events(organization_id)) > 0;

        if !has_viewers && !self.automation_requires_thumbnail(organization_id) {
            debug!(
                event_id = %event.event_id,
                "No thumbnail demand; skipping snapshot fetch"
            );
            return None;
        }

        for camera in &candidates {
            match self
                .camera
                .fetch_best_shot_image(&camera.connector_id, &camera.external_id)
                .await
            {
                Ok(bytes) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                    debug!(
                        event_id = %event.event_id,
                        camera_id = camera.id,
                        bytes = bytes.len(),
                        "Fetched thumbnail"
                    );
                    return Some(format!("data:image/jpeg;base64,{encoded}"));
                }
                Err(e) => {
                    // Treated as "no thumbnail", never as a failure
                    warn!(
                        event_id = %event.event_id,
                        camera_id = camera.id,
                        error = %e,
                        "Thumbnail fetch failed; trying next candidate"
                    );
                }
            }
        }

        None
    }

    /// Candidate cameras: those in the event's space
    fn candidate_cameras(&self, ctx: &EventContext) -> Vec<Device> {
        let Some(space) = &ctx.space else {
            return Vec::new();
        };
        match self.store.cameras_in_space(space.id) {
            Ok(cameras) => cameras,
            Err(e) => {
                warn!(space_id = space.id, error = %e, "Camera lookup failed");
                Vec::new()
            }
        }
    }

    /// Whether any enabled automation's action params reference the
    /// thumbnail token
    fn automation_requires_thumbnail(&self, organization_id: &str) -> bool {
        match self.store.enabled_automations(organization_id) {
            Ok(automations) => automations
                .iter()
                .any(|a| a.config_json.to_string().contains(THUMBNAIL_TOKEN)),
            Err(e) => {
                warn!(organization_id, error = %e, "Automation scan failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::EventPayload;

    fn camera_device(id: i64) -> Device {
        Device {
            id,
            organization_id: "org".into(),
            connector_id: "conn-cam".into(),
            external_id: format!("cam-{id}"),
            name: "Cam".into(),
            device_type: "camera".into(),
            subtype: None,
            status: None,
            battery_percentage: None,
            space_id: Some(1),
            alarm_zone_id: None,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_eligibility_requires_candidates() {
        let event = StandardizedEvent::new("c", "d", "analytics", "person_detected");
        assert!(!is_thumbnail_eligible(&event, &[]));
        assert!(is_thumbnail_eligible(&event, &[camera_device(1)]));
    }

    #[test]
    fn test_eligibility_by_taxonomy() {
        let cams = [camera_device(1)];

        let person = StandardizedEvent::new("c", "d", "analytics", "person_detected");
        assert!(is_thumbnail_eligible(&person, &cams));

        let door = StandardizedEvent::new("c", "d", "device_state", "door_opened")
            .with_payload(EventPayload::with_display_state("open"));
        assert!(is_thumbnail_eligible(&door, &cams));

        let battery = StandardizedEvent::new("c", "d", "device_health", "battery_level");
        assert!(!is_thumbnail_eligible(&battery, &cams));
    }
}
