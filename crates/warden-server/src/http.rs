//! Ingest API
//!
//! The one inbound surface the core exposes: connectors POST standardized
//! events, and receive an opaque acceptance once the event row is durable.
//! All later-stage failures (fan-out, alarm, automations) are swallowed by
//! design and never surface here.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};
use warden_core::StandardizedEvent;
use warden_pipeline::{EventPublisher, PublishError};

/// Shared handler state
pub struct AppState {
    /// The event pipeline
    pub publisher: EventPublisher,
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/events", post(ingest_event))
        .route("/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Accept one standardized event
///
/// 202 once the event row is stored; 409 for a replayed event id; 422 for
/// an event naming an unknown connector; 500 for storage faults.
async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<StandardizedEvent>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.publisher.process_event(&event).await {
        Ok(receipt) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "eventId": event.event_id.to_string(),
                "rowId": receipt.event_row_id,
            })),
        ),
        Err(PublishError::DuplicateEvent(id)) => {
            warn!(event_id = %id, "Rejected duplicate event");
            (
                StatusCode::CONFLICT,
                Json(json!({"error": "duplicate event", "eventId": id.to_string()})),
            )
        }
        Err(PublishError::UnknownConnector(connector_id)) => {
            warn!(connector_id, "Rejected event for unknown connector");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "unknown connector", "connectorId": connector_id})),
            )
        }
        Err(PublishError::Storage(e)) => {
            error!(event_id = %event.event_id, error = %e, "Event storage failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "storage failure"})),
            )
        }
    }
}
