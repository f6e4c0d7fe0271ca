//! Action execution
//!
//! Dispatches one action variant at a time against the collaborating
//! drivers. Each action's failure is isolated by the engine: an error
//! returned here marks that action failed in the ledger and the next
//! action still runs.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use warden_alarm::{AlarmEngine, AlarmError, REASON_AUTOMATION_ACTION};
use warden_core::{AlarmZone, ArmedState, Device};
use warden_drivers::{
    BookmarkPayload, CameraDriver, CameraEventPayload, DeviceCommandDriver, DriverError,
    PushDriver, PushParams,
};
use warden_store::{Store, StoreError, StoredAutomation};

use crate::config::{
    ActionConfig, ActionableState, CreateBookmarkParams, CreateEventParams,
    SendHttpRequestParams, SendPushNotificationParams, SetDeviceStateParams, ZoneActionParams,
};
use crate::tokens;

/// User-Agent sent on automation HTTP requests
const HTTP_USER_AGENT: &str = "warden-automation/0.3";

/// Action execution errors; each becomes a ledger failure message
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("connector not found: {0}")]
    ConnectorNotFound(String),

    #[error("unsupported connector category '{category}' for connector {connector_id}")]
    UnsupportedConnectorCategory {
        connector_id: String,
        category: &'static str,
    },

    #[error("device not found: {0}")]
    DeviceNotFound(i64),

    #[error("zone not found: {0}")]
    ZoneNotFound(i64),

    #[error("invalid target state: {0}")]
    InvalidTargetState(String),

    #[error("invalid action parameter: {0}")]
    InvalidParam(String),

    #[error("notification service is not configured: {0}")]
    PushNotConfigured(&'static str),

    #[error("notification rejected by gateway: {0}")]
    PushRejected(String),

    #[error("HTTP request returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    HttpTransport(#[from] reqwest::Error),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Alarm(#[from] AlarmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for action execution
pub type ActionResult<T> = Result<T, ActionError>;

/// How an action settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Work was performed
    Completed,

    /// Nothing to do (e.g. bookmark with no camera target); not a failure
    Skipped(&'static str),
}

/// Per-firing context an action executes within
pub struct ActionScope<'a> {
    /// The automation being executed (location scope for zone actions)
    pub automation: &'a StoredAutomation,

    /// The device the triggering event resolved to, if any
    pub source_device: Option<&'a Device>,

    /// Trigger instant, stamped onto created events/bookmarks
    pub trigger_timestamp: DateTime<Utc>,
}

/// Push-notification service settings for an organization
#[derive(Debug, Clone, Default)]
pub struct PushServiceConfig {
    /// Whether the service is enabled at all
    pub enabled: bool,

    /// Gateway application token
    pub api_token: Option<String>,

    /// Default recipient group key when an action names no user
    pub default_recipient_key: Option<String>,
}

/// Executes one action at a time against the collaborating drivers
pub struct ActionExecutor {
    store: Arc<Store>,
    alarm: Arc<AlarmEngine>,
    camera: Arc<dyn CameraDriver>,
    push: Arc<dyn PushDriver>,
    device_commands: Arc<dyn DeviceCommandDriver>,
    http: reqwest::Client,
    push_config: PushServiceConfig,
}

impl ActionExecutor {
    /// Create an executor over the injected driver set
    pub fn new(
        store: Arc<Store>,
        alarm: Arc<AlarmEngine>,
        camera: Arc<dyn CameraDriver>,
        push: Arc<dyn PushDriver>,
        device_commands: Arc<dyn DeviceCommandDriver>,
        push_config: PushServiceConfig,
    ) -> Self {
        Self {
            store,
            alarm,
            camera,
            push,
            device_commands,
            http: reqwest::Client::new(),
            push_config,
        }
    }

    /// Execute one action with its params resolved against `token_ctx`
    pub async fn execute(
        &self,
        action: &ActionConfig,
        scope: &ActionScope<'_>,
        token_ctx: &Value,
    ) -> ActionResult<ActionOutcome> {
        match action {
            ActionConfig::CreateEvent(params) => self.create_event(params, scope, token_ctx).await,
            ActionConfig::CreateBookmark(params) => {
                self.create_bookmark(params, scope, token_ctx).await
            }
            ActionConfig::SendHttpRequest(params) => self.send_http(params, token_ctx).await,
            ActionConfig::SetDeviceState(params) => self.set_device_state(params).await,
            ActionConfig::SendPushNotification(params) => {
                self.send_push(params, token_ctx).await
            }
            ActionConfig::ArmAlarmZone(params) => {
                self.zone_action(params, scope, ArmedState::Armed).await
            }
            ActionConfig::DisarmAlarmZone(params) => {
                self.zone_action(params, scope, ArmedState::Disarmed).await
            }
        }
    }

    /// Resolve a target connector and require camera API support
    fn camera_connector(&self, connector_id: &str) -> ActionResult<String> {
        let connector = self
            .store
            .find_connector(connector_id)?
            .ok_or_else(|| ActionError::ConnectorNotFound(connector_id.to_string()))?;

        if !connector.category.supports_camera_api() {
            return Err(ActionError::UnsupportedConnectorCategory {
                connector_id: connector.id,
                category: connector.category.as_str(),
            });
        }
        Ok(connector.id)
    }

    async fn create_event(
        &self,
        params: &CreateEventParams,
        scope: &ActionScope<'_>,
        token_ctx: &Value,
    ) -> ActionResult<ActionOutcome> {
        let connector_id = self.camera_connector(&params.target_connector_id)?;

        let payload = CameraEventPayload {
            label: tokens::resolve_string(&params.label, token_ctx),
            description: params
                .description
                .as_ref()
                .map(|d| tokens::resolve_string(d, token_ctx)),
            timestamp: scope.trigger_timestamp,
        };

        self.camera.create_event(&connector_id, &payload).await?;
        Ok(ActionOutcome::Completed)
    }

    async fn create_bookmark(
        &self,
        params: &CreateBookmarkParams,
        scope: &ActionScope<'_>,
        token_ctx: &Value,
    ) -> ActionResult<ActionOutcome> {
        let connector_id = self.camera_connector(&params.target_connector_id)?;

        let cameras = match scope.source_device {
            Some(device) => self.store.cameras_for_device(device)?,
            None => Vec::new(),
        };
        if cameras.is_empty() {
            // A bookmark with no camera target is meaningless; skipping is
            // not a failure
            debug!(
                automation_id = scope.automation.id,
                "No associated cameras for bookmark; skipping"
            );
            return Ok(ActionOutcome::Skipped("no associated cameras"));
        }

        let payload = BookmarkPayload {
            name: tokens::resolve_string(&params.name, token_ctx),
            description: params
                .description
                .as_ref()
                .map(|d| tokens::resolve_string(d, token_ctx)),
            timestamp: scope.trigger_timestamp,
            duration_seconds: params.duration_seconds,
        };

        for camera in &cameras {
            self.camera
                .create_bookmark(&connector_id, &camera.external_id, &payload)
                .await?;
        }
        Ok(ActionOutcome::Completed)
    }

    async fn send_http(
        &self,
        params: &SendHttpRequestParams,
        token_ctx: &Value,
    ) -> ActionResult<ActionOutcome> {
        let url = tokens::resolve_string(&params.url, token_ctx);
        let method = reqwest::Method::from_bytes(params.method.to_uppercase().as_bytes())
            .map_err(|_| ActionError::InvalidParam(format!("bad HTTP method '{}'", params.method)))?;

        let has_body = method == reqwest::Method::POST
            || method == reqwest::Method::PUT
            || method == reqwest::Method::PATCH;

        let mut request = self
            .http
            .request(method, url.as_str())
            .header(reqwest::header::USER_AGENT, HTTP_USER_AGENT);

        // User headers resolve element-wise, key and value both
        for header in &params.headers {
            let key = tokens::resolve_string(&header.key, token_ctx);
            let value = tokens::resolve_string(&header.value, token_ctx);
            request = request.header(key.as_str(), value.as_str());
        }

        if has_body {
            if let Some(body_template) = &params.body {
                let body = tokens::resolve_string(body_template, token_ctx);
                match &params.content_type {
                    Some(ct) => {
                        request = request.header(reqwest::header::CONTENT_TYPE, ct.as_str());
                    }
                    // Default JSON only when the resolved body parses as JSON
                    None if serde_json::from_str::<Value>(&body).is_ok() => {
                        request =
                            request.header(reqwest::header::CONTENT_TYPE, "application/json");
                    }
                    None => {}
                }
                request = request.body(body);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        // Body is captured for diagnostics regardless of content type
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ActionError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %url, status = status.as_u16(), "HTTP action completed");
        Ok(ActionOutcome::Completed)
    }

    async fn set_device_state(&self, params: &SetDeviceStateParams) -> ActionResult<ActionOutcome> {
        // Validate against the closed actionable-state set before any
        // driver traffic
        let state: ActionableState =
            serde_json::from_value(Value::String(params.target_state.clone()))
                .map_err(|_| ActionError::InvalidTargetState(params.target_state.clone()))?;

        let device = self
            .store
            .get_device(params.target_device_id)?
            .ok_or(ActionError::DeviceNotFound(params.target_device_id))?;

        self.device_commands
            .request_state_change(&device.connector_id, &device.external_id, state.as_str())
            .await?;

        info!(
            device_id = device.id,
            device = %device.name,
            state = state.as_str(),
            "Requested device state change"
        );
        Ok(ActionOutcome::Completed)
    }

    async fn send_push(
        &self,
        params: &SendPushNotificationParams,
        token_ctx: &Value,
    ) -> ActionResult<ActionOutcome> {
        if !self.push_config.enabled {
            return Err(ActionError::PushNotConfigured("service disabled"));
        }
        let api_token = self
            .push_config
            .api_token
            .as_deref()
            .ok_or(ActionError::PushNotConfigured("missing API token"))?;
        let recipient = params
            .target_user_key
            .as_deref()
            .or(self.push_config.default_recipient_key.as_deref())
            .ok_or(ActionError::PushNotConfigured("no recipient key"))?;

        let push_params = PushParams {
            title: tokens::resolve_string(&params.title, token_ctx),
            message: tokens::resolve_string(&params.message, token_ctx),
            url: None,
            url_title: None,
            priority: params.priority,
        };

        let outcome = self
            .push
            .send_notification(api_token, recipient, &push_params)
            .await?;

        if !outcome.is_success() {
            return Err(ActionError::PushRejected(outcome.error_detail()));
        }
        Ok(ActionOutcome::Completed)
    }

    /// Target zone set: explicit ids, else the automation's location scope,
    /// else every zone in the organization
    fn resolve_zones(
        &self,
        params: &ZoneActionParams,
        scope: &ActionScope<'_>,
    ) -> ActionResult<Vec<AlarmZone>> {
        if let Some(ids) = &params.zone_ids {
            return ids
                .iter()
                .map(|id| {
                    self.store
                        .find_zone(*id)?
                        .ok_or(ActionError::ZoneNotFound(*id))
                })
                .collect();
        }

        match scope.automation.location_id {
            Some(location_id) => Ok(self.store.zones_for_location(location_id)?),
            None => Ok(self
                .store
                .zones_for_organization(&scope.automation.organization_id)?),
        }
    }

    async fn zone_action(
        &self,
        params: &ZoneActionParams,
        scope: &ActionScope<'_>,
        target: ArmedState,
    ) -> ActionResult<ActionOutcome> {
        let zones = self.resolve_zones(params, scope)?;
        if zones.is_empty() {
            return Ok(ActionOutcome::Skipped("no zones in scope"));
        }

        // Per-zone errors re-throw; zones already committed stay committed
        for zone in &zones {
            self.alarm
                .set_armed_state(zone, target, REASON_AUTOMATION_ACTION)?;
        }

        info!(
            automation_id = scope.automation.id,
            zones = zones.len(),
            target = %target,
            "Zone action completed"
        );
        Ok(ActionOutcome::Completed)
    }
}
