//! Automation engine
//!
//! Fans incoming events and scheduler ticks out across an organization's
//! enabled automations. Automations evaluate concurrently and always all
//! settle (one automation's error never blocks another) while actions
//! within a single firing run strictly in declared order.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warden_core::{Device, StandardizedEvent, TriggerKind};
use warden_resolver::EventContext;
use warden_store::{Store, StoreResult, StoredAutomation};

use crate::config::{AutomationConfig, TriggerConfig};
use crate::executor::{ActionExecutor, ActionOutcome, ActionScope};
use crate::facts::build_fact_map;
use crate::ledger::ExecutionLedger;
use crate::schedule::schedule_should_fire;

/// The automation engine
pub struct AutomationEngine {
    store: Arc<Store>,
    executor: Arc<ActionExecutor>,
    ledger: ExecutionLedger,
}

impl AutomationEngine {
    /// Create an engine over the injected store and executor
    pub fn new(store: Arc<Store>, executor: Arc<ActionExecutor>) -> Self {
        let ledger = ExecutionLedger::new(store.clone());
        Self {
            store,
            executor,
            ledger,
        }
    }

    /// Evaluate all enabled automations of the event's organization
    ///
    /// Dispatches every automation concurrently and waits for all to
    /// settle; evaluation errors are logged and treated as non-match
    /// (fail closed).
    pub async fn handle_event(
        &self,
        event: &StandardizedEvent,
        ctx: &EventContext,
        thumbnail_data_uri: Option<&str>,
    ) -> StoreResult<()> {
        let automations = self.store.enabled_automations(ctx.organization_id())?;
        if automations.is_empty() {
            return Ok(());
        }

        let facts = build_fact_map(event, ctx);
        let base_token_ctx = event_token_context(event, ctx, thumbnail_data_uri);

        let runs = automations.into_iter().map(|automation| {
            let facts = &facts;
            let base_token_ctx = &base_token_ctx;
            async move {
                let Some(config) = self.matching_event_config(&automation, facts, event, ctx)
                else {
                    return;
                };

                let token_ctx = with_automation(base_token_ctx, &automation);
                self.run_automation(
                    &automation,
                    &config,
                    TriggerKind::Event,
                    event.timestamp,
                    Some(event.event_id),
                    ctx.device.as_ref(),
                    &token_ctx,
                )
                .await;
            }
        });

        join_all(runs).await;
        Ok(())
    }

    /// Evaluate all enabled scheduled automations against a tick instant
    ///
    /// Due automations fire concurrently, exactly like event fan-out.
    pub async fn run_scheduled_tick(&self, now: DateTime<Utc>) -> StoreResult<()> {
        let automations = self.store.all_enabled_automations()?;

        let runs = automations.into_iter().filter_map(|automation| {
            let config = match AutomationConfig::parse(&automation.config_json) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        automation_id = automation.id,
                        automation = %automation.name,
                        error = %e,
                        "Skipping automation with invalid config"
                    );
                    return None;
                }
            };

            let TriggerConfig::Scheduled { schedule } = &config.trigger else {
                return None;
            };

            if !schedule_should_fire(schedule, &automation, &self.store, now) {
                return None;
            }

            info!(
                automation_id = automation.id,
                automation = %automation.name,
                "Scheduled automation due"
            );

            Some(async move {
                let token_ctx = schedule_token_context(&automation, &self.store, now);
                self.run_automation(
                    &automation,
                    &config,
                    TriggerKind::Schedule,
                    now,
                    None,
                    None,
                    &token_ctx,
                )
                .await;
            })
        });

        join_all(runs.collect::<Vec<_>>()).await;
        Ok(())
    }

    /// Parse and structurally match an event automation; None on any
    /// mismatch or evaluation error
    fn matching_event_config(
        &self,
        automation: &StoredAutomation,
        facts: &warden_rules::FactMap,
        event: &StandardizedEvent,
        ctx: &EventContext,
    ) -> Option<AutomationConfig> {
        let config = match AutomationConfig::parse(&automation.config_json) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    automation_id = automation.id,
                    automation = %automation.name,
                    error = %e,
                    "Skipping automation with invalid config"
                );
                return None;
            }
        };

        let TriggerConfig::Event { rule, time_filter } = &config.trigger else {
            return None;
        };

        match warden_rules::evaluate(rule, facts) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                // Fail closed: a condition that cannot be proven true does
                // not fire
                warn!(
                    automation_id = automation.id,
                    automation = %automation.name,
                    event_id = %event.event_id,
                    error = %e,
                    "Rule evaluation failed; treating as non-match"
                );
                return None;
            }
        }

        // Structural match first, then the temporal gate
        if let Some(filter) = time_filter {
            let tz = location_timezone(ctx);
            let local_time = event.timestamp.with_timezone(&tz).time();
            if !filter.contains(local_time) {
                debug!(
                    automation_id = automation.id,
                    %local_time,
                    "Time-of-day filter rejected match"
                );
                return None;
            }
        }

        Some(config)
    }

    /// Run one automation firing: ledger entry, sequential actions, final
    /// status
    #[allow(clippy::too_many_arguments)]
    async fn run_automation(
        &self,
        automation: &StoredAutomation,
        config: &AutomationConfig,
        trigger_kind: TriggerKind,
        trigger_timestamp: DateTime<Utc>,
        trigger_event_id: Option<Uuid>,
        source_device: Option<&Device>,
        token_ctx: &Value,
    ) {
        let mut handle = match self.ledger.begin(
            &automation.organization_id,
            automation.id,
            trigger_kind,
            trigger_timestamp,
            trigger_event_id,
            config.actions.len() as u32,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                error!(
                    automation_id = automation.id,
                    error = %e,
                    "Could not open execution ledger entry; automation not run"
                );
                return;
            }
        };

        info!(
            automation_id = automation.id,
            automation = %automation.name,
            execution_id = handle.execution_id(),
            actions = config.actions.len(),
            "Executing automation"
        );

        let scope = ActionScope {
            automation,
            source_device,
            trigger_timestamp,
        };

        // Actions run strictly in declared order; action N+1 only
        // dispatches after action N's ledger update lands
        for (index, action) in config.actions.iter().enumerate() {
            let action_row = match handle.begin_action(
                index as u32,
                action.type_tag(),
                &action.params_json(),
            ) {
                Ok(id) => id,
                Err(e) => {
                    error!(
                        automation_id = automation.id,
                        action_index = index,
                        error = %e,
                        "Could not open action ledger row; action skipped"
                    );
                    continue;
                }
            };

            match self.executor.execute(action, &scope, token_ctx).await {
                Ok(ActionOutcome::Completed) => handle.action_succeeded(action_row),
                Ok(ActionOutcome::Skipped(reason)) => {
                    debug!(
                        automation_id = automation.id,
                        action_index = index,
                        reason,
                        "Action skipped"
                    );
                    handle.action_succeeded(action_row);
                }
                Err(e) => {
                    // Isolation: record the failure and keep going with the
                    // next action
                    warn!(
                        automation_id = automation.id,
                        action_index = index,
                        action_type = action.type_tag(),
                        error = %e,
                        "Action failed"
                    );
                    handle.action_failed(action_row, &e.to_string());
                }
            }
        }

        match handle.finalize() {
            Ok(status) => {
                info!(
                    automation_id = automation.id,
                    status = status.as_str(),
                    "Automation execution finalized"
                );
            }
            Err(e) => {
                error!(
                    automation_id = automation.id,
                    error = %e,
                    "Could not finalize execution ledger entry"
                );
            }
        }
    }
}

/// Timezone of the event's location, UTC when unknown
fn location_timezone(ctx: &EventContext) -> Tz {
    ctx.location
        .as_ref()
        .and_then(|l| l.timezone.parse().ok())
        .unwrap_or(Tz::UTC)
}

/// Token-resolution context for an event firing
fn event_token_context(
    event: &StandardizedEvent,
    ctx: &EventContext,
    thumbnail_data_uri: Option<&str>,
) -> Value {
    let mut payload = serde_json::Map::new();
    for (key, value) in &event.payload.extra {
        payload.insert(key.clone(), value.clone());
    }

    json!({
        "event": {
            "id": event.event_id.to_string(),
            "category": event.category,
            "type": event.event_type,
            "subtype": event.subtype,
            "displayState": event.payload.display_state,
            "batteryPercentage": event.payload.battery(),
            "timestamp": event.timestamp.to_rfc3339(),
            "thumbnail": thumbnail_data_uri,
            "payload": payload,
        },
        "device": ctx.device.as_ref().map(|d| json!({
            "id": d.id,
            "externalId": d.external_id,
            "name": d.name,
            "type": d.device_type,
            "subtype": d.subtype,
            "status": d.status,
            "batteryPercentage": d.battery_percentage,
        })),
        "space": ctx.space.as_ref().map(|s| json!({
            "id": s.id,
            "name": s.name,
        })),
        "zone": ctx.alarm_zone.as_ref().map(|z| json!({
            "id": z.id,
            "name": z.name,
            "armedState": z.armed_state.as_str(),
        })),
        "location": ctx.location.as_ref().map(|l| json!({
            "id": l.id,
            "name": l.name,
            "timezone": l.timezone,
        })),
        "connector": {
            "id": ctx.connector.id,
            "name": ctx.connector.name,
            "category": ctx.connector.category.as_str(),
        },
    })
}

/// Token-resolution context for a scheduled firing
fn schedule_token_context(
    automation: &StoredAutomation,
    store: &Store,
    now: DateTime<Utc>,
) -> Value {
    let location = automation
        .location_id
        .and_then(|id| store.find_location(id).ok().flatten());

    json!({
        "schedule": {
            "firedAt": now.to_rfc3339(),
        },
        "location": location.map(|l| json!({
            "id": l.id,
            "name": l.name,
            "timezone": l.timezone,
        })),
    })
}

/// Clone the base context and attach the automation's identity
fn with_automation(base: &Value, automation: &StoredAutomation) -> Value {
    let mut ctx = base.clone();
    if let Some(map) = ctx.as_object_mut() {
        map.insert(
            "automation".to_string(),
            json!({
                "id": automation.id,
                "name": automation.name,
            }),
        );
    }
    ctx
}
