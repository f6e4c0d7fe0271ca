//! Automation evaluation and execution
//!
//! This crate implements the automation half of the event pipeline:
//! trigger evaluation (JSON rule trees for event automations, CRON and
//! solar schedules for scheduled ones), token-template resolution, action
//! execution against the collaborating drivers, and the execution ledger
//! that records every firing.

mod config;
mod cron;
mod engine;
mod executor;
mod facts;
mod ledger;
mod schedule;
pub mod tokens;

pub use config::{
    ActionConfig, ActionableState, AutomationConfig, ConfigError, CreateBookmarkParams,
    CreateEventParams, HeaderTemplate, ScheduleConfig, SendHttpRequestParams,
    SendPushNotificationParams, SetDeviceStateParams, TimeOfDayFilter, TriggerConfig,
    ZoneActionParams,
};
pub use cron::{CronError, CronExpr};
pub use engine::AutomationEngine;
pub use executor::{
    ActionError, ActionExecutor, ActionOutcome, ActionResult, ActionScope, PushServiceConfig,
};
pub use facts::build_fact_map;
pub use ledger::{ExecutionHandle, ExecutionLedger};
pub use schedule::schedule_should_fire;
