//! Warden server
//!
//! Process entry point: loads configuration, opens the single store and
//! event bus handles, wires the pipeline components together, and runs the
//! ingest API alongside the scheduler tick loop.

mod http;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use warden_alarm::AlarmEngine;
use warden_automation::{ActionExecutor, AutomationEngine, PushServiceConfig};
use warden_config::WardenConfig;
use warden_drivers::{HttpCameraDriver, HttpDeviceCommandDriver, HttpPushDriver};
use warden_pipeline::{EventPublisher, ThumbnailCoordinator};
use warden_pubsub::EventBus;
use warden_store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "warden.yaml".to_string());
    let config = if Path::new(&config_path).exists() {
        WardenConfig::load(&config_path).context("loading configuration")?
    } else {
        info!(config_path, "No config file; using defaults and environment");
        WardenConfig::from_env().context("loading configuration from environment")?
    };

    info!("Starting Warden");

    // One handle per process; everything downstream gets these injected
    let store = Arc::new(Store::open(&config.database.path).context("opening store")?);
    let bus = Arc::new(EventBus::new());

    let client = reqwest::Client::new();
    let camera = Arc::new(HttpCameraDriver::new(
        client.clone(),
        config.connectors.camera_service_url.clone(),
    ));
    let push = Arc::new(HttpPushDriver::new(
        client.clone(),
        config.push.endpoint.clone(),
    ));
    let device_commands = Arc::new(HttpDeviceCommandDriver::new(
        client,
        config.connectors.device_command_url.clone(),
    ));

    let alarm = Arc::new(AlarmEngine::new(store.clone()));
    let executor = Arc::new(ActionExecutor::new(
        store.clone(),
        alarm.clone(),
        camera.clone(),
        push,
        device_commands,
        PushServiceConfig {
            enabled: config.push.enabled,
            api_token: config.push.api_token.clone(),
            default_recipient_key: config.push.default_recipient_key.clone(),
        },
    ));
    let automations = Arc::new(AutomationEngine::new(store.clone(), executor));
    let thumbnails = ThumbnailCoordinator::new(store.clone(), bus.clone(), camera);
    let publisher = EventPublisher::new(store, bus, alarm, automations.clone(), thumbnails);

    // Scheduler tick loop
    let tick_seconds = config.scheduler.tick_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(tick_seconds));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let now = chrono::Utc::now();
            if let Err(e) = automations.run_scheduled_tick(now).await {
                error!(error = %e, "Scheduled tick failed");
            }
        }
    });

    // Ingest API
    let state = Arc::new(http::AppState { publisher });
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!(bind = %config.server.bind, "Warden is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("serving API")?;

    Ok(())
}
