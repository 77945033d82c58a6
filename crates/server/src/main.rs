mod bootstrap;
mod health;
mod webhook;

use std::time::Duration;

use anyhow::Result;
use clarity_chat::{EventPump, DEFAULT_QUEUE_CAPACITY};
use clarity_core::config::{AppConfig, LoadOptions};
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use clarity_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging needs the loaded config, so it starts before bootstrap
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let config = app.config;
    let (events, pump) = EventPump::channel(DEFAULT_QUEUE_CAPACITY, app.dispatcher);
    let pump_task = tokio::spawn(pump.run());

    let routes = webhook::router(webhook::WebhookState::new(
        events.clone(),
        config.chat.verification_token.clone(),
    ))
    .merge(health::router(health::HealthState::new(events, config.llm.model.clone())));

    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        bot_id = %config.chat.bot_id,
        "clarity-server listening"
    );

    axum::serve(listener, routes).with_graceful_shutdown(wait_for_shutdown()).await?;

    // The router held the last senders; the pump finishes whatever is still queued.
    let grace = Duration::from_secs(config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, pump_task).await {
        Ok(Ok(handled)) => info!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            handled,
            "clarity-server stopped"
        ),
        Ok(Err(error)) => warn!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            error = %error,
            "event pump task failed"
        ),
        Err(_) => warn!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            grace_secs = config.server.graceful_shutdown_secs,
            "event pump did not drain before the shutdown grace period"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for ctrl-c; shutting down"
        );
    }
}
