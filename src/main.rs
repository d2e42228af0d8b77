use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use net_health::notify::WebhookNotifier;
use net_health::{api, HealthStatus, Monitor, MonitorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(true)
        .init();

    let config = MonitorConfig::load()?;
    let monitor = Arc::new(Monitor::new(&config)?);

    monitor.on_status_changed(|status| {
        let indicator = match status {
            HealthStatus::Healthy => "green",
            HealthStatus::Degraded => "yellow",
            HealthStatus::Poor => "red",
        };
        info!("Indicator -> {} ({})", indicator, status);
    });

    if let Some(url) = &config.webhook_url {
        WebhookNotifier::new(url.clone()).attach(&monitor);
        info!("Webhook notifications enabled");
    }

    let api_monitor = Arc::clone(&monitor);
    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::start_server(api_port, api_monitor).await {
            tracing::error!("API server failed: {:#}", e);
        }
    });

    monitor.start();

    signal::ctrl_c().await?;
    info!("Shutdown signal received. Stopping network health monitor...");
    monitor.stop();

    Ok(())
}
