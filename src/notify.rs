use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::engine::Monitor;
use crate::events::SubscriptionId;
use crate::models::{HealthStatus, TargetStats};

/// Posts a JSON embed to a webhook on every health transition.
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Subscribes to `monitor`. The snapshot is taken inside the callback so
    /// the message matches the round that caused the transition.
    pub fn attach(self, monitor: &Arc<Monitor>) -> SubscriptionId {
        let weak = Arc::downgrade(monitor);
        monitor.on_status_changed(move |status| {
            let Some(monitor) = weak.upgrade() else { return };
            let payload = build_payload(status, &monitor.stats_in_order());

            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!("No async runtime, dropping webhook for {} transition", status);
                return;
            };
            let notifier = self.clone();
            runtime.spawn(async move { notifier.send(payload).await });
        })
    }

    async fn send(&self, payload: Value) {
        match self.http_client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => debug!("Webhook delivered"),
            Ok(response) => warn!("Webhook rejected with {}", response.status()),
            Err(e) => warn!("Webhook delivery failed: {}", e),
        }
    }
}

fn status_color(status: HealthStatus) -> u32 {
    match status {
        HealthStatus::Healthy => 0x2ECC71,
        HealthStatus::Degraded => 0xF1C40F,
        HealthStatus::Poor => 0xE74C3C,
    }
}

pub fn build_payload(status: HealthStatus, stats: &[TargetStats]) -> Value {
    let fields: Vec<Value> = stats
        .iter()
        .map(|t| {
            let average = t
                .stats
                .average_latency_ms
                .map_or("N/A".to_string(), |ms| format!("{:.1}ms", ms));
            json!({
                "name": t.target,
                "value": format!(
                    "now {} / avg {} / loss {:.1}%",
                    t.current_latency_label(),
                    average,
                    t.stats.packet_loss_percent
                ),
                "inline": true
            })
        })
        .collect();

    json!({
        "username": "Network Health Monitor",
        "embeds": [{
            "title": format!("Network health: {}", status),
            "color": status_color(status),
            "fields": fields,
            "timestamp": Utc::now().to_rfc3339(),
        }]
    })
}
