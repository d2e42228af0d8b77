use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Poor,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// A single probe result. Latency is present exactly when the probe succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    timestamp: DateTime<Utc>,
    target: String,
    success: bool,
    latency_ms: Option<u64>,
}

impl ProbeOutcome {
    pub fn success(target: impl Into<String>, latency_ms: u64) -> Self {
        Self::success_at(Utc::now(), target, latency_ms)
    }

    pub fn failure(target: impl Into<String>) -> Self {
        Self::failure_at(Utc::now(), target)
    }

    pub fn success_at(
        timestamp: DateTime<Utc>,
        target: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            timestamp,
            target: target.into(),
            success: true,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn failure_at(timestamp: DateTime<Utc>, target: impl Into<String>) -> Self {
        Self {
            timestamp,
            target: target.into(),
            success: false,
            latency_ms: None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }
}

/// Aggregates derived from one target's rolling window. `None` means no
/// successful outcome is in the window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyStats {
    pub current_latency_ms: Option<u64>,
    pub average_latency_ms: Option<f64>,
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: Option<u64>,
    pub packet_loss_percent: f64,
    pub sample_count: usize,
}

/// Read-only snapshot of one target handed out to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStats {
    pub target: String,
    #[serde(flatten)]
    pub stats: LatencyStats,
    pub history: Vec<ProbeOutcome>,
}

impl TargetStats {
    /// `"12ms"` for a live target, `"timeout"` when the latest probe failed.
    pub fn current_latency_label(&self) -> String {
        self.stats
            .current_latency_ms
            .map_or_else(|| "timeout".to_string(), |ms| format!("{}ms", ms))
    }
}
