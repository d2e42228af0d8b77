//! Health classification thresholds.
//!
//! The same constants drive the overall status and the per-value indicator
//! levels shown next to each latency or loss figure, so they stay in sync.

use crate::models::{HealthStatus, LatencyStats};

/// Average latency at or above this is Degraded.
pub const DEGRADED_LATENCY_MS: f64 = 100.0;
/// Average latency above this is Poor.
pub const POOR_LATENCY_MS: f64 = 200.0;
/// Any loss above this is Degraded.
pub const DEGRADED_LOSS_PERCENT: f64 = 0.0;
/// Loss above this is Poor.
pub const POOR_LOSS_PERCENT: f64 = 5.0;

/// Classifies the worst target. Targets without a successful outcome are left
/// out of the latency maximum; if none has one, the latency is treated as
/// unbounded and the result is Poor.
pub fn classify<'a, I>(stats: I) -> HealthStatus
where
    I: IntoIterator<Item = &'a LatencyStats>,
{
    let mut worst_avg: Option<f64> = None;
    let mut worst_loss = 0.0_f64;

    for target in stats {
        if let Some(avg) = target.average_latency_ms {
            worst_avg = Some(worst_avg.map_or(avg, |w| w.max(avg)));
        }
        worst_loss = worst_loss.max(target.packet_loss_percent);
    }

    let worst_avg = worst_avg.unwrap_or(f64::INFINITY);

    if worst_avg > POOR_LATENCY_MS || worst_loss > POOR_LOSS_PERCENT {
        HealthStatus::Poor
    } else if worst_avg >= DEGRADED_LATENCY_MS || worst_loss > DEGRADED_LOSS_PERCENT {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

impl HealthStatus {
    /// Indicator level for a single latency reading.
    pub fn for_latency(latency_ms: u64) -> Self {
        let latency = latency_ms as f64;
        if latency < DEGRADED_LATENCY_MS {
            HealthStatus::Healthy
        } else if latency <= POOR_LATENCY_MS {
            HealthStatus::Degraded
        } else {
            HealthStatus::Poor
        }
    }

    /// Indicator level for a packet-loss percentage.
    pub fn for_loss(loss_percent: f64) -> Self {
        if loss_percent > POOR_LOSS_PERCENT {
            HealthStatus::Poor
        } else if loss_percent > DEGRADED_LOSS_PERCENT {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
