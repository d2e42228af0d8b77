use std::collections::VecDeque;

use crate::models::{LatencyStats, ProbeOutcome, TargetStats};

pub const HISTORY_CAPACITY: usize = 60;

/// Rolling window of the last [`HISTORY_CAPACITY`] outcomes for one target.
#[derive(Debug, Clone)]
pub struct TargetHistory {
    target: String,
    window: VecDeque<ProbeOutcome>,
    stats: LatencyStats,
}

impl TargetHistory {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            window: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            stats: LatencyStats::default(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn stats(&self) -> &LatencyStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.window.iter()
    }

    pub fn record(&mut self, outcome: ProbeOutcome) {
        self.window.push_back(outcome);
        if self.window.len() > HISTORY_CAPACITY {
            self.window.pop_front();
        }
        self.recompute();
    }

    pub fn snapshot(&self) -> TargetStats {
        TargetStats {
            target: self.target.clone(),
            stats: self.stats,
            history: self.window.iter().cloned().collect(),
        }
    }

    fn recompute(&mut self) {
        let mut failed = 0usize;
        let mut successes = 0usize;
        let mut sum = 0u64;
        let mut min: Option<u64> = None;
        let mut max: Option<u64> = None;

        for outcome in &self.window {
            match outcome.latency_ms() {
                Some(ms) if outcome.is_success() => {
                    successes += 1;
                    sum += ms;
                    min = Some(min.map_or(ms, |m| m.min(ms)));
                    max = Some(max.map_or(ms, |m| m.max(ms)));
                }
                _ => failed += 1,
            }
        }

        let total = self.window.len();
        let packet_loss_percent = if total > 0 {
            failed as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        self.stats = LatencyStats {
            current_latency_ms: self.window.back().and_then(ProbeOutcome::latency_ms),
            average_latency_ms: (successes > 0).then(|| sum as f64 / successes as f64),
            min_latency_ms: min,
            max_latency_ms: max,
            packet_loss_percent,
            sample_count: total,
        };
    }
}
