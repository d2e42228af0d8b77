use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex as RoundLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::classifier::classify;
use crate::config::{ConfigError, MonitorConfig};
use crate::events::{MonitorEvent, SubscriptionId, Subscribers};
use crate::history::TargetHistory;
use crate::models::{HealthStatus, ProbeOutcome, TargetStats};
use crate::probe::{IcmpProbe, Probe};

/// Probe scheduler and statistics engine.
///
/// Holds a fixed target list, runs one concurrent probe round per interval
/// once started, and publishes [`MonitorEvent`]s. Dropping the monitor stops
/// it.
pub struct Monitor {
    inner: Arc<MonitorInner>,
    runner: Mutex<Option<Runner>>,
}

struct Runner {
    shutdown: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

struct MonitorInner {
    targets: Vec<String>,
    round_interval: Duration,
    probe_timeout: Duration,
    probe: Arc<dyn Probe>,
    histories: RwLock<HashMap<String, TargetHistory>>,
    status: RwLock<HealthStatus>,
    subscribers: Subscribers,
    round_lock: RoundLock<()>,
}

impl Monitor {
    /// Builds a monitor backed by real ICMP probes. Must be called from
    /// within a Tokio runtime, since the ICMP sockets register with its
    /// reactor.
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        let probe = IcmpProbe::new()?;
        Ok(Self::with_probe(config, Arc::new(probe))?)
    }

    /// Builds a monitor around any [`Probe`] implementation.
    pub fn with_probe(
        config: &MonitorConfig,
        probe: Arc<dyn Probe>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let targets = config.resolved_targets()?;
        let histories = targets
            .iter()
            .map(|t| (t.clone(), TargetHistory::new(t.clone())))
            .collect();

        info!("Monitoring {} targets: {}", targets.len(), targets.join(", "));

        Ok(Self {
            inner: Arc::new(MonitorInner {
                targets,
                round_interval: config.round_interval(),
                probe_timeout: config.probe_timeout(),
                probe,
                histories: RwLock::new(histories),
                status: RwLock::new(HealthStatus::Poor),
                subscribers: Subscribers::new(),
                round_lock: RoundLock::new(()),
            }),
            runner: Mutex::new(None),
        })
    }

    /// Starts periodic rounds, the first one immediately. Must be called from
    /// within a Tokio runtime. Does nothing if already running.
    pub fn start(&self) {
        let mut runner = self.runner.lock();
        if runner.is_some() {
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run(shutdown_rx).await });

        info!("Monitor started, round interval {:?}", self.inner.round_interval);
        *runner = Some(Runner { shutdown, _task: task });
    }

    /// Stops scheduling rounds. A round already in flight finishes on its own.
    pub fn stop(&self) {
        if let Some(runner) = self.runner.lock().take() {
            let _ = runner.shutdown.send(true);
            info!("Monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.runner.lock().is_some()
    }

    /// Runs one round now. Waits for any round already in progress first.
    pub async fn run_round(&self) -> HealthStatus {
        self.inner.run_round().await
    }

    pub fn targets(&self) -> &[String] {
        &self.inner.targets
    }

    pub fn current_status(&self) -> HealthStatus {
        *self.inner.status.read()
    }

    pub fn stats(&self) -> HashMap<String, TargetStats> {
        self.inner
            .histories
            .read()
            .iter()
            .map(|(target, history)| (target.clone(), history.snapshot()))
            .collect()
    }

    pub fn stats_in_order(&self) -> Vec<TargetStats> {
        let histories = self.inner.histories.read();
        self.inner
            .targets
            .iter()
            .filter_map(|t| histories.get(t).map(TargetHistory::snapshot))
            .collect()
    }

    /// Multi-line summary used for tray tooltips.
    pub fn summary_text(&self) -> String {
        let stats = self.stats_in_order();
        let mut lines = vec!["Network Health Monitor".to_string()];
        for target in &stats {
            lines.push(format!("{}: {}", target.target, target.current_latency_label()));
        }

        let avg_loss = if stats.is_empty() {
            0.0
        } else {
            stats.iter().map(|t| t.stats.packet_loss_percent).sum::<f64>() / stats.len() as f64
        };
        lines.push(format!("Loss: {:.1}%", avg_loss));
        lines.join("\n")
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn on_status_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(HealthStatus) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let MonitorEvent::StatusChanged(status) = event {
                callback(*status);
            }
        })
    }

    pub fn on_stats_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if matches!(event, MonitorEvent::StatsUpdated) {
                callback();
            }
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl MonitorInner {
    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.round_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    self.run_round().await;
                }
            }
        }
        debug!("Round loop exited");
    }

    async fn run_round(&self) -> HealthStatus {
        let _round = self.round_lock.lock().await;
        let started = Instant::now();

        let outcomes = self.probe_all().await;

        let new_status = {
            let mut histories = self.histories.write();
            for (target, outcome) in self.targets.iter().zip(outcomes) {
                if let Some(history) = histories.get_mut(target) {
                    history.record(outcome);
                }
            }
            classify(histories.values().map(TargetHistory::stats))
        };

        let previous = std::mem::replace(&mut *self.status.write(), new_status);

        if previous != new_status {
            let msg = format!("[CHANGE] network health {} -> {}", previous, new_status);
            match new_status {
                HealthStatus::Poor => error!("{}", msg),
                HealthStatus::Degraded => warn!("{}", msg),
                HealthStatus::Healthy => info!("{}", msg),
            }
            self.subscribers.notify(&MonitorEvent::StatusChanged(new_status));
        }
        self.subscribers.notify(&MonitorEvent::StatsUpdated);

        debug!(
            "Round completed {} probes in {}ms, status {}",
            self.targets.len(),
            started.elapsed().as_millis(),
            new_status
        );
        new_status
    }

    /// One outcome per configured target, in target order.
    async fn probe_all(&self) -> Vec<ProbeOutcome> {
        let mut tasks = FuturesUnordered::new();

        for (index, target) in self.targets.iter().enumerate() {
            let probe = Arc::clone(&self.probe);
            let target = target.clone();
            let timeout = self.probe_timeout;
            let handle = tokio::spawn(async move { probe.probe(&target, timeout).await });
            tasks.push(async move { (index, handle.await) });
        }

        let mut outcomes = Vec::with_capacity(self.targets.len());
        while let Some((index, joined)) = tasks.next().await {
            let target = &self.targets[index];
            let outcome = match joined {
                Ok(outcome) if outcome.target() == target => outcome,
                Ok(outcome) => {
                    warn!(
                        "Outcome for {} reported as {}, counting as failure",
                        target,
                        outcome.target()
                    );
                    ProbeOutcome::failure(target.clone())
                }
                Err(e) => {
                    warn!("Probe task for {} aborted: {}", target, e);
                    ProbeOutcome::failure(target.clone())
                }
            };
            outcomes.push((index, outcome));
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
