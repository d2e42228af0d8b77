pub mod api;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod events;
pub mod history;
pub mod models;
pub mod notify;
pub mod probe;

pub use classifier::classify;
pub use config::MonitorConfig;
pub use engine::Monitor;
pub use events::{MonitorEvent, SubscriptionId};
pub use history::{TargetHistory, HISTORY_CAPACITY};
pub use models::{HealthStatus, LatencyStats, ProbeOutcome, TargetStats};
pub use probe::{IcmpProbe, Probe};
