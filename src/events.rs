use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

use crate::models::HealthStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Fired only when a round changes the overall status.
    StatusChanged(HealthStatus),
    /// Fired after every completed round.
    StatsUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&MonitorEvent) + Send + Sync>;

/// Ordered callback list. Delivery works on a copy of the list, so callbacks
/// may subscribe or unsubscribe (from any thread) while an event is in flight.
#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, Callback)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every subscriber in order. A panicking callback is logged and
    /// skipped; the remaining subscribers still receive the event.
    pub fn notify(&self, event: &MonitorEvent) {
        let callbacks: Vec<Callback> =
            self.entries.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                error!("Subscriber panicked handling {:?}: {}", event, panic_message(&*panic));
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_subscription_order() {
        let subscribers = Subscribers::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            subscribers.subscribe(move |_| log.lock().push(name));
        }
        subscribers.notify(&MonitorEvent::StatsUpdated);

        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribed_callbacks_stop_receiving() {
        let subscribers = Subscribers::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let id = subscribers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscribers.notify(&MonitorEvent::StatsUpdated);
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.notify(&MonitorEvent::StatsUpdated);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(subscribers.is_empty());
    }

    #[test]
    fn panicking_callback_does_not_block_later_subscribers() {
        let subscribers = Subscribers::new();
        let hits = Arc::new(AtomicU64::new(0));
        subscribers.subscribe(|_| panic!("redraw failed"));
        let counter = Arc::clone(&hits);
        subscribers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscribers.notify(&MonitorEvent::StatsUpdated);
        subscribers.notify(&MonitorEvent::StatusChanged(HealthStatus::Poor));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(subscribers.len(), 2);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let subscribers = Arc::new(Subscribers::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let registry = Arc::clone(&subscribers);
        let own_id = Arc::clone(&slot);
        let id = subscribers.subscribe(move |_| {
            if let Some(id) = *own_id.lock() {
                registry.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        subscribers.notify(&MonitorEvent::StatusChanged(HealthStatus::Healthy));
        assert!(subscribers.is_empty());
    }

    #[test]
    fn subscribing_from_other_threads_is_safe() {
        let subscribers = Arc::new(Subscribers::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let subscribers = Arc::clone(&subscribers);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let id = subscribers.subscribe(|_| {});
                        subscribers.notify(&MonitorEvent::StatsUpdated);
                        subscribers.unsubscribe(id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(subscribers.is_empty());
    }
}
