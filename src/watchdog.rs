//! Task liveness registry.
//!
//! Both execution contexts feed a named handle on every loop iteration. The
//! monitor task only reports staleness; acting on it (process restart) is
//! the supervisor's job, outside this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Registry of tasks that must prove liveness.
#[derive(Clone)]
pub struct Watchdog {
    feeds: Arc<Mutex<HashMap<&'static str, Instant>>>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self { feeds: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Register a task under `name`. Registration counts as a first feed.
    pub fn register(&self, name: &'static str) -> WatchdogHandle {
        self.feeds.lock().expect("watchdog lock poisoned").insert(name, Instant::now());
        debug!("task '{name}' registered with watchdog");
        WatchdogHandle { name, feeds: Arc::clone(&self.feeds) }
    }

    /// Names of registered tasks whose last feed is older than `timeout`.
    pub fn stale(&self, timeout: Duration) -> Vec<&'static str> {
        let now = Instant::now();
        self.feeds
            .lock()
            .expect("watchdog lock poisoned")
            .iter()
            .filter(|(_, last)| now.duration_since(**last) > timeout)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Spawn a monitor that logs stale tasks until cancelled.
    pub fn spawn_monitor(
        &self,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let watchdog = self.clone();
        tokio::spawn(async move {
            info!("watchdog monitor started (timeout {timeout:?})");
            let mut ticks = tokio::time::interval(timeout / 2);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {}
                }
                for name in watchdog.stale(timeout) {
                    error!("task '{name}' has not proven liveness within {timeout:?}");
                }
            }
            info!("watchdog monitor stopped");
        })
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-task feeding handle.
#[derive(Clone)]
pub struct WatchdogHandle {
    name: &'static str,
    feeds: Arc<Mutex<HashMap<&'static str, Instant>>>,
}

impl WatchdogHandle {
    /// Record that the owning task is alive.
    pub fn feed(&self) {
        self.feeds
            .lock()
            .expect("watchdog lock poisoned")
            .insert(self.name, Instant::now());
    }
}
