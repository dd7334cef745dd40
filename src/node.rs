//! Node wiring: builds the pipeline and manages its lifetime.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ConfigStore, NodeConfig};
use crate::delivery::DeliveryLoop;
use crate::dns::CaptivePortalDns;
use crate::error::Result;
use crate::link::driver::{BackupRadio, LinkDriver};
use crate::queue::telemetry_queue;
use crate::sampling::{SamplingLoop, SensorSource};
use crate::session::{SessionFactory, SessionManager};
use crate::types::{LinkEvent, LinkState};
use crate::watchdog::Watchdog;

/// Liveness timeout for the watchdog monitor: several delivery polls and at
/// least one full sampling period.
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point assembling the delivery pipeline.
///
/// The platform supplies the three capabilities this core does not
/// implement: the sensor behind [`SensorSource`], the wireless radio behind
/// [`BackupRadio`], and the secure transport behind [`SessionFactory`].
pub struct Node;

impl Node {
    /// Start all tasks and return the running node's handle.
    ///
    /// Spawns the link driver, the sampling loop, the delivery loop, the
    /// watchdog monitor, and (when configured) the captive-portal DNS
    /// responder. Cold-start safe: nothing here assumes state survived a
    /// restart.
    pub async fn start<S, R>(
        config: NodeConfig,
        sensor: S,
        radio: R,
        factory: Arc<dyn SessionFactory>,
    ) -> Result<NodeHandle>
    where
        S: SensorSource,
        R: BackupRadio,
    {
        info!("starting node '{}'", config.node_id);
        let cancel = CancellationToken::new();
        let watchdog = Watchdog::new();
        let store = Arc::new(ConfigStore::new(config.session_config()));
        let mut tasks = Vec::new();

        let (producer, consumer) = telemetry_queue(
            config.queue_capacity,
            Duration::from_millis(config.enqueue_wait_ms),
        );

        let (link, link_task) = LinkDriver::spawn(
            radio,
            Duration::from_millis(config.backup_backoff_ms),
            cancel.clone(),
        );
        tasks.push(link_task);

        let sampling = SamplingLoop::new(
            sensor,
            producer,
            Duration::from_millis(config.sample_period_ms),
            cancel.clone(),
            watchdog.register("sampling"),
        );
        tasks.push(tokio::spawn(sampling.run()));

        let sessions = SessionManager::new(
            factory,
            Arc::clone(&store),
            Duration::from_millis(config.connect_timeout_ms),
        );
        let delivery = DeliveryLoop::new(
            consumer,
            link.state.clone(),
            sessions,
            Arc::clone(&store),
            config.node_id.clone(),
            Duration::from_millis(config.poll_period_ms),
            cancel.clone(),
            watchdog.register("delivery"),
        );
        tasks.push(tokio::spawn(delivery.run()));

        tasks.push(watchdog.spawn_monitor(WATCHDOG_TIMEOUT, cancel.clone()));

        if let Some(portal) = &config.portal {
            match CaptivePortalDns::bind(portal.dns_listen, portal.redirect, cancel.clone()).await
            {
                Ok(dns) => tasks.push(tokio::spawn(dns.run())),
                // The node still delivers telemetry without its portal.
                Err(e) => warn!("captive portal DNS failed to start: {e}"),
            }
        }

        Ok(NodeHandle {
            events: link.events,
            link: link.state,
            store,
            cancel,
            tasks,
        })
    }
}

/// Handle to a running node.
pub struct NodeHandle {
    events: mpsc::Sender<LinkEvent>,
    link: watch::Receiver<LinkState>,
    store: Arc<ConfigStore>,
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl NodeHandle {
    /// Sender the platform's network-event callbacks feed.
    pub fn link_events(&self) -> mpsc::Sender<LinkEvent> {
        self.events.clone()
    }

    /// Current link arbitration state.
    pub fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    /// Stream of link state changes, starting with the current state.
    pub fn link_updates(&self) -> impl Stream<Item = LinkState> + 'static {
        WatchStream::new(self.link.clone())
    }

    /// The mid-flight reconfiguration surface.
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Signal every task to exit its wait point and join them all.
    pub async fn shutdown(self) {
        info!("node shutting down");
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("task join failed during shutdown: {e}");
            }
        }
        info!("node stopped");
    }
}
