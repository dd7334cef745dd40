//! Delivery loop: drains the telemetry queue into the publish session.
//!
//! Single control loop with a fixed polling period. Every dequeued sample is
//! either published or explicitly dropped within the same iteration; the
//! loop never blocks the sampling side and never accumulates state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::error::NodeError;
use crate::queue::SampleConsumer;
use crate::session::{SessionManager, SessionState};
use crate::types::{LinkState, Sample};
use crate::watchdog::WatchdogHandle;

/// The delivery execution context.
pub struct DeliveryLoop {
    consumer: SampleConsumer,
    link: watch::Receiver<LinkState>,
    sessions: SessionManager,
    config: Arc<ConfigStore>,
    node_id: String,
    poll_period: Duration,
    cancel: CancellationToken,
    watchdog: WatchdogHandle,
}

impl DeliveryLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        consumer: SampleConsumer,
        link: watch::Receiver<LinkState>,
        sessions: SessionManager,
        config: Arc<ConfigStore>,
        node_id: String,
        poll_period: Duration,
        cancel: CancellationToken,
        watchdog: WatchdogHandle,
    ) -> Self {
        Self { consumer, link, sessions, config, node_id, poll_period, cancel, watchdog }
    }

    /// Run until cancelled.
    ///
    /// Each iteration: feed the watchdog; call `ensure_session` when the
    /// config is dirty, when the link just became ready, or when a live
    /// session lost its transport while the link stayed up. The rising edge
    /// is the retry gate for sessions left absent after an auth failure; a
    /// mid-session transport drop goes through the reconnect path without
    /// waiting for a link change. Then dequeue with the polling period as
    /// the bound and publish the sample or drop it with the reason.
    pub async fn run(mut self) {
        info!("delivery loop started (poll period {:?})", self.poll_period);
        let mut was_ready = false;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            self.watchdog.feed();

            let ready = self.link.borrow().is_ready();
            let dropped = self.sessions.state() == SessionState::Disconnected;
            if self.config.is_dirty() || (ready && !was_ready) || (ready && dropped) {
                self.sessions.ensure_session().await;
            }
            was_ready = ready;

            let sample = tokio::select! {
                _ = self.cancel.cancelled() => break,
                sample = self.consumer.dequeue(self.poll_period) => sample,
            };
            let Some(sample) = sample else {
                continue;
            };

            // Readiness may have changed during the dequeue wait.
            if !self.link.borrow().is_ready() {
                warn!(
                    "dropping {} sample {}: link not ready",
                    sample.kind,
                    sample.payload()
                );
                continue;
            }
            if !self.sessions.is_connected() {
                warn!(
                    "dropping {} sample {}: session not ready",
                    sample.kind,
                    sample.payload()
                );
                continue;
            }

            self.publish(sample).await;
        }

        self.sessions.shutdown().await;
        info!("delivery loop stopped");
    }

    async fn publish(&mut self, sample: Sample) {
        let topic = format!("/sensor_{}/{}", self.node_id, sample.kind);
        let payload = sample.payload();
        match self.sessions.publish(&topic, payload.as_bytes()).await {
            Ok(()) => debug!("published {payload} to {topic}"),
            Err(NodeError::NotReady { reason }) => {
                warn!("dropping {} sample {payload}: {reason}", sample.kind);
            }
            Err(e) => {
                // Mid-session transport failure; the sample is lost and the
                // reconnect path picks the session up on a later iteration.
                warn!("publish to {topic} failed: {e}");
            }
        }
    }
}
