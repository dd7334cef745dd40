//! Link driver: serializes link events into the arbitration machine.
//!
//! Network stacks report link changes from their own callback contexts.
//! Those callbacks must never mutate arbitration state directly; they send a
//! [`LinkEvent`] into a bounded channel instead, and the driver task applies
//! events to the [`LinkMonitor`] one at a time, in arrival order.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::link::{BackupCommand, LinkMonitor};
use crate::types::{LinkEvent, LinkState};

/// Capacity of the link-event channel. Link flaps are rare and the consumer
/// is fast; a small bound keeps memory fixed while preserving event order.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Control surface for the backup wireless uplink.
///
/// The driver calls this when arbitration decides the backup should start
/// associating or tear down. Implementations wrap the platform radio; errors
/// are logged and retried on the next qualifying event, never escalated.
#[async_trait::async_trait]
pub trait BackupRadio: Send + 'static {
    /// Begin associating with the backup network.
    async fn start_association(&mut self) -> Result<()>;

    /// Disassociate and power the backup path down.
    async fn stop(&mut self) -> Result<()>;
}

/// Channels returned by [`LinkDriver::spawn`].
pub struct LinkChannels {
    /// Sender for link notifications from the network stack.
    pub events: mpsc::Sender<LinkEvent>,
    /// Receiver tracking the current arbitration state.
    pub state: watch::Receiver<LinkState>,
}

/// Spawns and manages the link arbitration task.
pub struct LinkDriver;

impl LinkDriver {
    /// Spawn the arbitration task.
    ///
    /// `backoff` is the fixed delay between a backup disassociation and the
    /// next association attempt. The task exits when `cancel` fires or every
    /// event sender is dropped.
    pub fn spawn<R>(
        radio: R,
        backoff: Duration,
        cancel: CancellationToken,
    ) -> (LinkChannels, tokio::task::JoinHandle<()>)
    where
        R: BackupRadio,
    {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(LinkState::EthernetDownWifiConnecting);

        let handle = tokio::spawn(async move {
            Self::event_task(radio, backoff, event_rx, state_tx, cancel).await;
        });

        (LinkChannels { events: event_tx, state: state_rx }, handle)
    }

    async fn event_task<R>(
        mut radio: R,
        backoff: Duration,
        mut events: mpsc::Receiver<LinkEvent>,
        state_tx: watch::Sender<LinkState>,
        cancel: CancellationToken,
    ) where
        R: BackupRadio,
    {
        info!("link driver started");
        let mut monitor = LinkMonitor::new();
        // Pending backup re-association deadline, if one is scheduled.
        let mut retry_at: Option<Instant> = None;

        loop {
            let command = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("link driver cancelled");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("all link event senders dropped, shutting down");
                        break;
                    };
                    debug!(?event, "link event");
                    let command = monitor.on_link_event(event);
                    state_tx.send_replace(monitor.state());
                    command
                }
                _ = sleep_until_deadline(retry_at), if retry_at.is_some() => {
                    retry_at = None;
                    if monitor.backup_enabled() {
                        info!("retrying backup association");
                        Some(BackupCommand::StartAssociation)
                    } else {
                        None
                    }
                }
            };

            match command {
                Some(BackupCommand::StartAssociation) => {
                    if let Err(e) = radio.start_association().await {
                        warn!("backup association failed: {e}");
                        retry_at = Some(Instant::now() + backoff);
                    }
                }
                Some(BackupCommand::Stop) => {
                    // Primary preemption cancels any pending retry.
                    retry_at = None;
                    if let Err(e) = radio.stop().await {
                        warn!("backup teardown failed: {e}");
                    }
                }
                Some(BackupCommand::RetryAssociation) => {
                    retry_at = Some(Instant::now() + backoff);
                }
                None => {}
            }
        }

        info!("link driver stopped");
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        // Guarded out by the `if retry_at.is_some()` select precondition.
        None => std::future::pending().await,
    }
}
