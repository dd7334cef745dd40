//! Bounded FIFO telemetry queue.
//!
//! The queue is the single thread-safe boundary between the sampling context
//! and the delivery context. Capacity is fixed at startup; a full queue never
//! silently overwrites: the producer either waits out a bound and gets
//! [`NodeError::QueueFull`], or uses the zero-wait path.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

use crate::error::{NodeError, Result};
use crate::types::Sample;

/// Create a bounded telemetry queue with the given capacity.
///
/// `enqueue_wait` bounds how long [`SampleProducer::enqueue`] blocks on a
/// full queue before failing with `QueueFull`.
pub fn telemetry_queue(capacity: usize, enqueue_wait: Duration) -> (SampleProducer, SampleConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    (SampleProducer { tx, enqueue_wait }, SampleConsumer { rx })
}

/// Producer half of the telemetry queue. Cheap to clone.
#[derive(Clone)]
pub struct SampleProducer {
    tx: mpsc::Sender<Sample>,
    enqueue_wait: Duration,
}

impl SampleProducer {
    /// Insert a sample at the back, waiting up to the configured bound for
    /// space to free.
    pub async fn enqueue(&self, sample: Sample) -> Result<()> {
        match self.tx.send_timeout(sample, self.enqueue_wait).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                Err(NodeError::QueueFull { waited: self.enqueue_wait })
            }
            Err(SendTimeoutError::Closed(_)) => Err(NodeError::QueueClosed),
        }
    }

    /// Insert a sample without waiting; fails immediately if full.
    pub fn try_enqueue(&self, sample: Sample) -> Result<()> {
        match self.tx.try_send(sample) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NodeError::QueueFull { waited: Duration::ZERO }),
            Err(TrySendError::Closed(_)) => Err(NodeError::QueueClosed),
        }
    }
}

/// Consumer half of the telemetry queue. Single owner.
pub struct SampleConsumer {
    rx: mpsc::Receiver<Sample>,
}

impl SampleConsumer {
    /// Remove the sample at the front, waiting up to `timeout`.
    ///
    /// Returns `None` when nothing arrived within the bound or the producer
    /// side is gone and the queue is drained; idle, not an error.
    pub async fn dequeue(&mut self, timeout: Duration) -> Option<Sample> {
        tokio::time::timeout(timeout, self.rx.recv()).await.ok().flatten()
    }

    /// Number of samples currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True when no samples are queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
