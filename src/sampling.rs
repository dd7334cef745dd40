//! Fixed-period sampling loop.
//!
//! Raw acquisition lives behind the [`SensorSource`] trait; this module owns
//! the cadence and the producer side of the telemetry queue. The sampling
//! context never blocks indefinitely: enqueueing waits out the queue's bound
//! and then drops the sample with a log line.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{NodeError, Result};
use crate::queue::SampleProducer;
use crate::types::{Sample, SampleKind};
use crate::watchdog::WatchdogHandle;

/// One set of environmental readings, taken together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    /// °C
    pub temperature: f64,
    /// hPa
    pub pressure: f64,
    /// %RH
    pub humidity: f64,
}

/// Source of environmental measurements (an I2C combo sensor in the field).
#[async_trait::async_trait]
pub trait SensorSource: Send + 'static {
    /// Take one reading of all measurement kinds.
    async fn sample(&mut self) -> Result<SensorReadings>;
}

/// The sampling execution context.
pub struct SamplingLoop<S> {
    source: S,
    producer: SampleProducer,
    period: Duration,
    cancel: CancellationToken,
    watchdog: WatchdogHandle,
}

impl<S: SensorSource> SamplingLoop<S> {
    pub fn new(
        source: S,
        producer: SampleProducer,
        period: Duration,
        cancel: CancellationToken,
        watchdog: WatchdogHandle,
    ) -> Self {
        Self { source, producer, period, cancel, watchdog }
    }

    /// Run until cancelled: every period, read the sensor and enqueue one
    /// sample per measurement kind.
    pub async fn run(mut self) {
        info!("sampling loop started (period {:?})", self.period);
        let mut ticks = tokio::time::interval(self.period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; skip the zeroth tick so the first
        // reading lands one full period after startup.
        ticks.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticks.tick() => {}
            }
            self.watchdog.feed();

            let readings = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.source.sample() => match result {
                    Ok(readings) => readings,
                    Err(e) => {
                        error!("sensor read failed: {e}");
                        continue;
                    }
                },
            };
            debug!(
                "sampled temperature={:.2} pressure={:.2} humidity={:.2}",
                readings.temperature, readings.pressure, readings.humidity
            );

            for sample in [
                Sample::new(readings.temperature, SampleKind::Temperature),
                Sample::new(readings.pressure, SampleKind::Pressure),
                Sample::new(readings.humidity, SampleKind::Humidity),
            ] {
                match self.producer.enqueue(sample).await {
                    Ok(()) => {}
                    Err(NodeError::QueueFull { waited }) => {
                        warn!(
                            "telemetry queue full for {waited:?}, dropping {} sample",
                            sample.kind
                        );
                    }
                    Err(NodeError::QueueClosed) => {
                        info!("telemetry queue closed, sampling loop exiting");
                        return;
                    }
                    Err(e) => warn!("enqueue failed: {e}"),
                }
            }
        }

        info!("sampling loop stopped");
    }
}
