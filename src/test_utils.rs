//! Shared mocks for unit tests.
//!
//! All mocks record their interactions through cheaply cloneable handles so
//! tests can assert on call counts and payloads after the fact.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::SessionConfig;
use crate::error::{NodeError, Result};
use crate::link::driver::BackupRadio;
use crate::sampling::{SensorReadings, SensorSource};
use crate::session::{PublishSession, SessionFactory};

// ---------------------------------------------------------------------------
// Backup radio
// ---------------------------------------------------------------------------

/// Calls observed by [`RecordingRadio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCall {
    Start,
    Stop,
}

/// Backup radio that records every command and always succeeds.
pub struct RecordingRadio {
    calls: Arc<Mutex<Vec<RadioCall>>>,
}

impl RecordingRadio {
    pub fn new() -> Self {
        Self { calls: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Handle for inspecting recorded calls.
    pub fn calls(&self) -> Arc<Mutex<Vec<RadioCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl BackupRadio for RecordingRadio {
    async fn start_association(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(RadioCall::Start);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(RadioCall::Stop);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Publish transport
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StatsInner {
    connects: AtomicUsize,
    reconnects: AtomicUsize,
    closes: AtomicUsize,
    publishes: Mutex<Vec<(String, Vec<u8>)>>,
    last_endpoint: Mutex<Option<String>>,
}

/// Observation handle shared between a [`MockTransport`] and its tests.
#[derive(Clone, Default)]
pub struct TransportStats {
    inner: Arc<StatsInner>,
}

impl TransportStats {
    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn reconnects(&self) -> usize {
        self.inner.reconnects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn publishes(&self) -> Vec<(String, Vec<u8>)> {
        self.inner.publishes.lock().unwrap().clone()
    }

    pub fn last_endpoint(&self) -> Option<String> {
        self.inner.last_endpoint.lock().unwrap().clone()
    }
}

/// Session factory whose sessions share one connectivity flag, so tests can
/// flip the transport "down" from outside.
pub struct MockTransport {
    stats: TransportStats,
    connected: Arc<AtomicBool>,
    fail_auth: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            stats: TransportStats::default(),
            connected: Arc::new(AtomicBool::new(false)),
            fail_auth: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stats(&self) -> TransportStats {
        self.stats.clone()
    }

    /// Shared connectivity flag; storing `false` simulates a mid-session
    /// transport drop.
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// Make subsequent connect attempts fail with `AuthFailure`.
    pub fn fail_auth(&self, fail: bool) {
        self.fail_auth.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SessionFactory for MockTransport {
    async fn connect(&self, config: &SessionConfig) -> Result<Box<dyn PublishSession>> {
        self.stats.inner.connects.fetch_add(1, Ordering::SeqCst);
        *self.stats.inner.last_endpoint.lock().unwrap() = Some(config.endpoint_uri.clone());

        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(NodeError::auth_failure("mock credential rejection"));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            stats: self.stats.clone(),
            connected: Arc::clone(&self.connected),
        }))
    }
}

struct MockSession {
    stats: TransportStats,
    connected: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl PublishSession for MockSession {
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(NodeError::transport("mock connection dropped"));
        }
        self.stats
            .inner
            .publishes
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.stats.inner.reconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.stats.inner.closes.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Sensor source
// ---------------------------------------------------------------------------

/// Sensor that serves a scripted sequence of readings, then parks forever.
pub struct ScriptedSensor {
    readings: VecDeque<SensorReadings>,
}

impl ScriptedSensor {
    pub fn new(readings: impl IntoIterator<Item = SensorReadings>) -> Self {
        Self { readings: readings.into_iter().collect() }
    }
}

#[async_trait::async_trait]
impl SensorSource for ScriptedSensor {
    async fn sample(&mut self) -> Result<SensorReadings> {
        match self.readings.pop_front() {
            Some(readings) => Ok(readings),
            // Script exhausted: block so the sampling loop stays idle
            // instead of spinning.
            None => std::future::pending().await,
        }
    }
}
