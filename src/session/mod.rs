//! Secure publish-session lifecycle.
//!
//! [`SessionManager`] keeps at most one live session matching the current
//! [`crate::config::ConfigStore`] contents: it rebuilds the session when the
//! config is dirty, reconnects it when the transport drops, and leaves it
//! absent after an authentication failure until a config change or link
//! recovery triggers the next attempt.

mod transport;

pub use transport::{PublishSession, SessionFactory};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{ConfigStore, SessionConfig};
use crate::error::{NodeError, Result};

/// Lifecycle of the managed session, made explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session object exists.
    Absent,
    /// A session exists and the transport reports it live.
    Connected,
    /// A session exists but the transport dropped; next `ensure_session`
    /// requests a reconnect.
    Disconnected,
}

/// Owns the lifecycle of one secure publish session.
///
/// Never holds two live sessions: a rebuild closes the old session and
/// releases its resources before the new connect starts.
pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    config: Arc<ConfigStore>,
    session: Option<Box<dyn PublishSession>>,
    connect_timeout: Duration,
}

impl SessionManager {
    /// Create a manager with no session.
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        config: Arc<ConfigStore>,
        connect_timeout: Duration,
    ) -> Self {
        Self { factory, config, session: None, connect_timeout }
    }

    /// Current session lifecycle state.
    pub fn state(&self) -> SessionState {
        match &self.session {
            None => SessionState::Absent,
            Some(s) if s.is_connected() => SessionState::Connected,
            Some(_) => SessionState::Disconnected,
        }
    }

    /// Whether a publish would currently be accepted.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Bring the session in line with the current configuration.
    ///
    /// - dirty config: close the existing session, rebuild from the new
    ///   config, clear the dirty flag;
    /// - no session: build one from the current config;
    /// - session disconnected: request a reconnect;
    /// - healthy session, clean config: no-op.
    ///
    /// Connect failures are absorbed here: the session is left absent (or
    /// disconnected, for a failed reconnect) and the next qualifying event
    /// retries. Every connect attempt is bounded by the connect timeout.
    pub async fn ensure_session(&mut self) {
        if self.config.is_dirty() {
            if let Some(mut old) = self.session.take() {
                info!("configuration changed, rebuilding publish session");
                old.close().await;
            }
            let config = self.config.acknowledge();
            self.connect(&config).await;
        } else if self.session.is_none() {
            let config = self.config.snapshot();
            self.connect(&config).await;
        } else if !self.is_connected() {
            self.reconnect().await;
        } else {
            debug!("session healthy, config clean, nothing to do");
        }
    }

    async fn connect(&mut self, config: &SessionConfig) {
        debug!("connecting publish session to {}", config.endpoint_uri);
        let attempt = tokio::time::timeout(self.connect_timeout, self.factory.connect(config));
        match attempt.await {
            Ok(Ok(session)) => {
                info!("publish session established to {}", config.endpoint_uri);
                self.session = Some(session);
            }
            Ok(Err(NodeError::AuthFailure { reason })) => {
                // Left absent on purpose: retrying bad credentials every
                // poll would hammer the endpoint. The next config change or
                // link recovery retries.
                warn!("publish session authentication failed: {reason}");
            }
            Ok(Err(e)) => {
                warn!("publish session connect failed: {e}");
            }
            Err(_) => {
                warn!(
                    "publish session connect timed out after {:?}",
                    self.connect_timeout
                );
            }
        }
    }

    async fn reconnect(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        debug!("requesting session reconnect");
        match tokio::time::timeout(self.connect_timeout, session.reconnect()).await {
            Ok(Ok(())) => info!("publish session reconnected"),
            Ok(Err(e)) => warn!("session reconnect failed: {e}"),
            Err(_) => warn!("session reconnect timed out after {:?}", self.connect_timeout),
        }
    }

    /// Hand one message to the live session.
    ///
    /// Fails with `NotReady` when no session exists or the session reports
    /// disconnected; the caller drops that sample and must not retry it.
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(NodeError::not_ready("no session"));
        };
        if !session.is_connected() {
            return Err(NodeError::not_ready("session disconnected"));
        }
        session.publish(topic, payload).await
    }

    /// Close any live session and release its resources.
    pub async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!("closing publish session");
            session.close().await;
        }
    }
}
