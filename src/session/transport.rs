//! Transport seam for the secure publish session.
//!
//! The network/TLS stack is a capability the session manager calls, not
//! something this crate implements. A platform integration provides a
//! [`SessionFactory`]; the manager owns the [`PublishSession`] objects it
//! hands back.

use crate::config::SessionConfig;
use crate::error::Result;

/// One live authenticated publish connection.
#[async_trait::async_trait]
pub trait PublishSession: Send + 'static {
    /// Hand one message to the transport.
    ///
    /// Acceptance is not a delivery guarantee; publishing is fire-and-forget
    /// at this layer. A `Transport` error means the connection dropped and
    /// the session should now report disconnected.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Whether the transport currently reports the connection as live.
    fn is_connected(&self) -> bool;

    /// Ask the transport to re-establish a dropped connection.
    async fn reconnect(&mut self) -> Result<()>;

    /// Release all transport and credential resources. Must be called (and
    /// awaited) before a replacement session is created.
    async fn close(&mut self);
}

/// Builds publish sessions from a [`SessionConfig`].
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// Authenticate `client_identity` against `trust_anchor` and connect to
    /// `endpoint_uri`.
    ///
    /// Returns `AuthFailure` when the endpoint rejects the credentials and
    /// `Transport` for connectivity problems. The caller bounds this with a
    /// connect timeout.
    async fn connect(&self, config: &SessionConfig) -> Result<Box<dyn PublishSession>>;
}
