//! Link arbitration and telemetry delivery core for dual-uplink sensor nodes.
//!
//! Fieldnode is the stateful heart of a field sensor's firmware: it decides
//! which uplink owns the default route, carries measurements across a bounded
//! queue from the sampling context to the delivery context, and keeps one
//! secure publish session alive across link flips and mid-flight endpoint
//! reconfiguration.
//!
//! # Architecture
//!
//! - **Telemetry queue**: bounded FIFO, the only boundary between the
//!   sampling and delivery contexts. Full means explicit backpressure, never
//!   silent overwrite.
//! - **Link arbitration**: a state machine fed by a serialized event channel.
//!   The wired primary always preempts the wireless backup, even
//!   mid-association.
//! - **Session manager**: at most one live publish session, rebuilt on
//!   config change, reconnected on transport drop, left absent after an
//!   authentication failure until config or link conditions change.
//! - **Delivery loop**: fixed-period poll that publishes each dequeued
//!   sample or drops it with a reason. Telemetry is lossy-tolerant by
//!   design; stale samples are never retried.
//!
//! The platform supplies three capabilities behind traits: the sensor
//! ([`sampling::SensorSource`]), the backup radio
//! ([`link::driver::BackupRadio`]), and the secure transport
//! ([`session::SessionFactory`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldnode::{LinkEvent, Node, NodeConfig};
//! use fieldnode::sampling::{SensorReadings, SensorSource};
//! use fieldnode::link::driver::BackupRadio;
//! use fieldnode::session::{PublishSession, SessionFactory};
//!
//! struct Bme280;
//!
//! #[async_trait::async_trait]
//! impl SensorSource for Bme280 {
//!     async fn sample(&mut self) -> fieldnode::Result<SensorReadings> {
//!         unimplemented!("read the I2C sensor here")
//!     }
//! }
//!
//! struct Radio;
//!
//! #[async_trait::async_trait]
//! impl BackupRadio for Radio {
//!     async fn start_association(&mut self) -> fieldnode::Result<()> {
//!         unimplemented!("associate with the backup network")
//!     }
//!     async fn stop(&mut self) -> fieldnode::Result<()> {
//!         unimplemented!("tear the backup link down")
//!     }
//! }
//!
//! struct Tls;
//!
//! #[async_trait::async_trait]
//! impl SessionFactory for Tls {
//!     async fn connect(
//!         &self,
//!         config: &fieldnode::SessionConfig,
//!     ) -> fieldnode::Result<Box<dyn PublishSession>> {
//!         unimplemented!("authenticated MQTT-over-TLS connect")
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> fieldnode::Result<()> {
//!     let config = NodeConfig::from_yaml_file("/etc/fieldnode.yaml")?;
//!     let node = Node::start(config, Bme280, Radio, Arc::new(Tls)).await?;
//!
//!     // Feed link notifications from the platform's network stack.
//!     node.link_events().send(LinkEvent::EthernetUp).await.ok();
//!
//!     node.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
pub mod types;

// Pipeline modules
pub mod config;
pub mod delivery;
pub mod link;
pub mod queue;
pub mod sampling;
pub mod session;
pub mod watchdog;

// External interface surface
pub mod dns;

// Wiring
mod node;

#[cfg(test)]
pub mod test_utils;

// Core exports
pub use config::{ConfigStore, Credential, NodeConfig, PortalConfig, SessionConfig};
pub use error::{NodeError, Result};
pub use node::{Node, NodeHandle};
pub use types::{LinkEvent, LinkState, Sample, SampleKind};
