//! Link arbitration between the wired primary and wireless backup uplink.
//!
//! [`LinkMonitor`] is the pure state machine: [`LinkMonitor::on_link_event`]
//! is its only mutator and returns the backup-radio side effect for the
//! caller to apply. [`driver::LinkDriver`] wraps it in a task that serializes
//! events from a bounded channel and fans the current state out on a watch
//! channel.

pub mod driver;

use tracing::{debug, info};

use crate::types::{LinkEvent, LinkState};

/// Side effect the arbitration machine requests of the backup radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupCommand {
    /// Begin (or resume) associating with the backup network.
    StartAssociation,
    /// Tear the backup link down; the primary owns the route again.
    Stop,
    /// Re-associate after the fixed backoff delay.
    RetryAssociation,
}

/// Tracks which uplink owns the default route.
///
/// The primary wired link always preempts the backup: an `EthernetUp` event
/// wins from any state, disabling the backup even mid-association.
#[derive(Debug)]
pub struct LinkMonitor {
    state: LinkState,
    backup_enabled: bool,
}

impl LinkMonitor {
    /// Boot state: no link has an address yet, backup not enabled.
    pub fn new() -> Self {
        Self { state: LinkState::EthernetDownWifiConnecting, backup_enabled: false }
    }

    /// Current arbitration state. Side effect free.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// True iff some uplink has a usable address. Side effect free.
    pub fn current_uplink_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Whether the backup radio is currently meant to be associating.
    pub fn backup_enabled(&self) -> bool {
        self.backup_enabled
    }

    /// Apply one link event. The single legal mutation path; callers must
    /// serialize invocations (the link driver does this via its channel).
    pub fn on_link_event(&mut self, event: LinkEvent) -> Option<BackupCommand> {
        match event {
            LinkEvent::EthernetUp => {
                info!("primary uplink acquired address");
                self.state = LinkState::EthernetUp;
                if self.backup_enabled {
                    info!("primary available, disabling backup uplink");
                    self.backup_enabled = false;
                    Some(BackupCommand::Stop)
                } else {
                    None
                }
            }
            LinkEvent::EthernetDown => {
                info!("primary uplink lost, activating backup");
                self.state = LinkState::EthernetDownWifiConnecting;
                if !self.backup_enabled {
                    self.backup_enabled = true;
                    Some(BackupCommand::StartAssociation)
                } else {
                    None
                }
            }
            LinkEvent::WifiAddressAcquired => {
                if self.state == LinkState::EthernetUp {
                    // Primary owns the route; a late backup address is moot.
                    debug!("backup acquired address while primary is up, ignoring");
                    None
                } else {
                    info!("backup uplink acquired address");
                    self.state = LinkState::EthernetDownWifiUp;
                    None
                }
            }
            LinkEvent::WifiDisconnected => {
                if self.backup_enabled {
                    debug!("backup uplink disassociated, scheduling retry");
                    if self.state == LinkState::EthernetDownWifiUp {
                        self.state = LinkState::EthernetDownWifiConnecting;
                    }
                    Some(BackupCommand::RetryAssociation)
                } else {
                    None
                }
            }
        }
    }
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boot_state_is_not_ready() {
        let monitor = LinkMonitor::new();
        assert_eq!(monitor.state(), LinkState::EthernetDownWifiConnecting);
        assert!(!monitor.current_uplink_ready());
        assert!(!monitor.backup_enabled());
    }

    #[test]
    fn primary_up_makes_link_ready() {
        let mut monitor = LinkMonitor::new();
        assert_eq!(monitor.on_link_event(LinkEvent::EthernetUp), None);
        assert_eq!(monitor.state(), LinkState::EthernetUp);
        assert!(monitor.current_uplink_ready());
    }

    #[test]
    fn primary_loss_enables_backup() {
        let mut monitor = LinkMonitor::new();
        monitor.on_link_event(LinkEvent::EthernetUp);

        let cmd = monitor.on_link_event(LinkEvent::EthernetDown);
        assert_eq!(cmd, Some(BackupCommand::StartAssociation));
        assert_eq!(monitor.state(), LinkState::EthernetDownWifiConnecting);
        assert!(monitor.backup_enabled());
        assert!(!monitor.current_uplink_ready());
    }

    #[test]
    fn backup_address_brings_link_ready() {
        let mut monitor = LinkMonitor::new();
        monitor.on_link_event(LinkEvent::EthernetDown);
        monitor.on_link_event(LinkEvent::WifiAddressAcquired);
        assert_eq!(monitor.state(), LinkState::EthernetDownWifiUp);
        assert!(monitor.current_uplink_ready());
    }

    #[test]
    fn primary_preempts_backup_even_mid_association() {
        let mut monitor = LinkMonitor::new();
        monitor.on_link_event(LinkEvent::EthernetDown);
        assert!(monitor.backup_enabled());

        // Primary returns before the backup ever associates.
        let cmd = monitor.on_link_event(LinkEvent::EthernetUp);
        assert_eq!(cmd, Some(BackupCommand::Stop));
        assert_eq!(monitor.state(), LinkState::EthernetUp);
        assert!(!monitor.backup_enabled());
    }

    #[test]
    fn primary_preempts_established_backup() {
        let mut monitor = LinkMonitor::new();
        monitor.on_link_event(LinkEvent::EthernetDown);
        monitor.on_link_event(LinkEvent::WifiAddressAcquired);

        let cmd = monitor.on_link_event(LinkEvent::EthernetUp);
        assert_eq!(cmd, Some(BackupCommand::Stop));
        assert_eq!(monitor.state(), LinkState::EthernetUp);
    }

    #[test]
    fn backup_disconnect_schedules_retry_while_enabled() {
        let mut monitor = LinkMonitor::new();
        monitor.on_link_event(LinkEvent::EthernetDown);
        monitor.on_link_event(LinkEvent::WifiAddressAcquired);

        let cmd = monitor.on_link_event(LinkEvent::WifiDisconnected);
        assert_eq!(cmd, Some(BackupCommand::RetryAssociation));
        assert_eq!(monitor.state(), LinkState::EthernetDownWifiConnecting);
    }

    #[test]
    fn backup_disconnect_is_ignored_once_disabled() {
        let mut monitor = LinkMonitor::new();
        monitor.on_link_event(LinkEvent::EthernetDown);
        monitor.on_link_event(LinkEvent::EthernetUp);

        // The stop raced with a disassociation notification.
        assert_eq!(monitor.on_link_event(LinkEvent::WifiDisconnected), None);
        assert_eq!(monitor.state(), LinkState::EthernetUp);
    }

    #[test]
    fn late_backup_address_does_not_displace_primary() {
        let mut monitor = LinkMonitor::new();
        monitor.on_link_event(LinkEvent::EthernetDown);
        monitor.on_link_event(LinkEvent::EthernetUp);
        monitor.on_link_event(LinkEvent::WifiAddressAcquired);
        assert_eq!(monitor.state(), LinkState::EthernetUp);
    }

    proptest! {
        // For any event sequence, an EthernetUp event leaves the machine in
        // EthernetUp with the backup disabled, within that one event.
        #[test]
        fn primary_connected_always_wins(
            events in prop::collection::vec(0u8..4, 0..32)
        ) {
            let mut monitor = LinkMonitor::new();
            for code in events {
                let event = match code {
                    0 => LinkEvent::EthernetUp,
                    1 => LinkEvent::EthernetDown,
                    2 => LinkEvent::WifiAddressAcquired,
                    _ => LinkEvent::WifiDisconnected,
                };
                monitor.on_link_event(event);
                if event == LinkEvent::EthernetUp {
                    prop_assert_eq!(monitor.state(), LinkState::EthernetUp);
                }
                // Invariant: backup is disabled whenever the primary owns
                // the route.
                if monitor.state() == LinkState::EthernetUp {
                    prop_assert!(!monitor.backup_enabled());
                }
            }
        }
    }
}
