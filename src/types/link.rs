//! Link arbitration state and events.

/// Which uplink currently owns the default route.
///
/// Exactly one uplink is authoritative at any time, and the wired primary
/// always supersedes the wireless backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Primary wired uplink has a usable address.
    EthernetUp,
    /// Primary is down; backup association is in progress or not yet
    /// started (the boot state before any link has an address).
    EthernetDownWifiConnecting,
    /// Primary is down; backup has acquired an address.
    EthernetDownWifiUp,
}

impl LinkState {
    /// True iff some uplink has a usable address.
    pub fn is_ready(&self) -> bool {
        matches!(self, LinkState::EthernetUp | LinkState::EthernetDownWifiUp)
    }
}

/// Asynchronous link notifications from the network stack.
///
/// Delivered through a bounded channel and consumed by the link driver so
/// that state mutation stays serialized and in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Primary wired link connected and acquired an address.
    EthernetUp,
    /// Primary wired link lost.
    EthernetDown,
    /// Backup wireless link acquired an address.
    WifiAddressAcquired,
    /// Backup wireless link disassociated.
    WifiDisconnected,
}
