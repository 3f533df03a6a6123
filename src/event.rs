use std::fmt;

use serde::Serialize;

use crate::network::types::{ClientStatus, HotspotStatus, Peer};

/// Normalized events produced from raw service notifications.
///
/// The vocabulary is closed: every variant is listed in [`NormalizedEvent::ALL`]
/// and can be used as a registration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalizedEvent {
    // Client link
    ClientDisabled,
    ClientInactive,
    ClientScanning,
    ClientConnecting,
    ClientConnected,
    ClientDisconnected,

    // Access point lifecycle
    HotspotStarting,
    HotspotStarted,
    HotspotStopping,
    HotspotStopped,
    HotspotFailed,

    // DHCP peers
    LeaseUp,
    LeaseAdded,
    LeaseUpdated,
    LeaseDeleted,
    PeerConnected,
    PeerReconnected,
    PeerDisconnected,
}

impl NormalizedEvent {
    pub const ALL: [NormalizedEvent; 18] = [
        Self::ClientDisabled,
        Self::ClientInactive,
        Self::ClientScanning,
        Self::ClientConnecting,
        Self::ClientConnected,
        Self::ClientDisconnected,
        Self::HotspotStarting,
        Self::HotspotStarted,
        Self::HotspotStopping,
        Self::HotspotStopped,
        Self::HotspotFailed,
        Self::LeaseUp,
        Self::LeaseAdded,
        Self::LeaseUpdated,
        Self::LeaseDeleted,
        Self::PeerConnected,
        Self::PeerReconnected,
        Self::PeerDisconnected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientDisabled => "CLIENT_DISABLED",
            Self::ClientInactive => "CLIENT_INACTIVE",
            Self::ClientScanning => "CLIENT_SCANNING",
            Self::ClientConnecting => "CLIENT_CONNECTING",
            Self::ClientConnected => "CLIENT_CONNECTED",
            Self::ClientDisconnected => "CLIENT_DISCONNECTED",
            Self::HotspotStarting => "HOTSPOT_STARTING",
            Self::HotspotStarted => "HOTSPOT_STARTED",
            Self::HotspotStopping => "HOTSPOT_STOPPING",
            Self::HotspotStopped => "HOTSPOT_STOPPED",
            Self::HotspotFailed => "HOTSPOT_FAILED",
            Self::LeaseUp => "LEASE_UP",
            Self::LeaseAdded => "LEASE_ADDED",
            Self::LeaseUpdated => "LEASE_UPDATED",
            Self::LeaseDeleted => "LEASE_DELETED",
            Self::PeerConnected => "PEER_CONNECTED",
            Self::PeerReconnected => "PEER_RECONNECTED",
            Self::PeerDisconnected => "PEER_DISCONNECTED",
        }
    }

    /// Parse a stable event name, e.g. `CLIENT_CONNECTED`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data delivered alongside a normalized event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    #[default]
    None,
    Client(ClientStatus),
    Hotspot(HotspotStatus),
    Peer(Peer),
}

impl Payload {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Raw notification as delivered by the service bus, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusSignal {
    /// Supplicant interface property change; `state` is the raw `State` value
    ClientProperties { state: Option<String> },
    /// Access point unit property change
    UnitProperties {
        active_state: Option<String>,
        sub_state: Option<String>,
    },
    /// Lease manager broadcast; `fields` are the body fields in wire order
    Lease { member: String, fields: Vec<String> },
}
