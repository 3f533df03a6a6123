//! Fixed lookup tables from raw service states to [`NormalizedEvent`]s.
//!
//! Two table versions exist. `Legacy` keys the access point on `ActiveState`
//! alone, reports peers as `PEER_*` and delivers the client snapshot taken
//! before a transition. `Current` keys the access point on
//! `(ActiveState, SubState)`, reports peers as `LEASE_*` and delivers the
//! snapshot taken after the transition.

use serde::Deserialize;

use crate::event::NormalizedEvent;
use crate::event::NormalizedEvent::*;

type Table<K> = &'static [(K, NormalizedEvent)];

const LEGACY_CLIENT: Table<&str> = &[
    ("interface_disabled", ClientDisabled),
    ("inactive", ClientInactive),
    ("scanning", ClientScanning),
    ("associating", ClientConnecting),
    ("completed", ClientConnected),
    ("disconnected", ClientDisconnected),
];

const CURRENT_CLIENT: Table<&str> = &[
    ("inactive", ClientInactive),
    ("scanning", ClientScanning),
    ("associating", ClientConnecting),
    ("completed", ClientConnected),
    ("disconnected", ClientDisconnected),
];

const LEGACY_HOTSPOT: Table<&str> = &[
    ("activating", HotspotStarting),
    ("active", HotspotStarted),
    ("deactivating", HotspotStopping),
    ("inactive", HotspotStopped),
    ("failed", HotspotFailed),
];

const CURRENT_HOTSPOT: Table<(&str, &str)> = &[
    (("activating", "start-pre"), HotspotStarting),
    (("activating", "start"), HotspotStarting),
    (("activating", "auto-restart"), HotspotStarting),
    (("active", "running"), HotspotStarted),
    (("deactivating", "stop"), HotspotStopping),
    (("deactivating", "stop-sigterm"), HotspotStopping),
    (("deactivating", "stop-post"), HotspotStopping),
    (("inactive", "dead"), HotspotStopped),
    (("failed", "failed"), HotspotFailed),
];

const LEGACY_LEASE: Table<&str> = &[
    ("DhcpLeaseAdded", PeerConnected),
    ("DhcpLeaseUpdated", PeerReconnected),
    ("DhcpLeaseDeleted", PeerDisconnected),
];

const CURRENT_LEASE: Table<&str> = &[
    ("DhcpLeaseUp", LeaseUp),
    ("DhcpLeaseAdded", LeaseAdded),
    ("DhcpLeaseUpdated", LeaseUpdated),
    ("DhcpLeaseDeleted", LeaseDeleted),
];

/// When the client status payload is captured relative to the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTiming {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    Legacy,
    #[default]
    Current,
}

impl Vocabulary {
    pub fn client_event(&self, raw: &str) -> Option<NormalizedEvent> {
        let table = match self {
            Self::Legacy => LEGACY_CLIENT,
            Self::Current => CURRENT_CLIENT,
        };
        lookup(table, &raw)
    }

    /// `sub_state` is ignored by the legacy table
    pub fn hotspot_event(&self, active_state: &str, sub_state: &str) -> Option<NormalizedEvent> {
        match self {
            Self::Legacy => lookup(LEGACY_HOTSPOT, &active_state),
            Self::Current => lookup(CURRENT_HOTSPOT, &(active_state, sub_state)),
        }
    }

    pub fn lease_event(&self, member: &str) -> Option<NormalizedEvent> {
        lookup(self.lease_table(), &member)
    }

    /// Lease manager signal names to subscribe to
    pub fn lease_members(&self) -> Vec<&'static str> {
        self.lease_table().iter().map(|(member, _)| *member).collect()
    }

    pub fn snapshot_timing(&self) -> SnapshotTiming {
        match self {
            Self::Legacy => SnapshotTiming::Before,
            Self::Current => SnapshotTiming::After,
        }
    }

    /// Every event this vocabulary can emit
    pub fn events(&self) -> Vec<NormalizedEvent> {
        let mut events: Vec<NormalizedEvent> = match self {
            Self::Legacy => LEGACY_CLIENT
                .iter()
                .chain(LEGACY_HOTSPOT)
                .chain(LEGACY_LEASE)
                .map(|(_, e)| *e)
                .collect(),
            Self::Current => CURRENT_CLIENT
                .iter()
                .map(|(_, e)| *e)
                .chain(CURRENT_HOTSPOT.iter().map(|(_, e)| *e))
                .chain(CURRENT_LEASE.iter().map(|(_, e)| *e))
                .collect(),
        };
        events.sort();
        events.dedup();
        events
    }

    fn lease_table(&self) -> Table<&'static str> {
        match self {
            Self::Legacy => LEGACY_LEASE,
            Self::Current => CURRENT_LEASE,
        }
    }
}

fn lookup<K: PartialEq>(table: &[(K, NormalizedEvent)], key: &K) -> Option<NormalizedEvent> {
    table.iter().find(|(k, _)| k == key).map(|(_, e)| *e)
}
