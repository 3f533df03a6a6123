//! Translation of raw bus signals into normalized `(event, payload)` pairs.
//!
//! Signals are handled strictly one at a time by the daemon loop, so the
//! dedup state below needs no locking.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::control::{current_mode, Mode};
use crate::event::{BusSignal, NormalizedEvent, Payload};
use crate::monitor::vocabulary::{SnapshotTiming, Vocabulary};
use crate::network::facade::{AccessPoint, ClientLink};
use crate::network::types::{ClientStatus, HotspotStatus, Peer};

/// Status reads are attempted this many times before the event is delivered
/// without a payload
const STATUS_ATTEMPTS: usize = 2;

pub struct Normalizer {
    vocabulary: Vocabulary,
    client: Arc<dyn ClientLink>,
    hotspot: Arc<dyn AccessPoint>,
    last_hotspot_event: Option<NormalizedEvent>,
    last_client_status: Option<ClientStatus>,
}

impl Normalizer {
    pub fn new(
        vocabulary: Vocabulary,
        client: Arc<dyn ClientLink>,
        hotspot: Arc<dyn AccessPoint>,
    ) -> Self {
        Self {
            vocabulary,
            client,
            hotspot,
            last_hotspot_event: None,
            last_client_status: None,
        }
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    /// Capture the client snapshot delivered with the first legacy transition
    pub async fn prime(&mut self) {
        if self.vocabulary.snapshot_timing() == SnapshotTiming::Before {
            self.last_client_status = self.fetch_client_status().await;
        }
    }

    /// Returns `None` when the signal is not a state change, is unmapped, is a
    /// repeat of the previous hotspot event, or is a lease outside hotspot mode.
    pub async fn normalize(&mut self, signal: BusSignal) -> Option<(NormalizedEvent, Payload)> {
        match signal {
            BusSignal::ClientProperties { state } => self.client_changed(state?).await,
            BusSignal::UnitProperties {
                active_state,
                sub_state,
            } => {
                self.hotspot_changed(&active_state?, sub_state.as_deref().unwrap_or(""))
                    .await
            }
            BusSignal::Lease { member, fields } => self.lease_changed(&member, fields).await,
        }
    }

    async fn client_changed(&mut self, raw: String) -> Option<(NormalizedEvent, Payload)> {
        let Some(event) = self.vocabulary.client_event(&raw) else {
            error!("Unmapped client state: {}", raw);
            return None;
        };

        let payload = match self.vocabulary.snapshot_timing() {
            SnapshotTiming::Before => {
                let previous = self.last_client_status.take();
                self.last_client_status = self.fetch_client_status().await;
                previous.map(Payload::Client).unwrap_or_default()
            }
            SnapshotTiming::After => self
                .fetch_client_status()
                .await
                .map(Payload::Client)
                .unwrap_or_default(),
        };

        Some((event, payload))
    }

    async fn hotspot_changed(
        &mut self,
        active_state: &str,
        sub_state: &str,
    ) -> Option<(NormalizedEvent, Payload)> {
        let Some(event) = self.vocabulary.hotspot_event(active_state, sub_state) else {
            error!("Unmapped hotspot state: {} ({})", active_state, sub_state);
            return None;
        };

        if self.last_hotspot_event == Some(event) {
            debug!("Suppressed repeated {}", event);
            return None;
        }
        self.last_hotspot_event = Some(event);

        let payload = self
            .fetch_hotspot_status()
            .await
            .map(Payload::Hotspot)
            .unwrap_or_default();
        Some((event, payload))
    }

    async fn lease_changed(
        &mut self,
        member: &str,
        fields: Vec<String>,
    ) -> Option<(NormalizedEvent, Payload)> {
        // The lease manager may keep running outside hotspot mode
        if current_mode(self.client.as_ref(), self.hotspot.as_ref()).await != Mode::Hotspot {
            trace!("Ignoring {} outside hotspot mode", member);
            return None;
        }

        let Some(event) = self.vocabulary.lease_event(member) else {
            error!("Unmapped lease signal: {}", member);
            return None;
        };

        Some((event, peer_payload(fields)))
    }

    async fn fetch_client_status(&self) -> Option<ClientStatus> {
        for attempt in 1..=STATUS_ATTEMPTS {
            match self.client.status().await {
                Ok(status) => return Some(status),
                Err(e) => warn!(attempt, "Client status unavailable: {}", e),
            }
        }
        None
    }

    async fn fetch_hotspot_status(&self) -> Option<HotspotStatus> {
        for attempt in 1..=STATUS_ATTEMPTS {
            match self.hotspot.status().await {
                Ok(status) => return Some(status),
                Err(e) => warn!(attempt, "Hotspot status unavailable: {}", e),
            }
        }
        None
    }
}

/// Lease signals carry `(ip, mac, hostname)` after the member name
fn peer_payload(fields: Vec<String>) -> Payload {
    match <[String; 3]>::try_from(fields) {
        Ok([ip, mac, name]) => Payload::Peer(Peer { name, ip, mac }),
        Err(fields) => {
            debug!("Lease signal with {} fields, no peer payload", fields.len());
            Payload::None
        }
    }
}
