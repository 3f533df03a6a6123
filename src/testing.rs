//! In-memory service fakes shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::{MonitorError, MonitorResult, WifiError, WifiResult};
use crate::event::BusSignal;
use crate::monitor::source::SignalSource;
use crate::network::facade::{AccessPoint, ClientLink, Interface, ServiceControl};
use crate::network::types::{
    AddedNetwork, ClientStatus, HotspotStatus, NetworkParams, ScanResult,
};

// ── Client ────────────────────────────────────────────────────────────

#[derive(Default)]
struct ClientState {
    started: bool,
    state: String,
    known: Vec<String>,
    selected: Vec<String>,
    p2p_name: String,
    starts: usize,
    status_failures: usize,
    fail_start: bool,
    fail_p2p_write: bool,
}

pub struct FakeClient(Mutex<ClientState>);

impl FakeClient {
    pub fn new() -> Self {
        Self(Mutex::new(ClientState {
            state: "disconnected".into(),
            ..Default::default()
        }))
    }

    fn with<T>(&self, f: impl FnOnce(&mut ClientState) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }

    pub fn set_started(&self, started: bool) {
        self.with(|s| s.started = started);
    }

    pub fn is_started(&self) -> bool {
        self.with(|s| s.started)
    }

    pub fn set_state(&self, state: &str) {
        self.with(|s| s.state = state.to_string());
    }

    /// The next `n` status reads fail
    pub fn fail_status_reads(&self, n: usize) {
        self.with(|s| s.status_failures = n);
    }

    pub fn fail_start(&self, fail: bool) {
        self.with(|s| s.fail_start = fail);
    }

    pub fn fail_p2p_write(&self, fail: bool) {
        self.with(|s| s.fail_p2p_write = fail);
    }

    pub fn add_known(&self, ssid: &str) {
        self.with(|s| s.known.push(ssid.to_string()));
    }

    /// Successful starts and restarts
    pub fn starts(&self) -> usize {
        self.with(|s| s.starts)
    }

    /// Networks passed to `select_network`, in call order
    pub fn selected(&self) -> Vec<String> {
        self.with(|s| s.selected.clone())
    }
}

#[async_trait]
impl ServiceControl for FakeClient {
    async fn started(&self) -> bool {
        self.is_started()
    }

    async fn start(&self) -> WifiResult<()> {
        self.with(|s| {
            if s.fail_start {
                return Err(WifiError::Command("start client".into()));
            }
            s.started = true;
            s.starts += 1;
            Ok(())
        })
    }

    async fn stop(&self) -> WifiResult<()> {
        self.set_started(false);
        Ok(())
    }

    async fn restart(&self) -> WifiResult<()> {
        self.start().await
    }
}

#[async_trait]
impl ClientLink for FakeClient {
    async fn status(&self) -> WifiResult<ClientStatus> {
        self.with(|s| {
            if s.status_failures > 0 {
                s.status_failures -= 1;
                return Err(WifiError::Property("State".into()));
            }
            Ok(ClientStatus {
                state: s.state.clone(),
                ssid: s.selected.last().cloned(),
                ..Default::default()
            })
        })
    }

    /// The supplicant only exports its interface while running
    async fn interface_path(&self) -> WifiResult<String> {
        if !self.is_started() {
            return Err(WifiError::Command("GetInterface: client not running".into()));
        }
        Ok("/fi/w1/wpa_supplicant1/Interfaces/0".into())
    }

    async fn scan(&self) -> WifiResult<()> {
        Ok(())
    }

    async fn scan_results(&self) -> WifiResult<Vec<ScanResult>> {
        Ok(Vec::new())
    }

    async fn added_networks(&self) -> WifiResult<Vec<AddedNetwork>> {
        Ok(self.with(|s| {
            s.known
                .iter()
                .enumerate()
                .map(|(i, ssid)| AddedNetwork {
                    ssid: ssid.clone(),
                    path: format!("/fi/w1/wpa_supplicant1/Interfaces/0/Networks/{i}"),
                })
                .collect()
        }))
    }

    async fn add_network(&self, params: &NetworkParams) -> WifiResult<()> {
        self.add_known(&params.ssid);
        Ok(())
    }

    async fn remove_network(&self, ssid: &str) -> WifiResult<()> {
        self.with(|s| {
            let before = s.known.len();
            s.known.retain(|k| k != ssid);
            if s.known.len() == before {
                return Err(WifiError::NotFound(ssid.to_string()));
            }
            Ok(())
        })
    }

    async fn select_network(&self, ssid: &str) -> WifiResult<()> {
        self.with(|s| {
            if !s.known.iter().any(|k| k == ssid) {
                return Err(WifiError::NotFound(ssid.to_string()));
            }
            s.selected.push(ssid.to_string());
            s.state = "associating".into();
            Ok(())
        })
    }

    async fn disconnect(&self) -> WifiResult<()> {
        self.set_state("disconnected");
        Ok(())
    }

    async fn p2p_name(&self) -> WifiResult<String> {
        Ok(self.with(|s| s.p2p_name.clone()))
    }

    async fn set_p2p_name(&self, name: &str) -> WifiResult<()> {
        self.with(|s| {
            if s.fail_p2p_write {
                return Err(WifiError::Io(std::io::ErrorKind::PermissionDenied.into()));
            }
            s.p2p_name = name.to_string();
            Ok(())
        })
    }
}

// ── Access point ──────────────────────────────────────────────────────

#[derive(Default)]
struct HotspotState {
    started: bool,
    ssid: String,
    password: String,
    host_name: String,
    mac: String,
    calls: Vec<&'static str>,
}

pub struct FakeHotspot(Mutex<HotspotState>);

impl FakeHotspot {
    pub fn new(ssid: &str, mac: &str) -> Self {
        Self(Mutex::new(HotspotState {
            ssid: ssid.to_string(),
            mac: mac.to_string(),
            ..Default::default()
        }))
    }

    fn with<T>(&self, f: impl FnOnce(&mut HotspotState) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }

    pub fn set_started(&self, started: bool) {
        self.with(|s| s.started = started);
    }

    pub fn is_started(&self) -> bool {
        self.with(|s| s.started)
    }

    /// Lifecycle calls in order: `start`, `stop`, `restart`
    pub fn calls(&self) -> Vec<&'static str> {
        self.with(|s| s.calls.clone())
    }
}

#[async_trait]
impl ServiceControl for FakeHotspot {
    async fn started(&self) -> bool {
        self.is_started()
    }

    async fn start(&self) -> WifiResult<()> {
        self.with(|s| {
            s.calls.push("start");
            s.started = true;
        });
        Ok(())
    }

    async fn stop(&self) -> WifiResult<()> {
        self.with(|s| {
            s.calls.push("stop");
            s.started = false;
        });
        Ok(())
    }

    async fn restart(&self) -> WifiResult<()> {
        self.with(|s| {
            s.calls.push("restart");
            s.started = true;
        });
        Ok(())
    }
}

#[async_trait]
impl AccessPoint for FakeHotspot {
    async fn status(&self) -> WifiResult<HotspotStatus> {
        Ok(HotspotStatus {
            ssid: self.with(|s| s.ssid.clone()),
        })
    }

    async fn hotspot_ssid(&self) -> WifiResult<String> {
        Ok(self.with(|s| s.ssid.clone()))
    }

    async fn set_hotspot_ssid(&self, ssid: &str) -> WifiResult<()> {
        self.with(|s| s.ssid = ssid.to_string());
        Ok(())
    }

    async fn set_hotspot_password(&self, password: &str) -> WifiResult<()> {
        self.with(|s| s.password = password.to_string());
        Ok(())
    }

    async fn host_name(&self) -> WifiResult<String> {
        Ok(self.with(|s| s.host_name.clone()))
    }

    async fn set_host_name(&self, name: &str) -> WifiResult<()> {
        self.with(|s| s.host_name = name.to_string());
        Ok(())
    }

    async fn device_mac(&self) -> WifiResult<String> {
        Ok(self.with(|s| s.mac.clone()))
    }
}

// ── Interface ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeInterface {
    blocked: AtomicBool,
    dns_restarts: Mutex<usize>,
}

impl FakeInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    pub fn dns_restarts(&self) -> usize {
        *self.dns_restarts.lock().unwrap()
    }
}

#[async_trait]
impl Interface for FakeInterface {
    async fn block(&self) -> WifiResult<()> {
        self.set_blocked(true);
        Ok(())
    }

    async fn unblock(&self) -> WifiResult<()> {
        self.set_blocked(false);
        Ok(())
    }

    async fn device_ip(&self) -> WifiResult<Option<String>> {
        Ok(Some("192.168.42.1".into()))
    }

    async fn restart_dns(&self) -> WifiResult<()> {
        *self.dns_restarts.lock().unwrap() += 1;
        Ok(())
    }
}

// ── Signal source ─────────────────────────────────────────────────────

/// Channel-backed [`SignalSource`]; the stream ends when the sender is dropped
pub struct FakeSource {
    signals: Option<mpsc::UnboundedReceiver<BusSignal>>,
    client: Option<Arc<dyn ClientLink>>,
    fail_subscribe: bool,
    fail_unsubscribe: bool,
    unsubscribed: Arc<AtomicBool>,
}

impl FakeSource {
    pub fn new() -> (mpsc::UnboundedSender<BusSignal>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            signals: Some(rx),
            client: None,
            fail_subscribe: false,
            fail_unsubscribe: false,
            unsubscribed: Arc::new(AtomicBool::new(false)),
        };
        (tx, source)
    }

    /// Resolve the client's interface on subscribe, like the bus source does
    pub fn watching(mut self, client: Arc<dyn ClientLink>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn failing_unsubscribe(mut self) -> Self {
        self.fail_unsubscribe = true;
        self
    }

    /// Set once `unsubscribe` has been called, whether or not it failed
    pub fn unsubscribed_flag(&self) -> Arc<AtomicBool> {
        self.unsubscribed.clone()
    }
}

#[async_trait]
impl SignalSource for FakeSource {
    async fn subscribe(&mut self) -> MonitorResult<BoxStream<'static, BusSignal>> {
        if self.fail_subscribe {
            return Err(MonitorError::Initialize(WifiError::Command(
                "Subscribe".into(),
            )));
        }
        if let Some(client) = &self.client {
            client
                .interface_path()
                .await
                .map_err(MonitorError::Initialize)?;
        }
        let rx = self.signals.take().ok_or_else(|| {
            MonitorError::Initialize(WifiError::Command("already subscribed".into()))
        })?;
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|signal| (signal, rx))
        })
        .boxed())
    }

    async fn unsubscribe(&mut self) -> MonitorResult<()> {
        self.unsubscribed.store(true, Ordering::SeqCst);
        if self.fail_unsubscribe {
            return Err(MonitorError::Teardown(WifiError::Command(
                "Unsubscribe".into(),
            )));
        }
        Ok(())
    }
}
