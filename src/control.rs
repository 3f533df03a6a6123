//! Mode controller: the Off / Client / Hotspot state machine and the
//! network-join protocol with timeout and hotspot fallback.
//!
//! The controller performs no internal locking. Share it as a
//! [`SharedController`] and go through that one lock from every task.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::WifiResult;
use crate::event::NormalizedEvent;
use crate::monitor::dispatch::Args;
use crate::network::facade::{AccessPoint, ClientLink, Interface};
use crate::network::types::{AddedNetwork, ClientStatus, NetworkParams, ScanResult};

pub type SharedController = Arc<Mutex<ModeController>>;

/// Operating mode of the wireless interface, derived from the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Off,
    Client,
    Hotspot,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "wifi_off"),
            Self::Client => write!(f, "wpa_supplicant"),
            Self::Hotspot => write!(f, "hostapd"),
        }
    }
}

/// Mode-specific status returned by [`ModeController::status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Status {
    Client(ClientStatus),
    /// Broadcast SSID of the hotspot
    Hotspot(String),
}

/// Client is checked first, so it wins if both services report started.
pub async fn current_mode(client: &dyn ClientLink, hotspot: &dyn AccessPoint) -> Mode {
    if client.started().await {
        Mode::Client
    } else if hotspot.started().await {
        Mode::Hotspot
    } else {
        Mode::Off
    }
}

/// Last six hex digits of a hardware address, in the case the platform prints
pub fn mac_suffix(mac: &str) -> String {
    let hex: Vec<char> = mac.chars().filter(char::is_ascii_hexdigit).collect();
    hex[hex.len().saturating_sub(6)..].iter().collect()
}

type ConnectHandler = dyn Fn(bool, Args) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync;

/// Completion callback of a connection attempt plus its fixed arguments.
///
/// The controller hands it back inside a [`Resolved`] instead of running it,
/// so it runs with the [`SharedController`] unlocked and may drive mode
/// transitions itself.
#[derive(Clone)]
pub struct ConnectCallback {
    name: String,
    handler: Arc<ConnectHandler>,
    args: Args,
}

impl ConnectCallback {
    pub fn new<F, Fut>(name: impl Into<String>, args: Args, f: F) -> Self
    where
        F: Fn(bool, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |connected, args| f(connected, args).boxed()),
            args,
        }
    }

    async fn invoke(&self, connected: bool) {
        let fut = (self.handler)(connected, self.args.clone());
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(callback = %self.name, "Connect callback error: {e:#}"),
            Err(_) => error!(callback = %self.name, "Connect callback panicked"),
        }
    }
}

impl fmt::Debug for ConnectCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectCallback")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

/// A connection attempt that has resolved.
///
/// Call [`Resolved::notify`] after releasing the controller lock.
#[derive(Debug)]
#[must_use = "the connect callback only runs through `notify`"]
pub struct Resolved {
    network: String,
    connected: bool,
    callback: Option<ConnectCallback>,
}

impl Resolved {
    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Run the user callback, if the attempt carried one
    pub async fn notify(self) {
        if let Some(callback) = self.callback {
            callback.invoke(self.connected).await;
        }
    }
}

/// What happens once an attempt resolves
#[derive(Debug, Clone)]
pub enum OnConnect {
    /// Re-enter hotspot mode on failure
    Fallback,
    /// Try the same network once more on failure, then fall back
    Reconnect,
    Callback(ConnectCallback),
}

#[derive(Debug)]
struct ConnectionAttempt {
    network: String,
    on_result: OnConnect,
    timeout: Duration,
    deadline: Instant,
}

pub struct ModeController {
    client: Arc<dyn ClientLink>,
    hotspot: Arc<dyn AccessPoint>,
    interface: Arc<dyn Interface>,
    attempt: Option<ConnectionAttempt>,
    deadline_tx: watch::Sender<Option<Instant>>,
}

impl ModeController {
    pub fn new(
        client: Arc<dyn ClientLink>,
        hotspot: Arc<dyn AccessPoint>,
        interface: Arc<dyn Interface>,
    ) -> Self {
        let (deadline_tx, _) = watch::channel(None);
        Self {
            client,
            hotspot,
            interface,
            attempt: None,
            deadline_tx,
        }
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    // ── Mode state machine ────────────────────────────────────────────

    pub async fn mode(&self) -> Mode {
        current_mode(self.client.as_ref(), self.hotspot.as_ref()).await
    }

    pub async fn wifi_turned_on(&self) -> bool {
        self.mode().await != Mode::Off
    }

    /// Stop the client, then (re)start the access point.
    /// A failed start leaves the client stopped.
    pub async fn enter_hotspot_mode(&self) -> bool {
        if self.client.started().await {
            if let Err(e) = self.client.stop().await {
                warn!("Failed to stop client service: {}", e);
            }
        }

        // Restart applies configuration changes made since the last start
        let result = if self.hotspot.started().await {
            self.hotspot.restart().await
        } else {
            self.hotspot.start().await
        };

        match result {
            Ok(()) => {
                info!("Entered hotspot mode");
                true
            }
            Err(e) => {
                error!("Failed to start hotspot: {}", e);
                false
            }
        }
    }

    /// Stop the access point, then (re)start the client.
    pub async fn enter_client_mode(&self) -> bool {
        if self.hotspot.started().await {
            if let Err(e) = self.hotspot.stop().await {
                warn!("Failed to stop hotspot service: {}", e);
            }
        }

        let result = if self.client.started().await {
            self.client.restart().await
        } else {
            self.client.start().await
        };

        match result {
            Ok(()) => {
                info!("Entered client mode");
                true
            }
            Err(e) => {
                error!("Failed to start client: {}", e);
                false
            }
        }
    }

    /// Client mode without a restart when the client is already the only
    /// service running, so its bus objects and subscriptions survive
    pub async fn ensure_client_mode(&self) -> bool {
        if self.client.started().await && !self.hotspot.started().await {
            return true;
        }
        self.enter_client_mode().await
    }

    /// Unblock the radio and start the client, only when currently off
    pub async fn turn_on(&self) -> bool {
        if self.mode().await != Mode::Off {
            return true;
        }
        if let Err(e) = self.interface.unblock().await {
            error!("Failed to unblock radio: {}", e);
            return false;
        }
        match self.client.start().await {
            Ok(()) => {
                info!("WiFi turned on");
                true
            }
            Err(e) => {
                error!("Failed to start client: {}", e);
                false
            }
        }
    }

    /// Stop both services and block the radio. Safe to repeat.
    pub async fn turn_off(&mut self) -> bool {
        self.cancel_connect();

        let steps = [
            ("stop hotspot", self.hotspot.stop().await),
            ("stop client", self.client.stop().await),
            ("block radio", self.interface.block().await),
        ];

        let mut ok = true;
        for (step, result) in steps {
            if let Err(e) = result {
                warn!("Failed to {}: {}", step, e);
                ok = false;
            }
        }
        info!("WiFi turned off");
        ok
    }

    /// Current mode and its status; status is `None` when unreadable
    pub async fn status(&self) -> (Mode, Option<Status>) {
        let mode = self.mode().await;
        let status = match mode {
            Mode::Client => self.client.status().await.ok().map(Status::Client),
            Mode::Hotspot => self.hotspot.hotspot_ssid().await.ok().map(Status::Hotspot),
            Mode::Off => None,
        };
        (mode, status)
    }

    // ── Connection attempts ───────────────────────────────────────────

    /// Switch to client mode and try to join `network`.
    ///
    /// With no callback a failed attempt re-enters hotspot mode, so a device
    /// that cannot join never ends up unreachable. The attempt resolves when
    /// the event loop reports `CLIENT_CONNECTED` or the deadline passes.
    /// Returns `Some` when it failed before the timer was armed.
    pub async fn connect(
        &mut self,
        network: &str,
        on_result: Option<ConnectCallback>,
        timeout: Duration,
    ) -> Option<Resolved> {
        let on_result = on_result.map(OnConnect::Callback).unwrap_or(OnConnect::Fallback);
        self.connect_with(network, on_result, timeout).await
    }

    pub async fn connect_with(
        &mut self,
        network: &str,
        on_result: OnConnect,
        timeout: Duration,
    ) -> Option<Resolved> {
        match self.begin_attempt(network.to_string(), on_result, timeout).await {
            Ok(()) => None,
            Err(attempt) => Some(self.finish(attempt, false).await),
        }
    }

    /// Drop the pending attempt; its callback never fires
    pub fn cancel_connect(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            info!("Cancelled connection attempt to '{}'", attempt.network);
        }
        self.deadline_tx.send_replace(None);
    }

    pub async fn disconnect(&self) -> WifiResult<()> {
        self.client.disconnect().await
    }

    pub fn pending_network(&self) -> Option<&str> {
        self.attempt.as_ref().map(|a| a.network.as_str())
    }

    pub fn attempt_deadline(&self) -> Option<Instant> {
        self.attempt.as_ref().map(|a| a.deadline)
    }

    /// Announces every newly armed or cleared deadline
    pub fn deadline_receiver(&self) -> watch::Receiver<Option<Instant>> {
        self.deadline_tx.subscribe()
    }

    /// Connect-result handler; resolves the pending attempt on `CLIENT_CONNECTED`
    pub async fn on_client_event(&mut self, event: NormalizedEvent) -> Option<Resolved> {
        if event != NormalizedEvent::ClientConnected {
            return None;
        }
        let attempt = self.take_attempt()?;
        info!("Connected to '{}'", attempt.network);
        Some(self.finish(attempt, true).await)
    }

    /// Fail the pending attempt if its deadline has passed
    pub async fn expire_attempt(&mut self) -> Option<Resolved> {
        match self.attempt_deadline() {
            Some(deadline) if Instant::now() >= deadline => {}
            _ => return None,
        }
        let attempt = self.take_attempt()?;
        warn!(
            "Connection to '{}' timed out after {:?}",
            attempt.network, attempt.timeout
        );
        Some(self.finish(attempt, false).await)
    }

    fn take_attempt(&mut self) -> Option<ConnectionAttempt> {
        let attempt = self.attempt.take();
        if attempt.is_some() {
            self.deadline_tx.send_replace(None);
        }
        attempt
    }

    /// Arms a new attempt, replacing any pending one. Hands the attempt back
    /// when it failed before the timer could be armed.
    async fn begin_attempt(
        &mut self,
        network: String,
        on_result: OnConnect,
        timeout: Duration,
    ) -> Result<(), ConnectionAttempt> {
        self.cancel_connect();

        let mut attempt = ConnectionAttempt {
            network,
            on_result,
            timeout,
            deadline: Instant::now() + timeout,
        };

        if !self.ensure_client_mode().await {
            return Err(attempt);
        }
        if let Err(e) = self.client.select_network(&attempt.network).await {
            error!("Failed to select '{}': {}", attempt.network, e);
            return Err(attempt);
        }

        attempt.deadline = Instant::now() + timeout;
        info!("Connecting to '{}' (timeout {:?})", attempt.network, timeout);
        self.deadline_tx.send_replace(Some(attempt.deadline));
        self.attempt = Some(attempt);
        Ok(())
    }

    /// Applies fallback and retry here; a user callback is handed back
    async fn finish(&mut self, attempt: ConnectionAttempt, connected: bool) -> Resolved {
        let mut resolved = Resolved {
            network: attempt.network.clone(),
            connected,
            callback: None,
        };
        let mut next = Some((attempt, connected));
        while let Some((attempt, connected)) = next.take() {
            match attempt.on_result {
                OnConnect::Callback(callback) => resolved.callback = Some(callback),
                OnConnect::Fallback if !connected => {
                    warn!("Could not join '{}', falling back to hotspot", attempt.network);
                    self.enter_hotspot_mode().await;
                }
                OnConnect::Reconnect if !connected => {
                    info!("Retrying '{}'", attempt.network);
                    next = self
                        .begin_attempt(attempt.network, OnConnect::Fallback, attempt.timeout)
                        .await
                        .err()
                        .map(|retry| (retry, false));
                }
                OnConnect::Fallback | OnConnect::Reconnect => {}
            }
        }
        resolved
    }

    // ── Device names ──────────────────────────────────────────────────

    /// Write host, hotspot and peer-discovery names, then verify them
    pub async fn set_names(&self, name: &str) -> bool {
        let suffix = match self.hotspot.device_mac().await {
            Ok(mac) => mac_suffix(&mac),
            Err(e) => {
                warn!("Failed to read hotspot hardware address: {}", e);
                return false;
            }
        };

        let ssid = format!("{name}{suffix}");
        let writes = [
            ("peer name", self.client.set_p2p_name(name).await),
            ("hotspot SSID", self.hotspot.set_hotspot_ssid(&ssid).await),
            ("host name", self.hotspot.set_host_name(name).await),
            ("DNS restart", self.interface.restart_dns().await),
        ];
        for (what, result) in writes {
            if let Err(e) = result {
                warn!("Failed to apply {}: {}", what, e);
                return false;
            }
        }

        self.verify_names(name).await
    }

    /// Read back all three names; any mismatch or read failure yields `false`
    pub async fn verify_names(&self, name: &str) -> bool {
        let Ok(host) = self.hotspot.host_name().await else {
            return false;
        };
        let Ok(peer) = self.client.p2p_name().await else {
            return false;
        };
        let Ok(mac) = self.hotspot.device_mac().await else {
            return false;
        };
        let Ok(ssid) = self.hotspot.hotspot_ssid().await else {
            return false;
        };

        host == name && peer == name && ssid == format!("{name}{}", mac_suffix(&mac))
    }

    // ── Pass-through operations ───────────────────────────────────────

    pub async fn device_name(&self) -> WifiResult<String> {
        self.hotspot.host_name().await
    }

    pub async fn hotspot_name(&self) -> WifiResult<String> {
        self.hotspot.hotspot_ssid().await
    }

    pub async fn set_hotspot_password(&self, password: &str) -> WifiResult<()> {
        self.hotspot.set_hotspot_password(password).await
    }

    pub async fn ip(&self) -> WifiResult<Option<String>> {
        self.interface.device_ip().await
    }

    pub async fn scan(&self) -> WifiResult<()> {
        self.client.scan().await
    }

    pub async fn scan_results(&self) -> WifiResult<Vec<ScanResult>> {
        self.client.scan_results().await
    }

    pub async fn added_networks(&self) -> WifiResult<Vec<AddedNetwork>> {
        self.client.added_networks().await
    }

    pub async fn add_network(&self, params: &NetworkParams) -> WifiResult<()> {
        self.client.add_network(params).await
    }

    pub async fn remove_network(&self, ssid: &str) -> WifiResult<()> {
        self.client.remove_network(ssid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClient, FakeHotspot, FakeInterface};
    use std::sync::Mutex as StdMutex;

    struct Rig {
        controller: ModeController,
        client: Arc<FakeClient>,
        hotspot: Arc<FakeHotspot>,
        interface: Arc<FakeInterface>,
    }

    fn rig() -> Rig {
        let client = Arc::new(FakeClient::new());
        let hotspot = Arc::new(FakeHotspot::new("reach", "B8:27:EB:1A:2B:3C"));
        let interface = Arc::new(FakeInterface::new());
        let controller = ModeController::new(client.clone(), hotspot.clone(), interface.clone());
        Rig {
            controller,
            client,
            hotspot,
            interface,
        }
    }

    fn recording_callback(log: Arc<StdMutex<Vec<(bool, Option<String>)>>>) -> ConnectCallback {
        ConnectCallback::new("record", Args::new(["home"]), move |connected, args| {
            let log = log.clone();
            async move {
                log.lock()
                    .unwrap()
                    .push((connected, args.get(0).map(str::to_string)));
                Ok(())
            }
        })
    }

    #[test]
    fn test_mac_suffix_keeps_platform_case() {
        assert_eq!(mac_suffix("b8:27:eb:1a:2b:3c"), "1a2b3c");
        assert_eq!(mac_suffix("B8:27:EB:1A:2B:3C"), "1A2B3C");
        assert_eq!(mac_suffix("ab"), "ab");
    }

    #[test]
    fn test_mode_display_uses_service_names() {
        assert_eq!(Mode::Off.to_string(), "wifi_off");
        assert_eq!(Mode::Client.to_string(), "wpa_supplicant");
        assert_eq!(Mode::Hotspot.to_string(), "hostapd");
    }

    #[tokio::test]
    async fn test_mode_derived_from_services() {
        let r = rig();
        assert_eq!(r.controller.mode().await, Mode::Off);

        r.hotspot.set_started(true);
        assert_eq!(r.controller.mode().await, Mode::Hotspot);

        // Both running: client is evaluated first
        r.client.set_started(true);
        assert_eq!(r.controller.mode().await, Mode::Client);
    }

    #[tokio::test]
    async fn test_enter_hotspot_mode_stops_client() {
        let r = rig();
        r.client.set_started(true);

        assert!(r.controller.enter_hotspot_mode().await);
        assert_eq!(r.controller.mode().await, Mode::Hotspot);
        assert!(!r.client.is_started());

        // Already running: restarted to pick up config changes
        assert!(r.controller.enter_hotspot_mode().await);
        assert_eq!(r.hotspot.calls(), vec!["start", "restart"]);
    }

    #[tokio::test]
    async fn test_enter_client_mode_reports_start_failure() {
        let r = rig();
        r.hotspot.set_started(true);
        r.client.fail_start(true);

        assert!(!r.controller.enter_client_mode().await);
        // No rollback: the hotspot stays stopped
        assert!(!r.hotspot.is_started());
        assert_eq!(r.controller.mode().await, Mode::Off);
    }

    #[tokio::test]
    async fn test_turn_on_only_when_off() {
        let r = rig();
        r.interface.set_blocked(true);
        assert!(r.controller.turn_on().await);
        assert!(!r.interface.is_blocked());
        assert_eq!(r.controller.mode().await, Mode::Client);

        r.client.set_started(false);
        r.hotspot.set_started(true);
        r.interface.set_blocked(true);
        assert!(r.controller.turn_on().await);
        assert!(r.interface.is_blocked());
        assert_eq!(r.controller.mode().await, Mode::Hotspot);
    }

    #[tokio::test]
    async fn test_turn_off_is_idempotent() {
        let mut r = rig();
        r.hotspot.set_started(true);

        assert!(r.controller.turn_off().await);
        assert!(r.controller.turn_off().await);

        assert_eq!(r.controller.mode().await, Mode::Off);
        assert!(r.interface.is_blocked());
    }

    #[tokio::test]
    async fn test_status_per_mode() {
        let r = rig();
        assert_eq!(r.controller.status().await, (Mode::Off, None));

        r.hotspot.set_started(true);
        assert_eq!(
            r.controller.status().await,
            (Mode::Hotspot, Some(Status::Hotspot("reach".into())))
        );

        r.hotspot.set_started(false);
        r.client.set_started(true);
        r.client.fail_status_reads(1);
        assert_eq!(r.controller.status().await, (Mode::Client, None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_times_out_and_falls_back_to_hotspot() {
        let mut r = rig();
        r.client.add_known("home-network");
        r.client.set_started(true);
        r.client.set_state("disconnected");

        let failed = r
            .controller
            .connect("home-network", None, Duration::from_secs(10))
            .await;
        assert!(failed.is_none());
        assert_eq!(r.controller.mode().await, Mode::Client);
        assert_eq!(r.controller.pending_network(), Some("home-network"));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(r.controller.expire_attempt().await.is_none());

        tokio::time::advance(Duration::from_secs(1)).await;
        let resolved = r.controller.expire_attempt().await.unwrap();
        assert!(!resolved.connected());
        resolved.notify().await;

        assert_eq!(r.controller.mode().await, Mode::Hotspot);
        assert_eq!(r.controller.pending_network(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_success_fires_callback_once() {
        let mut r = rig();
        r.client.add_known("home");
        let log = Arc::new(StdMutex::new(Vec::new()));

        r.controller
            .connect(
                "home",
                Some(recording_callback(log.clone())),
                Duration::from_secs(10),
            )
            .await;

        assert!(r
            .controller
            .on_client_event(NormalizedEvent::ClientScanning)
            .await
            .is_none());
        let resolved = r
            .controller
            .on_client_event(NormalizedEvent::ClientConnected)
            .await
            .unwrap();
        assert!(r
            .controller
            .on_client_event(NormalizedEvent::ClientConnected)
            .await
            .is_none());

        // Handed back, not run, until notified
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(resolved.network(), "home");
        resolved.notify().await;

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(r.controller.expire_attempt().await.is_none());

        assert_eq!(*log.lock().unwrap(), vec![(true, Some("home".to_string()))]);
        assert_eq!(r.controller.mode().await, Mode::Client);
    }

    #[tokio::test]
    async fn test_connect_to_unknown_network_fails_immediately() {
        let mut r = rig();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let failed = r
            .controller
            .connect(
                "nowhere",
                Some(recording_callback(log.clone())),
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        assert!(!failed.connected());
        failed.notify().await;

        assert_eq!(*log.lock().unwrap(), vec![(false, Some("home".to_string()))]);
        assert_eq!(r.controller.attempt_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_connect_drops_pending_attempt() {
        let mut r = rig();
        r.client.add_known("home");
        let mut deadlines = r.controller.deadline_receiver();

        r.controller
            .connect("home", None, Duration::from_secs(5))
            .await;
        assert!(deadlines.borrow_and_update().is_some());

        r.controller.cancel_connect();
        assert!(deadlines.borrow_and_update().is_none());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(r.controller.expire_attempt().await.is_none());
        assert_eq!(r.controller.mode().await, Mode::Client);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_connect_supersedes_previous_attempt() {
        let mut r = rig();
        r.client.add_known("first");
        r.client.add_known("second");
        let log = Arc::new(StdMutex::new(Vec::new()));

        r.controller
            .connect(
                "first",
                Some(recording_callback(log.clone())),
                Duration::from_secs(5),
            )
            .await;
        r.controller
            .connect("second", None, Duration::from_secs(5))
            .await;

        assert_eq!(r.controller.pending_network(), Some("second"));
        let resolved = r
            .controller
            .on_client_event(NormalizedEvent::ClientConnected)
            .await
            .unwrap();
        assert_eq!(resolved.network(), "second");
        resolved.notify().await;
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(r.client.selected(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_retries_once_then_falls_back() {
        let mut r = rig();
        r.client.add_known("home");

        r.controller
            .connect_with("home", OnConnect::Reconnect, Duration::from_secs(5))
            .await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(r.controller.expire_attempt().await.is_some());
        assert_eq!(r.controller.pending_network(), Some("home"));
        assert_eq!(r.controller.mode().await, Mode::Client);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(r.controller.expire_attempt().await.is_some());
        assert_eq!(r.controller.mode().await, Mode::Hotspot);
        assert_eq!(r.client.selected(), vec!["home", "home"]);
    }

    #[tokio::test]
    async fn test_wifi_turned_on_follows_mode() {
        let mut r = rig();
        assert!(!r.controller.wifi_turned_on().await);

        r.hotspot.set_started(true);
        assert!(r.controller.wifi_turned_on().await);

        r.controller.turn_off().await;
        assert!(!r.controller.wifi_turned_on().await);
    }

    #[tokio::test]
    async fn test_connect_in_client_mode_keeps_client_running() {
        let mut r = rig();
        r.client.add_known("home");
        assert!(r.controller.enter_client_mode().await);
        assert_eq!(r.client.starts(), 1);

        let failed = r
            .controller
            .connect("home", None, Duration::from_secs(5))
            .await;
        assert!(failed.is_none());
        assert_eq!(r.client.starts(), 1);
        assert_eq!(r.controller.pending_network(), Some("home"));
    }

    #[tokio::test]
    async fn test_connect_from_hotspot_switches_to_client() {
        let mut r = rig();
        r.client.add_known("home");
        r.hotspot.set_started(true);

        let failed = r
            .controller
            .connect("home", None, Duration::from_secs(5))
            .await;
        assert!(failed.is_none());
        assert!(!r.hotspot.is_started());
        assert_eq!(r.controller.mode().await, Mode::Client);
    }

    #[tokio::test]
    async fn test_set_names_writes_and_verifies() {
        let r = rig();

        assert!(r.controller.set_names("my-device").await);

        assert_eq!(r.hotspot.host_name().await.unwrap(), "my-device");
        assert_eq!(r.client.p2p_name().await.unwrap(), "my-device");
        assert_eq!(r.hotspot.hotspot_ssid().await.unwrap(), "my-device1A2B3C");
        assert_eq!(r.interface.dns_restarts(), 1);
    }

    #[tokio::test]
    async fn test_verify_names_mismatch_returns_false() {
        let r = rig();
        assert!(r.controller.set_names("my-device").await);

        r.hotspot.set_hotspot_ssid("my-device").await.unwrap();
        assert!(!r.controller.verify_names("my-device").await);

        assert!(!r.controller.verify_names("other").await);
    }

    #[tokio::test]
    async fn test_set_names_write_failure_returns_false() {
        let r = rig();
        r.client.fail_p2p_write(true);
        assert!(!r.controller.set_names("my-device").await);
    }
}
