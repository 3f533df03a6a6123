//! Seams between the mode controller / event normalizer and the services they
//! drive. The D-Bus implementations live next to this module; tests plug in
//! in-memory fakes.

use async_trait::async_trait;

use crate::error::WifiResult;
use crate::network::types::{
    AddedNetwork, ClientStatus, HotspotStatus, NetworkParams, ScanResult,
};

/// Lifecycle control shared by the client and access point services.
#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Whether the backing service is currently running
    async fn started(&self) -> bool;

    async fn start(&self) -> WifiResult<()>;

    async fn stop(&self) -> WifiResult<()>;

    async fn restart(&self) -> WifiResult<()>;
}

/// Client link: joins the device to an external network.
#[async_trait]
pub trait ClientLink: ServiceControl {
    /// Full status snapshot; fails with `WifiError::Property` when unreadable
    async fn status(&self) -> WifiResult<ClientStatus>;

    /// Bus object path of the supplicant interface, used for signal matching
    async fn interface_path(&self) -> WifiResult<String>;

    async fn scan(&self) -> WifiResult<()>;

    async fn scan_results(&self) -> WifiResult<Vec<ScanResult>>;

    async fn added_networks(&self) -> WifiResult<Vec<AddedNetwork>>;

    async fn add_network(&self, params: &NetworkParams) -> WifiResult<()>;

    async fn remove_network(&self, ssid: &str) -> WifiResult<()>;

    /// Start associating with a previously added network
    async fn select_network(&self, ssid: &str) -> WifiResult<()>;

    async fn disconnect(&self) -> WifiResult<()>;

    /// Peer-to-peer discovery name
    async fn p2p_name(&self) -> WifiResult<String>;

    async fn set_p2p_name(&self, name: &str) -> WifiResult<()>;
}

/// Access point: the device's own hotspot.
#[async_trait]
pub trait AccessPoint: ServiceControl {
    async fn status(&self) -> WifiResult<HotspotStatus>;

    async fn hotspot_ssid(&self) -> WifiResult<String>;

    async fn set_hotspot_ssid(&self, ssid: &str) -> WifiResult<()>;

    async fn set_hotspot_password(&self, password: &str) -> WifiResult<()>;

    async fn host_name(&self) -> WifiResult<String>;

    async fn set_host_name(&self, name: &str) -> WifiResult<()>;

    /// Hardware address as printed by the platform, e.g. `b8:27:eb:1a:2b:3c`
    async fn device_mac(&self) -> WifiResult<String>;
}

/// The wireless interface itself.
#[async_trait]
pub trait Interface: Send + Sync {
    /// Soft-block the radio
    async fn block(&self) -> WifiResult<()>;

    async fn unblock(&self) -> WifiResult<()>;

    /// First IPv4 address of the interface, if any
    async fn device_ip(&self) -> WifiResult<Option<String>>;

    async fn restart_dns(&self) -> WifiResult<()>;
}
