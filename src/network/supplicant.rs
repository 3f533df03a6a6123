use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
use zbus::Connection;

use crate::error::{WifiError, WifiResult};
use crate::network::conf;
use crate::network::dbus_proxies::*;
use crate::network::facade::{ClientLink, ServiceControl};
use crate::network::interface::{ipv4_address, read_mac};
use crate::network::systemd::Unit;
use crate::network::types::*;

/// Client link facade over wpa_supplicant's D-Bus API.
/// The service itself is started and stopped through systemd.
pub struct Supplicant {
    connection: Connection,
    interface: String,
    unit: Unit,
    p2p_config: PathBuf,
}

impl Supplicant {
    pub fn new(
        connection: Connection,
        interface: impl Into<String>,
        unit: impl Into<String>,
        p2p_config: impl Into<PathBuf>,
    ) -> Self {
        let unit = Unit::new(connection.clone(), unit);
        Self {
            connection,
            interface: interface.into(),
            unit,
            p2p_config: p2p_config.into(),
        }
    }

    async fn interface_proxy(&self) -> WifiResult<WpaInterfaceProxy<'static>> {
        let path = self.resolve_interface().await?;
        Ok(WpaInterfaceProxy::builder(&self.connection)
            .path(path)?
            .build()
            .await?)
    }

    async fn resolve_interface(&self) -> WifiResult<OwnedObjectPath> {
        let root = WpaSupplicantProxy::new(&self.connection).await?;
        Ok(root.get_interface(&self.interface).await?)
    }

    async fn network_ssid(&self, path: &OwnedObjectPath) -> WifiResult<Option<String>> {
        let proxy = WpaNetworkProxy::builder(&self.connection)
            .path(path.clone())?
            .build()
            .await?;
        let props = proxy.properties().await?;
        Ok(props
            .get("ssid")
            .and_then(ov_to_string)
            .map(|s| s.trim_matches('"').to_string()))
    }

    async fn find_network(&self, ssid: &str) -> WifiResult<OwnedObjectPath> {
        let proxy = self.interface_proxy().await?;
        for path in proxy.networks().await? {
            if self.network_ssid(&path).await?.as_deref() == Some(ssid) {
                return Ok(path);
            }
        }
        Err(WifiError::NotFound(ssid.to_string()))
    }

    async fn bss_info(&self, path: &OwnedObjectPath) -> WifiResult<ScanResult> {
        let proxy = WpaBssProxy::builder(&self.connection)
            .path(path.clone())?
            .build()
            .await?;

        let ssid = String::from_utf8_lossy(&proxy.ssid().await?).to_string();
        let bssid = format_bssid(&proxy.bssid().await.unwrap_or_default());
        let signal = proxy.signal().await.unwrap_or(i16::MIN);
        let frequency = proxy.frequency().await.unwrap_or(0) as u32;
        let privacy = proxy.privacy().await.unwrap_or(false);
        let rsn = key_mgmt(&proxy.rsn().await.unwrap_or_default());
        let wpa = key_mgmt(&proxy.wpa().await.unwrap_or_default());

        Ok(ScanResult {
            ssid,
            bssid,
            signal,
            frequency,
            channel: channel_from_frequency(frequency),
            security: SecurityType::from_key_mgmt(&rsn, &wpa, privacy),
        })
    }
}

#[async_trait]
impl ServiceControl for Supplicant {
    async fn started(&self) -> bool {
        self.unit.is_active().await
    }

    async fn start(&self) -> WifiResult<()> {
        self.unit.start().await
    }

    async fn stop(&self) -> WifiResult<()> {
        self.unit.stop().await
    }

    async fn restart(&self) -> WifiResult<()> {
        self.unit.restart().await
    }
}

#[async_trait]
impl ClientLink for Supplicant {
    async fn status(&self) -> WifiResult<ClientStatus> {
        let proxy = self.interface_proxy().await?;
        let state = proxy
            .state()
            .await
            .map_err(|e| WifiError::Property(format!("State: {e}")))?;

        let mut status = ClientStatus {
            state,
            ..Default::default()
        };

        // "/" means no current BSS
        if let Ok(bss) = proxy.current_bss().await {
            if bss.as_str() != "/" {
                match self.bss_info(&bss).await {
                    Ok(info) => {
                        status.ssid = Some(info.ssid);
                        status.bssid = Some(info.bssid);
                    }
                    Err(e) => debug!("Failed to read current BSS {}: {}", bss, e),
                }
            }
        }

        status.ip_address = ipv4_address(&self.interface).await.ok().flatten();
        status.mac_address = read_mac(&self.interface).await.ok();
        Ok(status)
    }

    async fn interface_path(&self) -> WifiResult<String> {
        Ok(self.resolve_interface().await?.to_string())
    }

    async fn scan(&self) -> WifiResult<()> {
        let proxy = self.interface_proxy().await?;
        let mut args = HashMap::new();
        args.insert("Type", Value::from("active"));
        proxy.scan(args).await?;
        debug!("WiFi scan requested on {}", self.interface);
        Ok(())
    }

    async fn scan_results(&self) -> WifiResult<Vec<ScanResult>> {
        let proxy = self.interface_proxy().await?;
        let mut results = Vec::new();

        for path in proxy.bsss().await? {
            match self.bss_info(&path).await {
                Ok(bss) if !bss.ssid.is_empty() => results.push(bss),
                Ok(_) => {} // Skip hidden networks
                Err(e) => debug!("Failed to get BSS info for {}: {}", path, e),
            }
        }

        // Strongest first, one entry per SSID
        results.sort_by(|a, b| b.signal.cmp(&a.signal));
        let mut seen = std::collections::HashSet::new();
        results.retain(|bss| seen.insert(bss.ssid.clone()));

        Ok(results)
    }

    async fn added_networks(&self) -> WifiResult<Vec<AddedNetwork>> {
        let proxy = self.interface_proxy().await?;
        let mut networks = Vec::new();

        for path in proxy.networks().await? {
            match self.network_ssid(&path).await {
                Ok(Some(ssid)) => networks.push(AddedNetwork {
                    ssid,
                    path: path.to_string(),
                }),
                Ok(None) => {}
                Err(e) => warn!("Failed to read network {}: {}", path, e),
            }
        }

        Ok(networks)
    }

    async fn add_network(&self, params: &NetworkParams) -> WifiResult<()> {
        let proxy = self.interface_proxy().await?;

        let mut args: HashMap<&str, Value<'_>> = HashMap::new();
        args.insert("ssid", Value::from(params.ssid.as_str()));
        match params.password.as_deref() {
            Some(psk) => {
                args.insert("key_mgmt", Value::from("WPA-PSK"));
                args.insert("psk", Value::from(psk));
            }
            None => {
                args.insert("key_mgmt", Value::from("NONE"));
            }
        }
        if params.hidden {
            args.insert("scan_ssid", Value::from(1i32));
        }

        let path = proxy.add_network(args).await?;
        info!("Added network '{}' at {}", params.ssid, path);
        Ok(())
    }

    async fn remove_network(&self, ssid: &str) -> WifiResult<()> {
        let path = self.find_network(ssid).await?;
        let proxy = self.interface_proxy().await?;
        proxy.remove_network(&path.as_ref()).await?;
        info!("Removed network '{}'", ssid);
        Ok(())
    }

    async fn select_network(&self, ssid: &str) -> WifiResult<()> {
        let path = self.find_network(ssid).await?;
        let proxy = self.interface_proxy().await?;
        proxy.select_network(&path.as_ref()).await?;
        info!("Selected network '{}'", ssid);
        Ok(())
    }

    async fn disconnect(&self) -> WifiResult<()> {
        let proxy = self.interface_proxy().await?;
        proxy.disconnect().await?;
        info!("Disconnected {}", self.interface);
        Ok(())
    }

    async fn p2p_name(&self) -> WifiResult<String> {
        conf::read_value(&self.p2p_config, "device_name").await
    }

    async fn set_p2p_name(&self, name: &str) -> WifiResult<()> {
        conf::write_value(&self.p2p_config, "device_name", name).await
    }
}

// ── Safe OwnedValue extraction via pattern matching ───────────────────
// OwnedValue derefs to Value<'static>, so &**v gives &Value to match on.

pub fn ov_to_string(v: &OwnedValue) -> Option<String> {
    match &**v {
        Value::Str(s) => Some(s.to_string()),
        _ => None,
    }
}

fn ov_to_string_list(v: &OwnedValue) -> Vec<String> {
    match &**v {
        Value::Array(arr) => arr
            .iter()
            .filter_map(|item| match item {
                Value::Str(s) => Some(s.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `KeyMgmt` entry of a BSS `RSN`/`WPA` dictionary
fn key_mgmt(dict: &HashMap<String, OwnedValue>) -> Vec<String> {
    dict.get("KeyMgmt").map(ov_to_string_list).unwrap_or_default()
}

fn format_bssid(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
