use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::info;
use zbus::Connection;

use crate::error::{WifiError, WifiResult};
use crate::network::conf;
use crate::network::facade::{AccessPoint, ServiceControl};
use crate::network::interface::read_mac;
use crate::network::systemd::Unit;
use crate::network::types::HotspotStatus;

/// Access point facade: hostapd run as a systemd unit, configured through
/// its config file and the system host name file.
pub struct HostAp {
    interface: String,
    unit: Unit,
    hostapd_config: PathBuf,
    hostname_config: PathBuf,
}

impl HostAp {
    pub fn new(
        connection: Connection,
        interface: impl Into<String>,
        unit: impl Into<String>,
        hostapd_config: impl Into<PathBuf>,
        hostname_config: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interface: interface.into(),
            unit: Unit::new(connection, unit),
            hostapd_config: hostapd_config.into(),
            hostname_config: hostname_config.into(),
        }
    }
}

#[async_trait]
impl ServiceControl for HostAp {
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
impl AccessPoint for HostAp {
    async fn status(&self) -> WifiResult<HotspotStatus> {
        Ok(HotspotStatus {
            ssid: self.hotspot_ssid().await?,
        })
    }

    async fn hotspot_ssid(&self) -> WifiResult<String> {
        conf::read_value(&self.hostapd_config, "ssid").await
    }

    async fn set_hotspot_ssid(&self, ssid: &str) -> WifiResult<()> {
        conf::write_value(&self.hostapd_config, "ssid", ssid).await?;
        info!("Hotspot SSID set to '{}'", ssid);
        Ok(())
    }

    async fn set_hotspot_password(&self, password: &str) -> WifiResult<()> {
        // WPA passphrases are 8..=63 printable characters
        if !(8..=63).contains(&password.len()) {
            return Err(WifiError::Parse(format!(
                "hotspot password must be 8 to 63 characters, got {}",
                password.len()
            )));
        }
        conf::write_value(&self.hostapd_config, "wpa_passphrase", password).await
    }

    async fn host_name(&self) -> WifiResult<String> {
        let content = fs::read_to_string(&self.hostname_config).await?;
        let name = content.trim();
        if name.is_empty() {
            return Err(WifiError::Property(format!(
                "empty host name in {}",
                self.hostname_config.display()
            )));
        }
        Ok(name.to_string())
    }

    async fn set_host_name(&self, name: &str) -> WifiResult<()> {
        fs::write(&self.hostname_config, format!("{name}\n")).await?;
        info!("Host name set to '{}'", name);
        Ok(())
    }

    async fn device_mac(&self) -> WifiResult<String> {
        read_mac(&self.interface).await
    }
}
