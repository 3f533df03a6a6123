use std::str::FromStr;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tokio::fs;
use tokio::process::Command;
use tracing::info;
use zbus::Connection;

use crate::error::{WifiError, WifiResult};
use crate::network::facade::Interface;
use crate::network::systemd::Unit;

/// Radio and addressing control of the wireless interface.
pub struct WirelessInterface {
    interface: String,
    dns: Unit,
}

impl WirelessInterface {
    pub fn new(connection: Connection, interface: impl Into<String>, dns_unit: &str) -> Self {
        Self {
            interface: interface.into(),
            dns: Unit::new(connection, dns_unit),
        }
    }
}

#[async_trait]
impl Interface for WirelessInterface {
    async fn block(&self) -> WifiResult<()> {
        run("rfkill", &["block", "wifi"]).await?;
        info!("Radio blocked");
        Ok(())
    }

    async fn unblock(&self) -> WifiResult<()> {
        run("rfkill", &["unblock", "wifi"]).await?;
        info!("Radio unblocked");
        Ok(())
    }

    async fn device_ip(&self) -> WifiResult<Option<String>> {
        ipv4_address(&self.interface).await
    }

    async fn restart_dns(&self) -> WifiResult<()> {
        self.dns.restart().await
    }
}

async fn run(program: &str, args: &[&str]) -> WifiResult<String> {
    let output = Command::new(program).args(args).output().await?;
    if !output.status.success() {
        return Err(WifiError::Command(format!(
            "{} {}: {}",
            program,
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// First IPv4 address assigned to `iface`
pub async fn ipv4_address(iface: &str) -> WifiResult<Option<String>> {
    let out = run("ip", &["-4", "-o", "addr", "show", "dev", iface]).await?;
    Ok(parse_ipv4(&out).map(|net| net.addr().to_string()))
}

/// Parse the `inet a.b.c.d/len` field of `ip -o addr` output
pub fn parse_ipv4(output: &str) -> Option<Ipv4Net> {
    let mut words = output.split_whitespace();
    while let Some(word) = words.next() {
        if word == "inet" {
            return words.next().and_then(|cidr| Ipv4Net::from_str(cidr).ok());
        }
    }
    None
}

/// Reads /sys/class/net/<iface>/address
pub async fn read_mac(iface: &str) -> WifiResult<String> {
    let path = format!("/sys/class/net/{}/address", iface);
    let content = fs::read_to_string(&path).await?;
    let mac = content.trim();
    if mac.is_empty() {
        return Err(WifiError::Property(format!("no hardware address for {iface}")));
    }
    Ok(mac.to_string())
}
