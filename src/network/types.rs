use std::fmt;

use serde::{Deserialize, Serialize};

/// Security type of a scanned network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    Open,
    WEP,
    WPA,
    WPA2,
    WPA3,
    WPA2Enterprise,
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::WEP => write!(f, "WEP"),
            Self::WPA => write!(f, "WPA"),
            Self::WPA2 => write!(f, "WPA2"),
            Self::WPA3 => write!(f, "WPA3"),
            Self::WPA2Enterprise => write!(f, "WPA2-EAP"),
        }
    }
}

impl SecurityType {
    /// Derive the security type from the key management lists wpa_supplicant
    /// reports in a BSS's `RSN` and `WPA` dictionaries.
    pub fn from_key_mgmt(rsn: &[String], wpa: &[String], privacy: bool) -> Self {
        let has = |list: &[String], needle: &str| list.iter().any(|k| k.contains(needle));

        if !rsn.is_empty() {
            if has(rsn, "eap") {
                return Self::WPA2Enterprise;
            }
            if has(rsn, "sae") {
                return Self::WPA3;
            }
            return Self::WPA2;
        }
        if !wpa.is_empty() {
            if has(wpa, "eap") {
                return Self::WPA2Enterprise;
            }
            return Self::WPA;
        }
        if privacy {
            return Self::WEP;
        }
        Self::Open
    }
}

/// Compute WiFi channel from frequency in MHz
pub fn channel_from_frequency(freq: u32) -> u32 {
    match freq {
        2484 => 14,
        f if (2412..=2472).contains(&f) => (f - 2407) / 5,
        // 5 GHz: channel = (freq - 5000) / 5
        f if (5000..=5900).contains(&f) => (f - 5000) / 5,
        // 6 GHz: channel = (freq - 5950) / 5
        f if (5950..=7125).contains(&f) => (f - 5950) / 5,
        _ => 0,
    }
}

/// A network seen in the last scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub ssid: String,
    pub bssid: String,
    /// Signal level in dBm
    pub signal: i16,
    pub frequency: u32,
    pub channel: u32,
    pub security: SecurityType,
}

/// Parameters for a network added to the supplicant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub ssid: String,
    /// WPA passphrase; `None` for open networks
    pub password: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// A network the supplicant has been configured with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedNetwork {
    pub ssid: String,
    /// Supplicant object path of the network block
    pub path: String,
}

/// Snapshot of the client link as reported by the supplicant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientStatus {
    /// Raw supplicant state, e.g. `completed`
    pub state: String,
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
}

impl ClientStatus {
    pub fn is_connected(&self) -> bool {
        self.state == "completed"
    }
}

/// Snapshot of the access point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HotspotStatus {
    pub ssid: String,
}

/// A DHCP peer of the access point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub name: String,
    pub ip: String,
    pub mac: String,
}
