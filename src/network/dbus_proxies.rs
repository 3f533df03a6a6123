// D-Bus proxy trait definitions for systemd and wpa_supplicant interfaces.
// These use zbus's #[proxy] macro to auto-generate typed async clients.

use std::collections::HashMap;
use zbus::proxy;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

pub const SYSTEMD_SERVICE: &str = "org.freedesktop.systemd1";
pub const DNSMASQ_SERVICE: &str = "uk.org.thekelleys.dnsmasq";
pub const DNSMASQ_PATH: &str = "/uk/org/thekelleys/dnsmasq";

// ── systemd Manager ───────────────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.systemd1.Manager",
    default_service = "org.freedesktop.systemd1",
    default_path = "/org/freedesktop/systemd1"
)]
pub trait SystemdManager {
    /// Enable unit lifecycle signals for this client
    fn subscribe(&self) -> zbus::Result<()>;

    /// Disable unit lifecycle signals for this client
    fn unsubscribe(&self) -> zbus::Result<()>;

    /// Start a unit, returns the job path
    fn start_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;

    fn stop_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;

    fn restart_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;

    /// Object path of a loaded unit
    fn get_unit(&self, name: &str) -> zbus::Result<OwnedObjectPath>;
}

// ── systemd Unit ──────────────────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.systemd1.Unit",
    default_service = "org.freedesktop.systemd1"
)]
pub trait SystemdUnit {
    /// "active", "activating", "deactivating", "inactive", "failed", ...
    #[zbus(property)]
    fn active_state(&self) -> zbus::Result<String>;

    /// Unit-type specific state, e.g. "running", "dead"
    #[zbus(property)]
    fn sub_state(&self) -> zbus::Result<String>;
}

// ── wpa_supplicant root object ────────────────────────────────────────

#[proxy(
    interface = "fi.w1.wpa_supplicant1",
    default_service = "fi.w1.wpa_supplicant1",
    default_path = "/fi/w1/wpa_supplicant1"
)]
pub trait WpaSupplicant {
    /// Resolve the object path of an interface managed by the supplicant
    fn get_interface(&self, ifname: &str) -> zbus::Result<OwnedObjectPath>;
}

// ── wpa_supplicant Interface ──────────────────────────────────────────

#[proxy(
    interface = "fi.w1.wpa_supplicant1.Interface",
    default_service = "fi.w1.wpa_supplicant1"
)]
pub trait WpaInterface {
    /// Request a scan
    fn scan(&self, args: HashMap<&str, Value<'_>>) -> zbus::Result<()>;

    fn disconnect(&self) -> zbus::Result<()>;

    /// Add a network block, returns its path
    fn add_network(&self, args: HashMap<&str, Value<'_>>) -> zbus::Result<OwnedObjectPath>;

    fn remove_network(&self, path: &ObjectPath<'_>) -> zbus::Result<()>;

    /// Select a network and start associating with it
    fn select_network(&self, path: &ObjectPath<'_>) -> zbus::Result<()>;

    /// "disconnected", "scanning", "associating", "completed", ...
    #[zbus(property)]
    fn state(&self) -> zbus::Result<String>;

    #[zbus(property, name = "CurrentBSS")]
    fn current_bss(&self) -> zbus::Result<OwnedObjectPath>;

    #[zbus(property)]
    fn networks(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    #[zbus(property, name = "BSSs")]
    fn bsss(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// Interface-specific property change notification
    #[zbus(signal)]
    fn properties_changed(&self, properties: HashMap<String, OwnedValue>) -> zbus::Result<()>;
}

// ── wpa_supplicant Network ────────────────────────────────────────────

#[proxy(
    interface = "fi.w1.wpa_supplicant1.Network",
    default_service = "fi.w1.wpa_supplicant1"
)]
pub trait WpaNetwork {
    /// Network block settings; string values keep their config quoting
    #[zbus(property)]
    fn properties(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

// ── wpa_supplicant BSS ────────────────────────────────────────────────

#[proxy(
    interface = "fi.w1.wpa_supplicant1.BSS",
    default_service = "fi.w1.wpa_supplicant1"
)]
pub trait WpaBss {
    #[zbus(property, name = "SSID")]
    fn ssid(&self) -> zbus::Result<Vec<u8>>;

    #[zbus(property, name = "BSSID")]
    fn bssid(&self) -> zbus::Result<Vec<u8>>;

    /// Signal level in dBm
    #[zbus(property)]
    fn signal(&self) -> zbus::Result<i16>;

    /// Frequency in MHz
    #[zbus(property)]
    fn frequency(&self) -> zbus::Result<u16>;

    #[zbus(property)]
    fn privacy(&self) -> zbus::Result<bool>;

    #[zbus(property, name = "RSN")]
    fn rsn(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    #[zbus(property, name = "WPA")]
    fn wpa(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

/// Object path systemd assigns to a unit, e.g. `hostapd.service` becomes
/// `/org/freedesktop/systemd1/unit/hostapd_2eservice`.
pub fn unit_object_path(unit: &str) -> String {
    let mut path = String::from("/org/freedesktop/systemd1/unit/");
    for (i, b) in unit.bytes().enumerate() {
        if b.is_ascii_alphabetic() || (b.is_ascii_digit() && i > 0) {
            path.push(b as char);
        } else {
            path.push_str(&format!("_{:02x}", b));
        }
    }
    path
}
