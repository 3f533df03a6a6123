use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use tracing::debug;

use crate::monitor::vocabulary::Vocabulary;

// ─── Embedded Default ────────────────────────────────────────────────────
/// Baked into the binary; used whenever no config file exists on disk.
const DEFAULT_CONFIG_TOML: &str = include_str!("../default_config.toml");

pub const DEFAULT_CONFIG_PATH: &str = "/etc/wifictl/config.toml";

// ─── TOML Structs ───────────────────────────────────────────────────────

/// Root configuration: parsed from TOML, then overridden by CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub units: UnitsConfig,
    #[serde(default)]
    pub connect: ConnectConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub interface: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub p2p_supplicant_config: PathBuf,
    pub hostapd_config: PathBuf,
    pub hostname: PathBuf,
}

/// systemd units backing each service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnitsConfig {
    pub client: String,
    pub hotspot: String,
    pub dns: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub vocabulary: Vocabulary,
}

// ─── Defaults ───────────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML)
            .expect("BUG: embedded default_config.toml is invalid TOML")
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            interface: "wlan0".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            p2p_supplicant_config: "/etc/wpa_supplicant/p2p_supplicant.conf".into(),
            hostapd_config: "/etc/hostapd/hostapd.conf".into(),
            hostname: "/etc/hostname".into(),
        }
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            client: "wpa_supplicant.service".into(),
            hotspot: "hostapd.service".into(),
            dns: "dnsmasq.service".into(),
        }
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Config {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect.timeout_secs)
    }
}

/// Command line values layered over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interface: Option<String>,
    pub log_level: Option<String>,
}

// ─── Loader ─────────────────────────────────────────────────────────────

/// Read `path` (or the default location), falling back to the embedded
/// defaults when the file does not exist, then apply CLI overrides.
///
/// An explicitly given path that does not exist is an error.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

    let mut config = match std::fs::read_to_string(path) {
        Ok(toml_str) => toml::from_str(&toml_str)
            .wrap_err_with(|| format!("Failed to parse config at {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            debug!("No config at {}, using defaults", path.display());
            Config::default()
        }
        Err(e) => {
            return Err(e)
                .wrap_err_with(|| format!("Failed to read config from {}", path.display()))
        }
    };

    // ── CLI overrides ───────────────────────────────────────────────
    if let Some(ref iface) = overrides.interface {
        config.general.interface = iface.clone();
    }
    if let Some(ref level) = overrides.log_level {
        config.general.log_level = level.clone();
    }

    Ok(config)
}

/// Returns the embedded default config TOML string.
pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}
