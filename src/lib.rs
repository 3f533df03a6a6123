//! Switch a single wireless interface between client mode (wpa_supplicant)
//! and hotspot mode (hostapd + dnsmasq), and turn the services' D-Bus
//! notifications into a small vocabulary of events that callbacks subscribe to.

pub mod auth;
pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod monitor;
pub mod network;

#[cfg(test)]
mod testing;

pub use control::{ModeController, Mode, SharedController};
pub use error::{MonitorError, WifiError, WifiResult};
pub use event::{NormalizedEvent, Payload};
