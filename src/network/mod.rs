pub mod conf;
pub mod dbus_proxies;
pub mod facade;
pub mod hostap;
pub mod interface;
pub mod supplicant;
pub mod systemd;
pub mod types;

pub use facade::{AccessPoint, ClientLink, Interface, ServiceControl};
pub use hostap::HostAp;
pub use interface::WirelessInterface;
pub use supplicant::Supplicant;
pub use types::*;
