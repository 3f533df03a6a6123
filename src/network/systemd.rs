use tracing::{debug, info};
use zbus::Connection;

use crate::error::WifiResult;
use crate::network::dbus_proxies::*;

/// Job mode passed to systemd: replace any queued job for the unit
const JOB_MODE: &str = "replace";

/// Start/stop control of one systemd unit over D-Bus.
#[derive(Clone)]
pub struct Unit {
    connection: Connection,
    name: String,
}

impl Unit {
    pub fn new(connection: Connection, name: impl Into<String>) -> Self {
        Self {
            connection,
            name: name.into(),
        }
    }

    /// `(ActiveState, SubState)` of the unit
    pub async fn state(&self) -> WifiResult<(String, String)> {
        let manager = SystemdManagerProxy::new(&self.connection).await?;
        let path = manager.get_unit(&self.name).await?;
        let unit = SystemdUnitProxy::builder(&self.connection)
            .path(path)?
            .build()
            .await?;
        Ok((unit.active_state().await?, unit.sub_state().await?))
    }

    /// A unit that is not loaded counts as not started
    pub async fn is_active(&self) -> bool {
        match self.state().await {
            Ok((active, _)) => active == "active",
            Err(e) => {
                debug!("Unit {} state unavailable: {}", self.name, e);
                false
            }
        }
    }

    pub async fn start(&self) -> WifiResult<()> {
        let manager = SystemdManagerProxy::new(&self.connection).await?;
        manager.start_unit(&self.name, JOB_MODE).await?;
        info!("Started {}", self.name);
        Ok(())
    }

    pub async fn stop(&self) -> WifiResult<()> {
        let manager = SystemdManagerProxy::new(&self.connection).await?;
        manager.stop_unit(&self.name, JOB_MODE).await?;
        info!("Stopped {}", self.name);
        Ok(())
    }

    pub async fn restart(&self) -> WifiResult<()> {
        let manager = SystemdManagerProxy::new(&self.connection).await?;
        manager.restart_unit(&self.name, JOB_MODE).await?;
        info!("Restarted {}", self.name);
        Ok(())
    }
}
