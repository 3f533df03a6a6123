use thiserror::Error;

/// Unified error type for the service facades
#[derive(Error, Debug)]
pub enum WifiError {
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    #[error("D-Bus fdo error: {0}")]
    DbusFdo(#[from] zbus::fdo::Error),

    #[error("D-Bus value error: {0}")]
    Value(#[from] zbus::zvariant::Error),

    /// A status property could not be read from the underlying service
    #[error("Property error: {0}")]
    Property(String),

    #[error("Network not found: {0}")]
    NotFound(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type WifiResult<T> = Result<T, WifiError>;

/// Errors raised while establishing or tearing down the bus subscriptions
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Fatal to startup; the daemon loop never runs in this state
    #[error("failed to initialize monitor: {0}")]
    Initialize(#[source] WifiError),

    /// Reported on shutdown; the loop still stops
    #[error("failed to tear down monitor: {0}")]
    Teardown(#[source] WifiError),
}

impl MonitorError {
    /// Short stable label for log fields
    pub fn as_label(&self) -> &'static str {
        match self {
            MonitorError::Initialize(_) => "monitor_initialize",
            MonitorError::Teardown(_) => "monitor_teardown",
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
