use tracing::{info, warn};

/// Privilege level of the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionLevel {
    /// Root: units, rfkill and config files are all writable
    Full,
    /// Anything else; mutating commands rely on polkit and file permissions
    Limited,
}

impl PermissionLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Full => "Full Access",
            Self::Limited => "Limited",
        }
    }

    pub fn from_euid(euid: u32) -> Self {
        if euid == 0 {
            Self::Full
        } else {
            Self::Limited
        }
    }
}

/// Check the effective user and warn when not running as root
pub fn check_permissions() -> PermissionLevel {
    // SAFETY: geteuid has no preconditions and cannot fail
    let level = PermissionLevel::from_euid(unsafe { libc::geteuid() });
    match level {
        PermissionLevel::Full => info!(access = level.label(), "Running as root"),
        PermissionLevel::Limited => {
            warn!(
                access = level.label(),
                "Not running as root; unit control and config writes may be denied"
            );
            warn!("Tip: run with sudo or grant polkit rights for systemd units");
        }
    }
    level
}
