//! Network role of a container and the authority gate.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Role of the process owning a container instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetRole {
    /// The host that owns the truth.
    #[default]
    Authority,
    /// A replica that predicts and forwards requests.
    Client,
    /// Standalone, unreplicated; behaves as an authority.
    None,
}

impl NetRole {
    /// Authority and standalone instances may mutate state.
    pub fn has_authority(self) -> bool {
        matches!(self, NetRole::Authority | NetRole::None)
    }

    /// Whether mutations must be forwarded instead of applied.
    pub fn is_client(self) -> bool {
        self == NetRole::Client
    }
}

/// Authority gate for server-only mutations. Logs and refuses on clients.
pub(crate) fn require_authority(role: NetRole, operation: &'static str) -> bool {
    if role.has_authority() {
        return true;
    }
    warn!(operation, ?role, "authoritative operation called without authority, ignoring");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles() {
        assert!(NetRole::Authority.has_authority());
        assert!(NetRole::None.has_authority());
        assert!(!NetRole::Client.has_authority());
        assert!(require_authority(NetRole::None, "test"));
        assert!(!require_authority(NetRole::Client, "test"));
    }
}
