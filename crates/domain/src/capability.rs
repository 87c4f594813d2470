use std::collections::BTreeSet;
use std::str::FromStr;

use farmgate_core::AppError;
use serde::{Deserialize, Serialize};

/// Resolved set of capabilities held by one user on one farm.
pub type CapabilitySet = BTreeSet<Capability>;

/// Atomic named rights checked by the access-control service.
///
/// The set is closed and exhaustively matched so the compiler catches any
/// capability the authorization rules fail to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Allows reading farm details and the team roster.
    ViewFarm,
    /// Allows editing farm details.
    EditFarm,
    /// Allows editing flock records.
    EditFlock,
    /// Allows inviting users at any role the inviter outranks.
    InviteUsers,
    /// Allows inviting users at worker level or below.
    InviteWorkers,
    /// Allows revoking another user's access.
    RemoveUsers,
    /// Allows changing roles and suspending or restoring access.
    ManageAccess,
    /// Allows reading the farm audit log.
    ViewAuditLog,
}

impl Capability {
    /// Returns a stable storage value for this capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewFarm => "farm.view",
            Self::EditFarm => "farm.edit",
            Self::EditFlock => "flock.edit",
            Self::InviteUsers => "access.invite",
            Self::InviteWorkers => "access.invite_workers",
            Self::RemoveUsers => "access.remove",
            Self::ManageAccess => "access.manage",
            Self::ViewAuditLog => "audit.view",
        }
    }

    /// Returns all known capabilities.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Capability] = &[
            Capability::ViewFarm,
            Capability::EditFarm,
            Capability::EditFlock,
            Capability::InviteUsers,
            Capability::InviteWorkers,
            Capability::RemoveUsers,
            Capability::ManageAccess,
            Capability::ViewAuditLog,
        ];

        ALL
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "farm.view" => Ok(Self::ViewFarm),
            "farm.edit" => Ok(Self::EditFarm),
            "flock.edit" => Ok(Self::EditFlock),
            "access.invite" => Ok(Self::InviteUsers),
            "access.invite_workers" => Ok(Self::InviteWorkers),
            "access.remove" => Ok(Self::RemoveUsers),
            "access.manage" => Ok(Self::ManageAccess),
            "audit.view" => Ok(Self::ViewAuditLog),
            _ => Err(AppError::Validation(format!(
                "unknown capability value '{value}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Capability;

    #[test]
    fn capability_roundtrip_storage_value() {
        for capability in Capability::all() {
            let restored = Capability::from_str(capability.as_str());
            assert_eq!(restored.ok(), Some(*capability));
        }
    }

    #[test]
    fn unknown_capability_is_rejected() {
        let parsed = Capability::from_str("farm.unknown");
        assert!(parsed.is_err());
    }
}
