use std::str::FromStr;

use farmgate_core::AppError;
use serde::{Deserialize, Serialize};

use crate::{Capability, CapabilitySet};

/// Privilege tiers for farm access, declared from least to most privileged.
///
/// The derived ordering is the role hierarchy: `Viewer < Worker < Manager <
/// Owner`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access to farm data.
    Viewer,
    /// Day-to-day flock work; may bring in other workers.
    Worker,
    /// Runs the farm team on the owner's behalf.
    Manager,
    /// The farm owner; never removable or suspendable.
    Owner,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Worker => "worker",
            Self::Manager => "manager",
            Self::Owner => "owner",
        }
    }

    /// Returns all known roles, least privileged first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[Role::Viewer, Role::Worker, Role::Manager, Role::Owner];

        ALL
    }

    /// Returns whether this role strictly outranks another.
    #[must_use]
    pub fn outranks(&self, other: Role) -> bool {
        *self > other
    }

    /// Returns the default capability set for this role.
    ///
    /// This is the permission catalog: pure data, total over all roles.
    #[must_use]
    pub fn default_capabilities(&self) -> CapabilitySet {
        let capabilities: &[Capability] = match self {
            Self::Viewer => &[Capability::ViewFarm],
            Self::Worker => &[
                Capability::ViewFarm,
                Capability::EditFlock,
                Capability::InviteWorkers,
            ],
            Self::Manager | Self::Owner => Capability::all(),
        };

        capabilities.iter().copied().collect()
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "viewer" => Ok(Self::Viewer),
            "worker" => Ok(Self::Worker),
            "manager" => Ok(Self::Manager),
            "owner" => Ok(Self::Owner),
            _ => Err(AppError::Validation(format!("unknown role value '{value}'"))),
        }
    }
}
