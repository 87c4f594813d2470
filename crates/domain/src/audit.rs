use std::str::FromStr;

use chrono::{DateTime, Utc};
use farmgate_core::{AppError, FarmId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CapabilitySet, Role};

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(Uuid);

impl AuditEntryId {
    /// Creates a new random audit entry identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an audit entry identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable audit actions emitted by access-control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when an invitation is created.
    Invited,
    /// Emitted when an invitation is accepted and a grant is created.
    InvitationAccepted,
    /// Emitted when an invitation is rejected by the invitee.
    InvitationRejected,
    /// Emitted when an invitation is cancelled by the inviter.
    InvitationCancelled,
    /// Emitted when an expired invitation is transitioned on access.
    InvitationExpired,
    /// Emitted when a grant's role or capabilities change.
    RoleChanged,
    /// Emitted when a grant is revoked.
    AccessRevoked,
    /// Emitted when a grant is suspended.
    AccessSuspended,
    /// Emitted when a suspension is lifted.
    AccessRestored,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invited => "invited",
            Self::InvitationAccepted => "invitation_accepted",
            Self::InvitationRejected => "invitation_rejected",
            Self::InvitationCancelled => "invitation_cancelled",
            Self::InvitationExpired => "invitation_expired",
            Self::RoleChanged => "role_changed",
            Self::AccessRevoked => "access_revoked",
            Self::AccessSuspended => "access_suspended",
            Self::AccessRestored => "access_restored",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "invited" => Ok(Self::Invited),
            "invitation_accepted" => Ok(Self::InvitationAccepted),
            "invitation_rejected" => Ok(Self::InvitationRejected),
            "invitation_cancelled" => Ok(Self::InvitationCancelled),
            "invitation_expired" => Ok(Self::InvitationExpired),
            "role_changed" => Ok(Self::RoleChanged),
            "access_revoked" => Ok(Self::AccessRevoked),
            "access_suspended" => Ok(Self::AccessSuspended),
            "access_restored" => Ok(Self::AccessRestored),
            _ => Err(AppError::Validation(format!(
                "unknown audit action value '{value}'"
            ))),
        }
    }
}

/// Immutable record of one access-affecting action.
///
/// Entries are append-only: nothing in this subsystem mutates or deletes one,
/// and they outlive the grants and invitations they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Stable entry identifier.
    pub id: AuditEntryId,
    /// Farm scope for the entry.
    pub farm_id: FarmId,
    /// Account the action was aimed at, when resolved.
    pub target_user_id: Option<UserId>,
    /// Invitee address, for invitations not yet tied to an account.
    pub target_email: Option<String>,
    /// Actor that performed the action.
    pub actor_user_id: UserId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Role before the action, when a role was affected.
    pub previous_role: Option<Role>,
    /// Role after the action, when a role was affected.
    pub new_role: Option<Role>,
    /// Capability set before the action, when capabilities were affected.
    pub previous_capabilities: Option<CapabilitySet>,
    /// Capability set after the action, when capabilities were affected.
    pub new_capabilities: Option<CapabilitySet>,
    /// Free-text reason supplied by the actor.
    pub reason: Option<String>,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::AuditAction;

    #[test]
    fn audit_action_roundtrip_storage_value() {
        let action = AuditAction::AccessSuspended;
        let restored = AuditAction::from_str(action.as_str());
        assert_eq!(restored.ok(), Some(action));
    }

    #[test]
    fn unknown_audit_action_is_rejected() {
        assert!(AuditAction::from_str("access_granted_twice").is_err());
    }
}
