use std::str::FromStr;

use chrono::{DateTime, Utc};
use farmgate_core::{AppError, AppResult, FarmId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CapabilitySet, Role};

/// Unique identifier for an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
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

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status of an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// The grant is in force.
    Accepted,
    /// The grant is paused; capabilities resolve to nothing.
    Suspended,
    /// Terminal. The grant is logically deleted and never reused.
    Revoked,
}

impl AccessStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
        }
    }
}

impl FromStr for AccessStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "accepted" => Ok(Self::Accepted),
            "suspended" => Ok(Self::Suspended),
            "revoked" => Ok(Self::Revoked),
            _ => Err(AppError::Validation(format!(
                "unknown access status value '{value}'"
            ))),
        }
    }
}

/// One user's standing on one farm.
///
/// At most one non-revoked grant exists per (farm, user) pair; the service
/// enforces that at acceptance time. Transitions go through the methods below,
/// which reject anything leaving a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    id: GrantId,
    farm_id: FarmId,
    user_id: UserId,
    role: Role,
    capability_overrides: CapabilitySet,
    status: AccessStatus,
    granted_by: UserId,
    accepted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Creates an accepted grant, as minted when an invitation is accepted.
    #[must_use]
    pub fn new(
        farm_id: FarmId,
        user_id: UserId,
        role: Role,
        capability_overrides: CapabilitySet,
        granted_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GrantId::new(),
            farm_id,
            user_id,
            role,
            capability_overrides,
            status: AccessStatus::Accepted,
            granted_by,
            accepted_at: now,
            expires_at: None,
            updated_at: now,
        }
    }

    /// Returns the stable grant identifier.
    #[must_use]
    pub fn id(&self) -> GrantId {
        self.id
    }

    /// Returns the farm this grant belongs to.
    #[must_use]
    pub fn farm_id(&self) -> FarmId {
        self.farm_id
    }

    /// Returns the user holding the grant.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the explicit capability overrides; empty means role defaults.
    #[must_use]
    pub fn capability_overrides(&self) -> &CapabilitySet {
        &self.capability_overrides
    }

    /// Returns the current lifecycle status.
    #[must_use]
    pub fn status(&self) -> AccessStatus {
        self.status
    }

    /// Returns the actor that created the grant.
    #[must_use]
    pub fn granted_by(&self) -> UserId {
        self.granted_by
    }

    /// Returns when the invitation behind this grant was accepted.
    #[must_use]
    pub fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }

    /// Returns the suspension horizon, if a timed suspension set one.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the last mutation timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the grant currently confers access.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == AccessStatus::Accepted && self.expires_at.is_none_or(|limit| now < limit)
    }

    /// Returns the effective capability set: overrides if present, else the
    /// role's defaults from the catalog.
    #[must_use]
    pub fn resolved_capabilities(&self) -> CapabilitySet {
        if self.capability_overrides.is_empty() {
            self.role.default_capabilities()
        } else {
            self.capability_overrides.clone()
        }
    }

    /// Rewrites the role and capability overrides.
    pub fn change_role(
        &mut self,
        new_role: Role,
        capability_overrides: CapabilitySet,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_not_revoked("change role")?;

        self.role = new_role;
        self.capability_overrides = capability_overrides;
        self.updated_at = now;
        Ok(())
    }

    /// Pauses the grant, optionally until a given instant.
    pub fn suspend(&mut self, until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != AccessStatus::Accepted {
            return Err(AppError::InvalidTransition(format!(
                "cannot suspend a grant in status '{}'",
                self.status.as_str()
            )));
        }

        self.status = AccessStatus::Suspended;
        self.expires_at = until;
        self.updated_at = now;
        Ok(())
    }

    /// Lifts a suspension and clears any suspension horizon.
    pub fn restore(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != AccessStatus::Suspended {
            return Err(AppError::InvalidTransition(format!(
                "cannot restore a grant in status '{}'",
                self.status.as_str()
            )));
        }

        self.status = AccessStatus::Accepted;
        self.expires_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Revokes the grant. Terminal; the (farm, user) pair gets a fresh grant
    /// id if access is ever granted again.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_not_revoked("revoke")?;

        self.status = AccessStatus::Revoked;
        self.expires_at = None;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_not_revoked(&self, operation: &str) -> AppResult<()> {
        if self.status == AccessStatus::Revoked {
            return Err(AppError::InvalidTransition(format!(
                "cannot {operation}: grant '{}' is revoked",
                self.id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use farmgate_core::{AppError, FarmId, UserId};

    use super::{AccessGrant, AccessStatus};
    use crate::{Capability, CapabilitySet, Role};

    fn worker_grant() -> AccessGrant {
        AccessGrant::new(
            FarmId::new(),
            UserId::new(),
            Role::Worker,
            CapabilitySet::new(),
            UserId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn new_grant_is_active_with_role_defaults() {
        let grant = worker_grant();
        assert!(grant.is_active(Utc::now()));
        assert_eq!(
            grant.resolved_capabilities(),
            Role::Worker.default_capabilities()
        );
    }

    #[test]
    fn overrides_replace_role_defaults() {
        let mut grant = worker_grant();
        let overrides: CapabilitySet = [Capability::ViewFarm].into_iter().collect();
        let changed = grant.change_role(Role::Worker, overrides.clone(), Utc::now());
        assert!(changed.is_ok());
        assert_eq!(grant.resolved_capabilities(), overrides);
    }

    #[test]
    fn suspended_grant_is_inactive_until_restored() {
        let mut grant = worker_grant();
        let now = Utc::now();
        assert!(grant.suspend(Some(now + Duration::days(1)), now).is_ok());
        assert!(!grant.is_active(now));
        assert!(grant.restore(now).is_ok());
        assert!(grant.is_active(now));
        assert_eq!(grant.expires_at(), None);
    }

    #[test]
    fn suspending_twice_is_an_invalid_transition() {
        let mut grant = worker_grant();
        let now = Utc::now();
        assert!(grant.suspend(None, now).is_ok());
        assert!(matches!(
            grant.suspend(None, now),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn restore_requires_a_suspension() {
        let mut grant = worker_grant();
        assert!(matches!(
            grant.restore(Utc::now()),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn revoked_grant_admits_no_further_transitions() {
        let mut grant = worker_grant();
        let now = Utc::now();
        assert!(grant.revoke(now).is_ok());
        assert_eq!(grant.status(), AccessStatus::Revoked);
        assert!(matches!(
            grant.change_role(Role::Viewer, CapabilitySet::new(), now),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            grant.suspend(None, now),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            grant.revoke(now),
            Err(AppError::InvalidTransition(_))
        ));
    }
}
