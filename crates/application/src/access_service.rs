//! Orchestrator for every access-affecting operation.
//!
//! All mutations follow the same sequence: authorize the actor, validate the
//! transition, persist through the store port (hard stop on failure),
//! invalidate the one affected cache key, append an audit entry, dispatch a
//! notification. Audit and notification failures are logged and never fail
//! the operation; a store failure fails it before any side effect.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use farmgate_core::{AppError, AppResult, FarmId, UserId, UserIdentity};
use farmgate_domain::{
    AccessGrant, AccessStatus, AuditAction, AuditEntry, AuditEntryId, Capability, CapabilitySet,
    Role,
};
use tracing::warn;

use crate::access_ports::{
    AccessEvent, AccessGrantRepository, AuditLogQuery, AuditLogRepository, AuditRepository,
    CacheLookup, InvitationRepository, NotificationService, NotificationTarget, PermissionCache,
};

mod invitations;
mod lifecycle;

pub use invitations::InviteInput;

/// Configuration for the access-control service.
#[derive(Debug, Clone)]
pub struct AccessControlConfig {
    /// Days an invitation stays open when the caller does not pass a ttl.
    pub invitation_ttl_days: i64,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            invitation_ttl_days: 7,
        }
    }
}

/// Team roster row returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamMember {
    /// Account holding the grant.
    pub user_id: UserId,
    /// Granted role.
    pub role: Role,
    /// Current grant status.
    pub status: AccessStatus,
}

/// Application service deciding who may act on a farm.
#[derive(Clone)]
pub struct AccessControlService {
    grants: Arc<dyn AccessGrantRepository>,
    invitations: Arc<dyn InvitationRepository>,
    cache: Arc<dyn PermissionCache>,
    audit: Arc<dyn AuditRepository>,
    audit_log: Arc<dyn AuditLogRepository>,
    notifications: Arc<dyn NotificationService>,
    config: AccessControlConfig,
}

impl AccessControlService {
    /// Creates a new service from its injected collaborators.
    #[must_use]
    pub fn new(
        grants: Arc<dyn AccessGrantRepository>,
        invitations: Arc<dyn InvitationRepository>,
        cache: Arc<dyn PermissionCache>,
        audit: Arc<dyn AuditRepository>,
        audit_log: Arc<dyn AuditLogRepository>,
        notifications: Arc<dyn NotificationService>,
        config: AccessControlConfig,
    ) -> Self {
        Self {
            grants,
            invitations,
            cache,
            audit,
            audit_log,
            notifications,
            config,
        }
    }

    /// Resolves the effective capability set for one user on one farm.
    ///
    /// Cache-first; a miss falls through to the store and repopulates the
    /// cache with the miss token. A user without an active grant resolves to
    /// the empty set. `StoreUnavailable` propagates; a stale cached set is
    /// never served in its place.
    pub async fn resolve_capabilities(
        &self,
        user_id: UserId,
        farm_id: FarmId,
    ) -> AppResult<CapabilitySet> {
        match self.cache.get(user_id, farm_id).await? {
            CacheLookup::Hit(capabilities) => Ok(capabilities),
            CacheLookup::Miss(token) => {
                let grant = self.grants.load_grant(farm_id, user_id).await?;
                let now = Utc::now();
                let capabilities = grant
                    .filter(|grant| grant.is_active(now))
                    .map(|grant| grant.resolved_capabilities())
                    .unwrap_or_default();
                self.cache
                    .put(user_id, farm_id, capabilities.clone(), token)
                    .await?;
                Ok(capabilities)
            }
        }
    }

    /// Returns whether the user currently holds the capability on the farm.
    pub async fn check_capability(
        &self,
        user_id: UserId,
        farm_id: FarmId,
        capability: Capability,
    ) -> AppResult<bool> {
        Ok(self
            .resolve_capabilities(user_id, farm_id)
            .await?
            .contains(&capability))
    }

    /// Ensures the user holds the capability on the farm.
    pub async fn require_capability(
        &self,
        user_id: UserId,
        farm_id: FarmId,
        capability: Capability,
    ) -> AppResult<()> {
        if self.check_capability(user_id, farm_id, capability).await? {
            return Ok(());
        }

        Err(AppError::PermissionDenied(format!(
            "user '{user_id}' is missing capability '{}' on farm '{farm_id}'",
            capability.as_str()
        )))
    }

    /// Returns the farm roster: every non-revoked grant with role and status.
    pub async fn list_team(&self, farm_id: FarmId) -> AppResult<Vec<TeamMember>> {
        let grants = self.grants.list_grants_for_farm(farm_id).await?;

        Ok(grants
            .into_iter()
            .filter(|grant| grant.status() != AccessStatus::Revoked)
            .map(|grant| TeamMember {
                user_id: grant.user_id(),
                role: grant.role(),
                status: grant.status(),
            })
            .collect())
    }

    /// Returns recent audit entries for the farm.
    pub async fn list_audit_log(
        &self,
        farm_id: FarmId,
        actor_id: UserId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditEntry>> {
        self.require_capability(actor_id, farm_id, Capability::ViewAuditLog)
            .await?;

        self.audit_log.list_recent_entries(farm_id, query).await
    }

    /// Loads the current (non-revoked) grant for a pair; a revoked grant is
    /// logically deleted and reads as absent.
    async fn load_current_grant(
        &self,
        farm_id: FarmId,
        user_id: UserId,
    ) -> AppResult<Option<AccessGrant>> {
        Ok(self
            .grants
            .load_grant(farm_id, user_id)
            .await?
            .filter(|grant| grant.status() != AccessStatus::Revoked))
    }

    /// Returns the actor's role from their active grant.
    async fn actor_role(&self, farm_id: FarmId, user_id: UserId) -> AppResult<Role> {
        let grant = self.grants.load_grant(farm_id, user_id).await?;

        match grant {
            Some(grant) if grant.is_active(Utc::now()) => Ok(grant.role()),
            _ => Err(AppError::PermissionDenied(format!(
                "user '{user_id}' has no active access to farm '{farm_id}'"
            ))),
        }
    }

    /// Appends an audit entry; failure is logged for reconciliation and never
    /// fails the operation.
    async fn record_audit(&self, entry: AuditEntry) {
        if let Err(error) = self.audit.append_entry(entry).await {
            warn!(%error, "failed to append audit entry");
        }
    }

    /// Dispatches a notification; failure is logged and never fails the
    /// operation.
    async fn dispatch_notification(
        &self,
        event: AccessEvent,
        recipient: NotificationTarget,
        payload: serde_json::Value,
    ) {
        if let Err(error) = self.notifications.notify(event, recipient, payload).await {
            warn!(%error, event = event.as_str(), "failed to dispatch notification");
        }
    }
}

/// Audit entry with the shared fields filled and everything else unset.
fn base_audit(
    farm_id: FarmId,
    actor_user_id: UserId,
    action: AuditAction,
    timestamp: DateTime<Utc>,
) -> AuditEntry {
    AuditEntry {
        id: AuditEntryId::new(),
        farm_id,
        target_user_id: None,
        target_email: None,
        actor_user_id,
        action,
        previous_role: None,
        new_role: None,
        previous_capabilities: None,
        new_capabilities: None,
        reason: None,
        timestamp,
    }
}
