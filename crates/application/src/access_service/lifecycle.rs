use chrono::Duration;
use serde_json::json;

use super::*;

impl AccessControlService {
    /// Changes a team member's role and capability overrides.
    ///
    /// The actor needs `ManageAccess` and must strictly outrank the new role;
    /// granting a role at or above one's own is an escalation, including on
    /// oneself. The owner's role is immutable.
    pub async fn update_access(
        &self,
        farm_id: FarmId,
        target_user_id: UserId,
        new_role: Role,
        capability_overrides: CapabilitySet,
        actor_id: UserId,
        reason: Option<String>,
    ) -> AppResult<()> {
        self.require_capability(actor_id, farm_id, Capability::ManageAccess)
            .await?;

        let mut grant = self
            .load_current_grant(farm_id, target_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "user '{target_user_id}' has no grant on farm '{farm_id}'"
                ))
            })?;

        if grant.role() == Role::Owner {
            return Err(AppError::CannotRemoveOwner(format!(
                "the owner's role on farm '{farm_id}' cannot be changed"
            )));
        }

        let actor_role = self.actor_role(farm_id, actor_id).await?;
        if !actor_role.outranks(new_role) {
            return Err(AppError::RoleEscalation(format!(
                "role '{}' is not below the actor's role '{}'",
                new_role.as_str(),
                actor_role.as_str()
            )));
        }

        let previous_role = grant.role();
        let previous_capabilities = grant.resolved_capabilities();

        let now = Utc::now();
        grant.change_role(new_role, capability_overrides, now)?;
        self.grants.save_grant(&grant).await?;

        self.cache.invalidate(target_user_id, farm_id).await?;

        self.record_audit(AuditEntry {
            target_user_id: Some(target_user_id),
            previous_role: Some(previous_role),
            new_role: Some(grant.role()),
            previous_capabilities: Some(previous_capabilities),
            new_capabilities: Some(grant.resolved_capabilities()),
            reason: reason.clone(),
            ..base_audit(farm_id, actor_id, AuditAction::RoleChanged, now)
        })
        .await;

        self.dispatch_notification(
            AccessEvent::RoleChanged,
            NotificationTarget::User(target_user_id),
            json!({
                "farm_id": farm_id,
                "previous_role": previous_role.as_str(),
                "new_role": grant.role().as_str(),
                "reason": reason,
            }),
        )
        .await;

        Ok(())
    }

    /// Revokes a team member's access. Terminal for the grant.
    pub async fn remove_access(
        &self,
        farm_id: FarmId,
        target_user_id: UserId,
        actor_id: UserId,
        reason: Option<String>,
    ) -> AppResult<()> {
        let mut grant = self
            .load_current_grant(farm_id, target_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "user '{target_user_id}' has no grant on farm '{farm_id}'"
                ))
            })?;

        // The owner check comes first: it holds regardless of the actor.
        if grant.role() == Role::Owner {
            return Err(AppError::CannotRemoveOwner(format!(
                "the owner of farm '{farm_id}' cannot be removed"
            )));
        }

        self.require_capability(actor_id, farm_id, Capability::RemoveUsers)
            .await?;

        let actor_role = self.actor_role(farm_id, actor_id).await?;
        if actor_role != Role::Owner && !actor_role.outranks(grant.role()) {
            return Err(AppError::RoleEscalation(format!(
                "actor role '{}' does not outrank target role '{}'",
                actor_role.as_str(),
                grant.role().as_str()
            )));
        }

        let previous_role = grant.role();
        let previous_capabilities = grant.resolved_capabilities();

        let now = Utc::now();
        grant.revoke(now)?;
        self.grants.save_grant(&grant).await?;

        self.cache.invalidate(target_user_id, farm_id).await?;

        self.record_audit(AuditEntry {
            target_user_id: Some(target_user_id),
            previous_role: Some(previous_role),
            previous_capabilities: Some(previous_capabilities),
            reason: reason.clone(),
            ..base_audit(farm_id, actor_id, AuditAction::AccessRevoked, now)
        })
        .await;

        self.dispatch_notification(
            AccessEvent::AccessRevoked,
            NotificationTarget::User(target_user_id),
            json!({
                "farm_id": farm_id,
                "reason": reason,
            }),
        )
        .await;

        Ok(())
    }

    /// Suspends a team member, optionally for a bounded duration.
    ///
    /// A timed suspension records its horizon but never lifts itself;
    /// `restore_access` is the only way back.
    pub async fn suspend_access(
        &self,
        farm_id: FarmId,
        target_user_id: UserId,
        actor_id: UserId,
        duration: Option<Duration>,
        reason: Option<String>,
    ) -> AppResult<()> {
        let mut grant = self
            .load_current_grant(farm_id, target_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "user '{target_user_id}' has no grant on farm '{farm_id}'"
                ))
            })?;

        if grant.role() == Role::Owner {
            return Err(AppError::CannotRemoveOwner(format!(
                "the owner of farm '{farm_id}' cannot be suspended"
            )));
        }

        self.require_capability(actor_id, farm_id, Capability::ManageAccess)
            .await?;

        let previous_capabilities = grant.resolved_capabilities();

        let now = Utc::now();
        grant.suspend(duration.map(|duration| now + duration), now)?;
        self.grants.save_grant(&grant).await?;

        self.cache.invalidate(target_user_id, farm_id).await?;

        self.record_audit(AuditEntry {
            target_user_id: Some(target_user_id),
            previous_role: Some(grant.role()),
            new_role: Some(grant.role()),
            previous_capabilities: Some(previous_capabilities),
            new_capabilities: Some(CapabilitySet::new()),
            reason: reason.clone(),
            ..base_audit(farm_id, actor_id, AuditAction::AccessSuspended, now)
        })
        .await;

        self.dispatch_notification(
            AccessEvent::AccessSuspended,
            NotificationTarget::User(target_user_id),
            json!({
                "farm_id": farm_id,
                "until": grant.expires_at().map(|until| until.to_rfc3339()),
                "reason": reason,
            }),
        )
        .await;

        Ok(())
    }

    /// Lifts a suspension; the next resolution reflects it immediately.
    pub async fn restore_access(
        &self,
        farm_id: FarmId,
        target_user_id: UserId,
        actor_id: UserId,
        reason: Option<String>,
    ) -> AppResult<()> {
        let mut grant = self
            .load_current_grant(farm_id, target_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "user '{target_user_id}' has no grant on farm '{farm_id}'"
                ))
            })?;

        self.require_capability(actor_id, farm_id, Capability::ManageAccess)
            .await?;

        let now = Utc::now();
        grant.restore(now)?;
        self.grants.save_grant(&grant).await?;

        self.cache.invalidate(target_user_id, farm_id).await?;

        self.record_audit(AuditEntry {
            target_user_id: Some(target_user_id),
            previous_role: Some(grant.role()),
            new_role: Some(grant.role()),
            previous_capabilities: Some(CapabilitySet::new()),
            new_capabilities: Some(grant.resolved_capabilities()),
            reason: reason.clone(),
            ..base_audit(farm_id, actor_id, AuditAction::AccessRestored, now)
        })
        .await;

        self.dispatch_notification(
            AccessEvent::AccessRestored,
            NotificationTarget::User(target_user_id),
            json!({
                "farm_id": farm_id,
                "reason": reason,
            }),
        )
        .await;

        Ok(())
    }
}
