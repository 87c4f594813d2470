use farmgate_domain::{EmailAddress, Invitation, InvitationId, NewInvitation};
use serde_json::json;

use super::*;

/// Input payload for creating an invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteInput {
    /// Address the invitation is delivered to.
    pub invitee_email: String,
    /// Role the invitee will hold on acceptance.
    pub proposed_role: Role,
    /// Explicit capability overrides; empty means role defaults.
    pub custom_capabilities: CapabilitySet,
    /// Free-text message shown to the invitee.
    pub message: Option<String>,
    /// Days the invitation stays open; `None` uses the configured default.
    pub ttl_days: Option<i64>,
    /// Whether the caller layer gates acceptance behind an approval step.
    pub requires_approval: bool,
}

impl AccessControlService {
    /// Creates an invitation and notifies the invitee.
    ///
    /// The inviter needs the invite right matching the proposed role:
    /// `InviteUsers` covers any role the inviter strictly outranks, the
    /// narrower `InviteWorkers` covers worker level and below. At most one
    /// pending invitation may exist per (farm, address); a pending one that
    /// already expired is transitioned out of the way rather than counted.
    pub async fn invite(
        &self,
        farm_id: FarmId,
        actor: &UserIdentity,
        input: InviteInput,
    ) -> AppResult<InvitationId> {
        let invitee_email = EmailAddress::new(input.invitee_email)?;

        self.authorize_invite(farm_id, actor.user_id(), input.proposed_role)
            .await?;

        let now = Utc::now();
        if let Some(mut pending) = self
            .invitations
            .find_pending_invitation(farm_id, &invitee_email)
            .await?
        {
            if !pending.is_expired(now) {
                return Err(AppError::DuplicatePendingInvitation(format!(
                    "a pending invitation for '{invitee_email}' already exists on farm '{farm_id}'"
                )));
            }

            pending.mark_expired()?;
            self.invitations.save_invitation(&pending).await?;
            self.record_audit(AuditEntry {
                target_email: Some(pending.invitee_email().as_str().to_owned()),
                ..base_audit(farm_id, actor.user_id(), AuditAction::InvitationExpired, now)
            })
            .await;
        }

        let ttl_days = input.ttl_days.unwrap_or(self.config.invitation_ttl_days);
        let invitation = Invitation::new(
            NewInvitation {
                farm_id,
                inviter_user_id: actor.user_id(),
                invitee_email: invitee_email.clone(),
                invitee_user_id: None,
                proposed_role: input.proposed_role,
                custom_capabilities: input.custom_capabilities,
                message: input.message,
                requires_approval: input.requires_approval,
                ttl: chrono::Duration::days(ttl_days),
            },
            now,
        );

        self.invitations.save_invitation(&invitation).await?;

        self.record_audit(AuditEntry {
            target_email: Some(invitee_email.as_str().to_owned()),
            new_role: Some(invitation.proposed_role()),
            new_capabilities: Some(invitation.granted_capabilities()),
            ..base_audit(farm_id, actor.user_id(), AuditAction::Invited, now)
        })
        .await;

        self.dispatch_notification(
            AccessEvent::InvitationSent,
            NotificationTarget::Email(invitee_email),
            json!({
                "farm_id": farm_id,
                "invitation_id": invitation.id(),
                "inviter": actor.display_name(),
                "proposed_role": invitation.proposed_role().as_str(),
                "message": invitation.message(),
                "requires_approval": invitation.requires_approval(),
                "expires_at": invitation.expires_at().to_rfc3339(),
            }),
        )
        .await;

        Ok(invitation.id())
    }

    /// Accepts or rejects an invitation on behalf of the invitee.
    ///
    /// Expiry is evaluated lazily here: a pending invitation past its horizon
    /// is persisted as expired before the `Expired` error is returned, so a
    /// retry reports `InvalidTransition` like any other terminal response.
    pub async fn respond_to_invitation(
        &self,
        invitation_id: InvitationId,
        actor: &UserIdentity,
        accept: bool,
        reason: Option<String>,
    ) -> AppResult<()> {
        let invitation = self
            .invitations
            .load_invitation(invitation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("invitation '{invitation_id}' does not exist"))
            })?;

        if invitation.status().is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "invitation '{invitation_id}' is already {}",
                invitation.status().as_str()
            )));
        }

        let now = Utc::now();
        if invitation.is_expired(now) {
            return self.expire_invitation(invitation, actor.user_id(), now).await;
        }

        let verified_email = match actor.email() {
            Some(address) => EmailAddress::new(address)?,
            None => {
                return Err(AppError::IdentityMismatch(format!(
                    "responder has no verified email for invitation '{invitation_id}'"
                )));
            }
        };
        if &verified_email != invitation.invitee_email() {
            return Err(AppError::IdentityMismatch(format!(
                "responder email does not match the invited address for invitation \
                 '{invitation_id}'"
            )));
        }

        if accept {
            self.accept_invitation(invitation, actor.user_id(), now).await
        } else {
            self.reject_invitation(invitation, actor.user_id(), reason, now)
                .await
        }
    }

    /// Cancels a pending invitation; only the original inviter may do so.
    pub async fn cancel_invitation(
        &self,
        invitation_id: InvitationId,
        actor_id: UserId,
    ) -> AppResult<()> {
        let mut invitation = self
            .invitations
            .load_invitation(invitation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("invitation '{invitation_id}' does not exist"))
            })?;

        if invitation.inviter_user_id() != actor_id {
            return Err(AppError::PermissionDenied(format!(
                "only the inviter may cancel invitation '{invitation_id}'"
            )));
        }

        invitation.mark_cancelled()?;
        self.invitations.save_invitation(&invitation).await?;

        let now = Utc::now();
        self.record_audit(AuditEntry {
            target_email: Some(invitation.invitee_email().as_str().to_owned()),
            target_user_id: invitation.invitee_user_id(),
            ..base_audit(
                invitation.farm_id(),
                actor_id,
                AuditAction::InvitationCancelled,
                now,
            )
        })
        .await;

        self.dispatch_notification(
            AccessEvent::InvitationCancelled,
            NotificationTarget::Email(invitation.invitee_email().clone()),
            json!({
                "farm_id": invitation.farm_id(),
                "invitation_id": invitation.id(),
            }),
        )
        .await;

        Ok(())
    }

    /// Lists pending invitations for a farm.
    pub async fn list_pending_invitations(
        &self,
        farm_id: FarmId,
        actor_id: UserId,
    ) -> AppResult<Vec<Invitation>> {
        self.require_capability(actor_id, farm_id, Capability::InviteUsers)
            .await?;

        self.invitations
            .list_pending_invitations_for_farm(farm_id)
            .await
    }

    /// Checks the inviter holds an invite right covering the proposed role.
    async fn authorize_invite(
        &self,
        farm_id: FarmId,
        inviter_id: UserId,
        proposed_role: Role,
    ) -> AppResult<()> {
        let capabilities = self.resolve_capabilities(inviter_id, farm_id).await?;

        if capabilities.contains(&Capability::InviteUsers) {
            let inviter_role = self.actor_role(farm_id, inviter_id).await?;
            if inviter_role.outranks(proposed_role) {
                return Ok(());
            }
        }

        // The narrow right covers worker level and everything below it.
        if capabilities.contains(&Capability::InviteWorkers) && proposed_role <= Role::Worker {
            return Ok(());
        }

        Err(AppError::PermissionDenied(format!(
            "user '{inviter_id}' lacks an invite right covering role '{}'",
            proposed_role.as_str()
        )))
    }

    /// Persists the lazy expiry of a pending invitation and reports it.
    async fn expire_invitation(
        &self,
        mut invitation: Invitation,
        actor_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        invitation.mark_expired()?;
        self.invitations.save_invitation(&invitation).await?;

        self.record_audit(AuditEntry {
            target_email: Some(invitation.invitee_email().as_str().to_owned()),
            ..base_audit(
                invitation.farm_id(),
                actor_id,
                AuditAction::InvitationExpired,
                now,
            )
        })
        .await;

        Err(AppError::Expired(format!(
            "invitation '{}' expired at '{}'",
            invitation.id(),
            invitation.expires_at().to_rfc3339()
        )))
    }

    async fn accept_invitation(
        &self,
        mut invitation: Invitation,
        responder_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let farm_id = invitation.farm_id();

        // Any non-revoked grant blocks acceptance; a second one would break
        // the single-grant invariant (and let a suspended user slip back in).
        if let Some(existing) = self.grants.load_grant(farm_id, responder_id).await?
            && existing.status() != AccessStatus::Revoked
        {
            return Err(AppError::AlreadyHasAccess(format!(
                "user '{responder_id}' already holds a grant on farm '{farm_id}'"
            )));
        }

        let grant = AccessGrant::new(
            farm_id,
            responder_id,
            invitation.proposed_role(),
            invitation.custom_capabilities().clone(),
            invitation.inviter_user_id(),
            now,
        );

        // Grant first: if this write fails the invitation stays pending and
        // the invitee can simply retry.
        self.grants.save_grant(&grant).await?;

        invitation.mark_accepted(responder_id, now)?;
        self.invitations.save_invitation(&invitation).await?;

        self.cache.invalidate(responder_id, farm_id).await?;

        self.record_audit(AuditEntry {
            target_user_id: Some(responder_id),
            target_email: Some(invitation.invitee_email().as_str().to_owned()),
            new_role: Some(grant.role()),
            new_capabilities: Some(grant.resolved_capabilities()),
            ..base_audit(farm_id, responder_id, AuditAction::InvitationAccepted, now)
        })
        .await;

        self.dispatch_notification(
            AccessEvent::InvitationAccepted,
            NotificationTarget::User(invitation.inviter_user_id()),
            json!({
                "farm_id": farm_id,
                "invitation_id": invitation.id(),
                "invitee_user_id": responder_id,
                "role": grant.role().as_str(),
            }),
        )
        .await;

        Ok(())
    }

    async fn reject_invitation(
        &self,
        mut invitation: Invitation,
        responder_id: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        invitation.mark_rejected(responder_id, now)?;
        self.invitations.save_invitation(&invitation).await?;

        self.record_audit(AuditEntry {
            target_user_id: Some(responder_id),
            target_email: Some(invitation.invitee_email().as_str().to_owned()),
            reason: reason.clone(),
            ..base_audit(
                invitation.farm_id(),
                responder_id,
                AuditAction::InvitationRejected,
                now,
            )
        })
        .await;

        self.dispatch_notification(
            AccessEvent::InvitationRejected,
            NotificationTarget::User(invitation.inviter_user_id()),
            json!({
                "farm_id": invitation.farm_id(),
                "invitation_id": invitation.id(),
                "reason": reason,
            }),
        )
        .await;

        Ok(())
    }
}
