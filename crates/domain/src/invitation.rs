use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use farmgate_core::{AppError, AppResult, FarmId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CapabilitySet, EmailAddress, Role};

/// Unique identifier for an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvitationId(Uuid);

impl InvitationId {
    /// Creates a new random invitation identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an invitation identifier from an existing UUID value.
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

impl Default for InvitationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvitationId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Awaiting a response from the invitee.
    Sent,
    /// Terminal. The invitee accepted and a grant was created.
    Accepted,
    /// Terminal. The invitee declined.
    Rejected,
    /// Terminal. The inviter withdrew the offer.
    Cancelled,
    /// Terminal. The expiry horizon passed before a response.
    Expired,
}

impl InvitationStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Returns whether this status admits no further transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Sent)
    }
}

impl FromStr for InvitationStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sent" => Ok(Self::Sent),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown invitation status value '{value}'"
            ))),
        }
    }
}

/// Parameters for creating an invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    /// Farm the invitee is offered access to.
    pub farm_id: FarmId,
    /// Actor sending the invitation.
    pub inviter_user_id: UserId,
    /// Address the invitation is delivered to.
    pub invitee_email: EmailAddress,
    /// Invitee account, when the address already resolves to one.
    pub invitee_user_id: Option<UserId>,
    /// Role the invitee will hold on acceptance.
    pub proposed_role: Role,
    /// Explicit capability overrides; empty means role defaults.
    pub custom_capabilities: CapabilitySet,
    /// Free-text message shown to the invitee.
    pub message: Option<String>,
    /// Whether the caller layer gates acceptance behind an approval step.
    pub requires_approval: bool,
    /// Time the invitation stays open.
    pub ttl: Duration,
}

/// A pending, time-bounded offer of an access grant.
///
/// Exactly one terminal transition ends an invitation; acceptance is the only
/// path that mints a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    id: InvitationId,
    farm_id: FarmId,
    inviter_user_id: UserId,
    invitee_email: EmailAddress,
    invitee_user_id: Option<UserId>,
    proposed_role: Role,
    custom_capabilities: CapabilitySet,
    message: Option<String>,
    requires_approval: bool,
    status: InvitationStatus,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Creates a new invitation in the `Sent` state.
    #[must_use]
    pub fn new(input: NewInvitation, now: DateTime<Utc>) -> Self {
        Self {
            id: InvitationId::new(),
            farm_id: input.farm_id,
            inviter_user_id: input.inviter_user_id,
            invitee_email: input.invitee_email,
            invitee_user_id: input.invitee_user_id,
            proposed_role: input.proposed_role,
            custom_capabilities: input.custom_capabilities,
            message: input.message,
            requires_approval: input.requires_approval,
            status: InvitationStatus::Sent,
            created_at: now,
            expires_at: now + input.ttl,
            responded_at: None,
        }
    }

    /// Returns the stable invitation identifier.
    #[must_use]
    pub fn id(&self) -> InvitationId {
        self.id
    }

    /// Returns the farm the invitation grants access to.
    #[must_use]
    pub fn farm_id(&self) -> FarmId {
        self.farm_id
    }

    /// Returns the inviting actor.
    #[must_use]
    pub fn inviter_user_id(&self) -> UserId {
        self.inviter_user_id
    }

    /// Returns the invitee address.
    #[must_use]
    pub fn invitee_email(&self) -> &EmailAddress {
        &self.invitee_email
    }

    /// Returns the invitee account, when resolved.
    #[must_use]
    pub fn invitee_user_id(&self) -> Option<UserId> {
        self.invitee_user_id
    }

    /// Returns the role offered to the invitee.
    #[must_use]
    pub fn proposed_role(&self) -> Role {
        self.proposed_role
    }

    /// Returns the explicit capability overrides; empty means role defaults.
    #[must_use]
    pub fn custom_capabilities(&self) -> &CapabilitySet {
        &self.custom_capabilities
    }

    /// Returns the free-text message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns whether acceptance is gated behind a caller-side approval.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    /// Returns the current lifecycle status.
    #[must_use]
    pub fn status(&self) -> InvitationStatus {
        self.status
    }

    /// Returns when the invitation was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the expiry horizon.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns when the invitee responded, if they did.
    #[must_use]
    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        self.responded_at
    }

    /// Returns whether the expiry horizon has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns the capability set a grant created from this invitation gets:
    /// the custom set if non-empty, else the proposed role's defaults.
    #[must_use]
    pub fn granted_capabilities(&self) -> CapabilitySet {
        if self.custom_capabilities.is_empty() {
            self.proposed_role.default_capabilities()
        } else {
            self.custom_capabilities.clone()
        }
    }

    /// Marks the invitation accepted and records the responding account.
    pub fn mark_accepted(&mut self, responder: UserId, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_pending("accept")?;

        self.status = InvitationStatus::Accepted;
        self.invitee_user_id = Some(responder);
        self.responded_at = Some(now);
        Ok(())
    }

    /// Marks the invitation rejected.
    pub fn mark_rejected(&mut self, responder: UserId, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_pending("reject")?;

        self.status = InvitationStatus::Rejected;
        self.invitee_user_id = Some(responder);
        self.responded_at = Some(now);
        Ok(())
    }

    /// Marks the invitation cancelled by the inviter.
    pub fn mark_cancelled(&mut self) -> AppResult<()> {
        self.ensure_pending("cancel")?;

        self.status = InvitationStatus::Cancelled;
        Ok(())
    }

    /// Marks the invitation expired. Called lazily when an expired invitation
    /// is touched; there is no background sweep.
    pub fn mark_expired(&mut self) -> AppResult<()> {
        self.ensure_pending("expire")?;

        self.status = InvitationStatus::Expired;
        Ok(())
    }

    fn ensure_pending(&self, operation: &str) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "cannot {operation}: invitation '{}' is already {}",
                self.id,
                self.status.as_str()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use farmgate_core::{AppError, FarmId, UserId};

    use super::{Invitation, InvitationStatus, NewInvitation};
    use crate::{CapabilitySet, EmailAddress, Role};

    fn pending_invitation(ttl: Duration) -> Invitation {
        let email = EmailAddress::new("hand@orchard-farm.example")
            .unwrap_or_else(|_| panic!("fixture email"));
        Invitation::new(
            NewInvitation {
                farm_id: FarmId::new(),
                inviter_user_id: UserId::new(),
                invitee_email: email,
                invitee_user_id: None,
                proposed_role: Role::Worker,
                custom_capabilities: CapabilitySet::new(),
                message: None,
                requires_approval: false,
                ttl,
            },
            Utc::now(),
        )
    }

    #[test]
    fn new_invitation_is_pending_with_ttl_horizon() {
        let invitation = pending_invitation(Duration::days(7));
        assert_eq!(invitation.status(), InvitationStatus::Sent);
        assert_eq!(
            invitation.expires_at() - invitation.created_at(),
            Duration::days(7)
        );
        assert!(!invitation.is_expired(Utc::now()));
    }

    #[test]
    fn invitation_expires_after_horizon() {
        let invitation = pending_invitation(Duration::days(1));
        assert!(invitation.is_expired(Utc::now() + Duration::days(2)));
    }

    #[test]
    fn accept_records_responder_and_timestamp() {
        let mut invitation = pending_invitation(Duration::days(7));
        let responder = UserId::new();
        assert!(invitation.mark_accepted(responder, Utc::now()).is_ok());
        assert_eq!(invitation.status(), InvitationStatus::Accepted);
        assert_eq!(invitation.invitee_user_id(), Some(responder));
        assert!(invitation.responded_at().is_some());
    }

    #[test]
    fn terminal_invitation_rejects_every_transition() {
        let mut invitation = pending_invitation(Duration::days(7));
        assert!(invitation.mark_cancelled().is_ok());

        assert!(matches!(
            invitation.mark_accepted(UserId::new(), Utc::now()),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            invitation.mark_rejected(UserId::new(), Utc::now()),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            invitation.mark_expired(),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            invitation.mark_cancelled(),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn granted_capabilities_prefer_custom_set() {
        let mut invitation = pending_invitation(Duration::days(7));
        assert_eq!(
            invitation.granted_capabilities(),
            Role::Worker.default_capabilities()
        );

        invitation.custom_capabilities =
            [crate::Capability::ViewFarm].into_iter().collect();
        assert_eq!(
            invitation.granted_capabilities(),
            invitation.custom_capabilities
        );
    }
}
