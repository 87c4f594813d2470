use async_trait::async_trait;
use farmgate_core::{AppResult, UserId};
use farmgate_domain::EmailAddress;

/// Access-control events pushed to the notification collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEvent {
    /// An invitation was created and should be delivered to the invitee.
    InvitationSent,
    /// The invitee accepted; the inviter should hear about it.
    InvitationAccepted,
    /// The invitee declined.
    InvitationRejected,
    /// The inviter withdrew the invitation.
    InvitationCancelled,
    /// A team member's role or capabilities changed.
    RoleChanged,
    /// A team member's access was revoked.
    AccessRevoked,
    /// A team member's access was suspended.
    AccessSuspended,
    /// A suspension was lifted.
    AccessRestored,
}

impl AccessEvent {
    /// Returns a stable wire value for this event.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvitationSent => "invitation_sent",
            Self::InvitationAccepted => "invitation_accepted",
            Self::InvitationRejected => "invitation_rejected",
            Self::InvitationCancelled => "invitation_cancelled",
            Self::RoleChanged => "role_changed",
            Self::AccessRevoked => "access_revoked",
            Self::AccessSuspended => "access_suspended",
            Self::AccessRestored => "access_restored",
        }
    }
}

/// Delivery target for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    /// A known account.
    User(UserId),
    /// An address not yet tied to an account (fresh invitees).
    Email(EmailAddress),
}

/// Port for fire-and-forget notification delivery.
///
/// The service logs failures and keeps going; delivery never gates an
/// access-control operation.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Delivers one notification.
    async fn notify(
        &self,
        event: AccessEvent,
        recipient: NotificationTarget,
        payload: serde_json::Value,
    ) -> AppResult<()>;
}
