use async_trait::async_trait;
use farmgate_core::{AppResult, FarmId, UserId};
use farmgate_domain::{AccessGrant, EmailAddress, Invitation, InvitationId};

/// Store port for access grants.
///
/// Adapters map their own failures to `AppError::StoreUnavailable`; the
/// service never papers over one with cached data.
#[async_trait]
pub trait AccessGrantRepository: Send + Sync {
    /// Loads the most recent grant for one user on one farm.
    async fn load_grant(&self, farm_id: FarmId, user_id: UserId)
    -> AppResult<Option<AccessGrant>>;

    /// Persists a grant, inserting or overwriting the (farm, user) record.
    async fn save_grant(&self, grant: &AccessGrant) -> AppResult<()>;

    /// Lists all grants on a farm, revoked ones included.
    async fn list_grants_for_farm(&self, farm_id: FarmId) -> AppResult<Vec<AccessGrant>>;
}

/// Store port for invitations.
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Loads an invitation by id.
    async fn load_invitation(&self, id: InvitationId) -> AppResult<Option<Invitation>>;

    /// Finds the pending invitation for one farm and invitee address, if any.
    async fn find_pending_invitation(
        &self,
        farm_id: FarmId,
        invitee_email: &EmailAddress,
    ) -> AppResult<Option<Invitation>>;

    /// Persists an invitation, inserting or overwriting by id.
    async fn save_invitation(&self, invitation: &Invitation) -> AppResult<()>;

    /// Lists pending invitations on a farm.
    async fn list_pending_invitations_for_farm(
        &self,
        farm_id: FarmId,
    ) -> AppResult<Vec<Invitation>>;
}
