use std::collections::HashMap;

use async_trait::async_trait;
use farmgate_application::{AccessGrantRepository, InvitationRepository};
use farmgate_core::{AppResult, FarmId, UserId};
use farmgate_domain::{AccessGrant, EmailAddress, Invitation, InvitationId, InvitationStatus};
use tokio::sync::RwLock;

/// In-memory store adapter for grants and invitations.
///
/// Stands in for the persistence collaborator in development and tests. Grants
/// are keyed by (farm, user) so the store holds one record per pair: the
/// current one, whatever its status.
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    grants: RwLock<HashMap<(FarmId, UserId), AccessGrant>>,
    invitations: RwLock<HashMap<InvitationId, Invitation>>,
}

impl InMemoryAccessStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
            invitations: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AccessGrantRepository for InMemoryAccessStore {
    async fn load_grant(
        &self,
        farm_id: FarmId,
        user_id: UserId,
    ) -> AppResult<Option<AccessGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .get(&(farm_id, user_id))
            .cloned())
    }

    async fn save_grant(&self, grant: &AccessGrant) -> AppResult<()> {
        self.grants
            .write()
            .await
            .insert((grant.farm_id(), grant.user_id()), grant.clone());
        Ok(())
    }

    async fn list_grants_for_farm(&self, farm_id: FarmId) -> AppResult<Vec<AccessGrant>> {
        let grants = self.grants.read().await;

        let mut values: Vec<AccessGrant> = grants
            .iter()
            .filter_map(|((stored_farm_id, _), grant)| {
                (stored_farm_id == &farm_id).then_some(grant.clone())
            })
            .collect();
        values.sort_by_key(AccessGrant::accepted_at);

        Ok(values)
    }
}

#[async_trait]
impl InvitationRepository for InMemoryAccessStore {
    async fn load_invitation(&self, id: InvitationId) -> AppResult<Option<Invitation>> {
        Ok(self.invitations.read().await.get(&id).cloned())
    }

    async fn find_pending_invitation(
        &self,
        farm_id: FarmId,
        invitee_email: &EmailAddress,
    ) -> AppResult<Option<Invitation>> {
        Ok(self
            .invitations
            .read()
            .await
            .values()
            .find(|invitation| {
                invitation.farm_id() == farm_id
                    && invitation.invitee_email() == invitee_email
                    && invitation.status() == InvitationStatus::Sent
            })
            .cloned())
    }

    async fn save_invitation(&self, invitation: &Invitation) -> AppResult<()> {
        self.invitations
            .write()
            .await
            .insert(invitation.id(), invitation.clone());
        Ok(())
    }

    async fn list_pending_invitations_for_farm(
        &self,
        farm_id: FarmId,
    ) -> AppResult<Vec<Invitation>> {
        let invitations = self.invitations.read().await;

        let mut values: Vec<Invitation> = invitations
            .values()
            .filter(|invitation| {
                invitation.farm_id() == farm_id
                    && invitation.status() == InvitationStatus::Sent
            })
            .cloned()
            .collect();
        values.sort_by_key(Invitation::created_at);

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use farmgate_application::{AccessGrantRepository, InvitationRepository};
    use farmgate_core::{FarmId, UserId};
    use farmgate_domain::{
        AccessGrant, CapabilitySet, EmailAddress, Invitation, NewInvitation, Role,
    };

    use super::InMemoryAccessStore;

    fn email(value: &str) -> EmailAddress {
        EmailAddress::new(value).unwrap_or_else(|_| panic!("fixture email"))
    }

    fn invitation(farm_id: FarmId, address: &str) -> Invitation {
        Invitation::new(
            NewInvitation {
                farm_id,
                inviter_user_id: UserId::new(),
                invitee_email: email(address),
                invitee_user_id: None,
                proposed_role: Role::Worker,
                custom_capabilities: CapabilitySet::new(),
                message: None,
                requires_approval: false,
                ttl: Duration::days(7),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn saved_grant_loads_back_by_pair() {
        let store = InMemoryAccessStore::new();
        let grant = AccessGrant::new(
            FarmId::new(),
            UserId::new(),
            Role::Worker,
            CapabilitySet::new(),
            UserId::new(),
            Utc::now(),
        );

        assert!(store.save_grant(&grant).await.is_ok());

        let loaded = store.load_grant(grant.farm_id(), grant.user_id()).await;
        assert_eq!(loaded.ok().flatten(), Some(grant));
    }

    #[tokio::test]
    async fn missing_grant_loads_as_none() {
        let store = InMemoryAccessStore::new();
        let loaded = store.load_grant(FarmId::new(), UserId::new()).await;
        assert_eq!(loaded.ok().flatten(), None);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_farm() {
        let store = InMemoryAccessStore::new();
        let farm_id = FarmId::new();
        for _ in 0..2 {
            let grant = AccessGrant::new(
                farm_id,
                UserId::new(),
                Role::Worker,
                CapabilitySet::new(),
                UserId::new(),
                Utc::now(),
            );
            assert!(store.save_grant(&grant).await.is_ok());
        }
        let elsewhere = AccessGrant::new(
            FarmId::new(),
            UserId::new(),
            Role::Viewer,
            CapabilitySet::new(),
            UserId::new(),
            Utc::now(),
        );
        assert!(store.save_grant(&elsewhere).await.is_ok());

        let listed = store.list_grants_for_farm(farm_id).await;
        assert_eq!(listed.map(|grants| grants.len()).ok(), Some(2));
    }

    #[tokio::test]
    async fn find_pending_skips_terminal_invitations() {
        let store = InMemoryAccessStore::new();
        let farm_id = FarmId::new();

        let mut responded = invitation(farm_id, "wren@orchard-farm.example");
        assert!(responded.mark_cancelled().is_ok());
        assert!(store.save_invitation(&responded).await.is_ok());

        let found = store
            .find_pending_invitation(farm_id, &email("wren@orchard-farm.example"))
            .await;
        assert_eq!(found.ok().flatten(), None);

        let pending = invitation(farm_id, "wren@orchard-farm.example");
        assert!(store.save_invitation(&pending).await.is_ok());

        let found = store
            .find_pending_invitation(farm_id, &email("wren@orchard-farm.example"))
            .await;
        assert_eq!(found.ok().flatten().map(|found| found.id()), Some(pending.id()));
    }

    #[tokio::test]
    async fn pending_listing_excludes_other_farms_and_statuses() {
        let store = InMemoryAccessStore::new();
        let farm_id = FarmId::new();

        let pending = invitation(farm_id, "wren@orchard-farm.example");
        assert!(store.save_invitation(&pending).await.is_ok());

        let mut cancelled = invitation(farm_id, "vera@orchard-farm.example");
        assert!(cancelled.mark_cancelled().is_ok());
        assert!(store.save_invitation(&cancelled).await.is_ok());

        let elsewhere = invitation(FarmId::new(), "nell@orchard-farm.example");
        assert!(store.save_invitation(&elsewhere).await.is_ok());

        let listed = store.list_pending_invitations_for_farm(farm_id).await;
        assert_eq!(
            listed.map(|invitations| invitations.len()).ok(),
            Some(1)
        );
    }
}
