use async_trait::async_trait;
use farmgate_application::{AuditLogQuery, AuditLogRepository, AuditRepository};
use farmgate_core::{AppResult, FarmId};
use farmgate_domain::AuditEntry;
use tokio::sync::RwLock;

/// In-memory append-only audit log adapter.
///
/// Entries are never mutated or removed; listing reads newest first.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    /// Creates an empty in-memory audit log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditLog {
    async fn append_entry(&self, entry: AuditEntry) -> AppResult<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLog {
    async fn list_recent_entries(
        &self,
        farm_id: FarmId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| entry.farm_id == farm_id)
            .filter(|entry| query.action.is_none_or(|action| entry.action == action))
            .filter(|entry| {
                query
                    .target_user_id
                    .is_none_or(|target| entry.target_user_id == Some(target))
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }
}
