use async_trait::async_trait;
use farmgate_core::{AppResult, FarmId, UserId};
use farmgate_domain::{AuditAction, AuditEntry};

/// Port for persisting append-only audit entries.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit entry.
    async fn append_entry(&self, entry: AuditEntry) -> AppResult<()>;
}

/// Query parameters for audit log listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Optional action filter.
    pub action: Option<AuditAction>,
    /// Optional target user filter.
    pub target_user_id: Option<UserId>,
}

/// Port for reading a farm's audit log, newest entries first.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists the most recent audit entries in farm scope.
    async fn list_recent_entries(
        &self,
        farm_id: FarmId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditEntry>>;
}
