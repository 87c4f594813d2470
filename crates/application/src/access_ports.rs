//! Ports consumed by the access-control service.

mod audit;
mod cache;
mod notification;
mod repository;

pub use audit::{AuditLogQuery, AuditLogRepository, AuditRepository};
pub use cache::{CacheLookup, PermissionCache, ResolveToken};
pub use notification::{AccessEvent, NotificationService, NotificationTarget};
pub use repository::{AccessGrantRepository, InvitationRepository};
