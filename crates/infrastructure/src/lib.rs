//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_notification_service;
mod in_memory_access_store;
mod in_memory_audit_log;
mod lru_permission_cache;

pub use console_notification_service::ConsoleNotificationService;
pub use in_memory_access_store::InMemoryAccessStore;
pub use in_memory_audit_log::InMemoryAuditLog;
pub use lru_permission_cache::LruPermissionCache;
