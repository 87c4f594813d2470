//! Application services and ports for farm access control.

#![forbid(unsafe_code)]

mod access_ports;
mod access_service;

pub use access_ports::{
    AccessEvent, AccessGrantRepository, AuditLogQuery, AuditLogRepository, AuditRepository,
    CacheLookup, InvitationRepository, NotificationService, NotificationTarget, PermissionCache,
    ResolveToken,
};
pub use access_service::{
    AccessControlConfig, AccessControlService, InviteInput, TeamMember,
};
