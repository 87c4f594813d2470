//! Domain entities and invariants for farm access control.

#![forbid(unsafe_code)]

mod access;
mod audit;
mod capability;
mod email;
mod invitation;
mod role;

pub use access::{AccessGrant, AccessStatus, GrantId};
pub use audit::{AuditAction, AuditEntry, AuditEntryId};
pub use capability::{Capability, CapabilitySet};
pub use email::EmailAddress;
pub use invitation::{Invitation, InvitationId, InvitationStatus, NewInvitation};
pub use role::Role;
