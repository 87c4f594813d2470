//! Shared primitives for all Rust crates in Farmgate.

#![forbid(unsafe_code)]

/// Caller identity primitives shared across services.
pub mod auth;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use auth::UserIdentity;

/// Result type used across Farmgate crates.
pub type AppResult<T> = Result<T, AppError>;

/// Farm identifier used as the partition key for every access record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FarmId(Uuid);

impl FarmId {
    /// Creates a random farm identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a farm identifier from an existing UUID value.
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

impl Default for FarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for FarmId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
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

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
///
/// Every rejected operation carries the specific category the caller needs to
/// render an accurate message; a generic failure is never returned.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Actor lacks the capability required for the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Actor attempted to grant privilege at or above their own role.
    #[error("role escalation: {0}")]
    RoleEscalation(String),

    /// A pending invitation already exists for the same farm and email.
    #[error("duplicate pending invitation: {0}")]
    DuplicatePendingInvitation(String),

    /// The responding user already holds a grant on the farm.
    #[error("already has access: {0}")]
    AlreadyHasAccess(String),

    /// The invitation passed its expiry horizon before the response.
    #[error("expired: {0}")]
    Expired(String),

    /// The responder's verified email does not match the invitee address.
    #[error("identity mismatch: {0}")]
    IdentityMismatch(String),

    /// The target grant belongs to the farm owner and is immutable.
    #[error("cannot remove owner: {0}")]
    CannotRemoveOwner(String),

    /// The record is in a terminal state and admits no further transition.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The persistence collaborator is unreachable; eligible for caller retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, FarmId, UserId};

    #[test]
    fn farm_id_formats_as_uuid() {
        let farm_id = FarmId::new();
        assert_eq!(farm_id.to_string().len(), 36);
    }

    #[test]
    fn user_id_roundtrips_through_uuid() {
        let user_id = UserId::new();
        assert_eq!(UserId::from_uuid(user_id.as_uuid()), user_id);
    }

    #[test]
    fn error_display_names_the_category() {
        let error = AppError::RoleEscalation("worker proposed manager".to_owned());
        assert!(error.to_string().starts_with("role escalation"));
    }
}
