use serde::{Deserialize, Serialize};

use crate::UserId;

/// Verified caller identity supplied by the authentication layer.
///
/// Farmgate never authenticates; callers hand in an identity whose email, when
/// present, has already been verified by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    display_name: String,
    email: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from authentication data.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the verified email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
